use sqlx::PgPool;

use crate::DbError;

/// Product count for one category name.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategoryCountRow {
    pub name: String,
    pub product_count: i64,
}

/// Total number of products.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products(pool: &PgPool) -> Result<i64, DbError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

/// Product counts for every known category, including empty ones.
///
/// Products filed under a name with no category row are not listed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_product_counts(pool: &PgPool) -> Result<Vec<CategoryCountRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryCountRow>(
        "SELECT c.name, COUNT(p.id) AS product_count \
         FROM categories c \
         LEFT JOIN products p ON p.category = c.name \
         GROUP BY c.name \
         ORDER BY c.name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
