use catalog_core::CatalogSeed;
use sqlx::PgPool;

use crate::DbError;

/// Rows written by [`seed_catalog`]. Entries that already existed are not
/// counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories_inserted: usize,
    pub attributes_inserted: usize,
}

/// Insert seed categories and attribute definitions that do not exist yet.
///
/// Existing rows are left untouched so edits made through the API survive a
/// re-seed. All inserts run inside a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_catalog(pool: &PgPool, seed: &CatalogSeed) -> Result<SeedSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for category in &seed.categories {
        let subcategories: Vec<String> = category
            .subcategories
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let result = sqlx::query(
            "INSERT INTO categories (name, subcategories) \
             VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(category.name.trim())
        .bind(&subcategories)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            summary.categories_inserted += 1;
        }
    }

    for attr in &seed.attributes {
        let result = sqlx::query(
            "INSERT INTO attributes (category, name, kind, options) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (category, name) DO NOTHING",
        )
        .bind(attr.category.trim())
        .bind(attr.name.trim())
        .bind(attr.kind.as_str())
        .bind(&attr.options)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            summary.attributes_inserted += 1;
        }
    }

    tx.commit().await?;

    tracing::info!(
        categories = summary.categories_inserted,
        attributes = summary.attributes_inserted,
        "catalog seed applied"
    );

    Ok(summary)
}
