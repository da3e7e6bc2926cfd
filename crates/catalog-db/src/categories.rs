use catalog_core::{Category, CategoryDraft};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub subcategories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            subcategories: row.subcategories,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all categories ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, subcategories, created_at, updated_at \
         FROM categories \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Category::from).collect())
}

/// Returns a single category by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no category has `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_category(pool: &PgPool, id: Uuid) -> Result<Category, DbError> {
    fetch_category(pool, id, false).await
}

async fn fetch_category<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    for_update: bool,
) -> Result<Category, DbError> {
    let sql = if for_update {
        "SELECT id, name, subcategories, created_at, updated_at \
         FROM categories WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT id, name, subcategories, created_at, updated_at \
         FROM categories WHERE id = $1"
    };

    let row = sqlx::query_as::<_, CategoryRow>(sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row.into())
}

/// Inserts a new category. The draft is normalized first.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] if the name is taken, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn create_category(pool: &PgPool, draft: CategoryDraft) -> Result<Category, DbError> {
    let draft = draft.normalized();

    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (name, subcategories) \
         VALUES ($1, $2) \
         RETURNING id, name, subcategories, created_at, updated_at",
    )
    .bind(&draft.name)
    .bind(&draft.subcategories)
    .fetch_one(pool)
    .await
    .map_err(|e| DbError::from_unique(e, "category name"))?;

    Ok(row.into())
}

/// Replaces a category's name and subcategory list.
///
/// Products reference categories by name, so the update is refused with
/// [`DbError::InUse`] when it would rename a category products still use or
/// drop a subcategory products still use. A rename with no referencing
/// products carries the category's attribute definitions along.
///
/// # Errors
///
/// Returns [`DbError::NotFound`], [`DbError::InUse`],
/// [`DbError::Duplicate`] if the new name is taken, or [`DbError::Sqlx`].
pub async fn update_category(
    pool: &PgPool,
    id: Uuid,
    draft: CategoryDraft,
) -> Result<Category, DbError> {
    let draft = draft.normalized();
    let mut tx = pool.begin().await?;

    let current = fetch_category(&mut *tx, id, true).await?;
    let renamed = current.name != draft.name;

    if renamed {
        let count = count_products_in_category(&mut *tx, &current.name).await?;
        if count > 0 {
            return Err(DbError::InUse {
                entity: format!("category '{}'", current.name),
                count,
            });
        }
    }

    for removed in current.removed_subcategories(&draft.subcategories) {
        let count = count_products_in_subcategory(&mut *tx, &current.name, removed).await?;
        if count > 0 {
            return Err(DbError::InUse {
                entity: format!("subcategory '{removed}'"),
                count,
            });
        }
    }

    let row = sqlx::query_as::<_, CategoryRow>(
        "UPDATE categories \
         SET name = $2, subcategories = $3, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, name, subcategories, created_at, updated_at",
    )
    .bind(id)
    .bind(&draft.name)
    .bind(&draft.subcategories)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| DbError::from_unique(e, "category name"))?;

    if renamed {
        sqlx::query("UPDATE attributes SET category = $2, updated_at = NOW() WHERE category = $1")
            .bind(&current.name)
            .bind(&draft.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from_unique(e, "attribute name"))?;
    }

    tx.commit().await?;
    Ok(row.into())
}

/// Deletes a category and its attribute definitions.
///
/// # Errors
///
/// Returns [`DbError::InUse`] while any product references the category,
/// [`DbError::NotFound`] if no category has `id`, or [`DbError::Sqlx`].
pub async fn delete_category(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    let current = fetch_category(&mut *tx, id, true).await?;
    let count = count_products_in_category(&mut *tx, &current.name).await?;
    if count > 0 {
        return Err(DbError::InUse {
            entity: format!("category '{}'", current.name),
            count,
        });
    }

    sqlx::query("DELETE FROM attributes WHERE category = $1")
        .bind(&current.name)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(category = %current.name, "category deleted");
    Ok(())
}

/// Number of products whose `category` equals `category`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products_in_category<'e>(
    executor: impl PgExecutor<'e>,
    category: &str,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE category = $1")
        .bind(category)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Number of products filed under `category` / `subcategory`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products_in_subcategory<'e>(
    executor: impl PgExecutor<'e>,
    category: &str,
    subcategory: &str,
) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE category = $1 AND subcategory = $2",
    )
    .bind(category)
    .bind(subcategory)
    .fetch_one(executor)
    .await?;
    Ok(count)
}
