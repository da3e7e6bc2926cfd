use catalog_core::{Attribute, AttributeDraft, AttributeKind};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttributeRow {
    pub id: Uuid,
    pub category: String,
    pub name: String,
    pub kind: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AttributeRow> for Attribute {
    type Error = DbError;

    fn try_from(row: AttributeRow) -> Result<Self, Self::Error> {
        Ok(Attribute {
            id: row.id,
            category: row.category,
            name: row.name,
            kind: row.kind.parse::<AttributeKind>()?,
            options: row.options,
        })
    }
}

/// Options are only kept for `select` attributes.
fn stored_options(draft: &AttributeDraft) -> Vec<String> {
    match draft.kind {
        AttributeKind::Select => draft
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect(),
        AttributeKind::Text => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns attribute definitions, optionally restricted to one category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_attributes(
    pool: &PgPool,
    category: Option<&str>,
) -> Result<Vec<Attribute>, DbError> {
    let rows = sqlx::query_as::<_, AttributeRow>(
        "SELECT id, category, name, kind, options, created_at, updated_at \
         FROM attributes \
         WHERE ($1::text IS NULL OR category = $1) \
         ORDER BY category, name",
    )
    .bind(category)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Attribute::try_from).collect()
}

/// Returns a single attribute definition by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no attribute has `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_attribute(pool: &PgPool, id: Uuid) -> Result<Attribute, DbError> {
    let row = sqlx::query_as::<_, AttributeRow>(
        "SELECT id, category, name, kind, options, created_at, updated_at \
         FROM attributes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    row.try_into()
}

/// Inserts an attribute definition.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] if the category already defines an
/// attribute with that name, or [`DbError::Sqlx`] if the insert fails.
pub async fn create_attribute(pool: &PgPool, draft: &AttributeDraft) -> Result<Attribute, DbError> {
    let row = sqlx::query_as::<_, AttributeRow>(
        "INSERT INTO attributes (category, name, kind, options) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, category, name, kind, options, created_at, updated_at",
    )
    .bind(draft.category.trim())
    .bind(draft.name.trim())
    .bind(draft.kind.as_str())
    .bind(stored_options(draft))
    .fetch_one(pool)
    .await
    .map_err(|e| DbError::from_unique(e, "attribute name"))?;

    row.try_into()
}

/// Replaces an attribute definition.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no attribute has `id`,
/// [`DbError::Duplicate`] on a name clash, or [`DbError::Sqlx`].
pub async fn update_attribute(
    pool: &PgPool,
    id: Uuid,
    draft: &AttributeDraft,
) -> Result<Attribute, DbError> {
    let row = sqlx::query_as::<_, AttributeRow>(
        "UPDATE attributes \
         SET category = $2, name = $3, kind = $4, options = $5, updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id, category, name, kind, options, created_at, updated_at",
    )
    .bind(id)
    .bind(draft.category.trim())
    .bind(draft.name.trim())
    .bind(draft.kind.as_str())
    .bind(stored_options(draft))
    .fetch_optional(pool)
    .await
    .map_err(|e| DbError::from_unique(e, "attribute name"))?
    .ok_or(DbError::NotFound)?;

    row.try_into()
}

/// Deletes an attribute definition. Values already stored on products are
/// left as they are.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no attribute has `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_attribute(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM attributes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
