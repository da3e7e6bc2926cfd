//! Database operations for the `products` table: listing, single-product
//! writes, and batch upsert keyed by SKU.

use catalog_core::{
    AttributeMap, Page, Product, ProductDraft, ProductFilter, ProductPage, ProductRecord,
    Variation,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, sku, name, category, subcategory, price, stock, attributes, \
     has_variations, variations, image, image_public_id, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub attributes: Json<AttributeMap>,
    pub has_variations: bool,
    pub variations: Json<Vec<Variation>>,
    pub image: Option<String>,
    pub image_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            category: row.category,
            subcategory: row.subcategory,
            price: row.price,
            stock: row.stock,
            attributes: row.attributes.0,
            has_variations: row.has_variations,
            variations: row.variations.0,
            image: row.image,
            image_public_id: row.image_public_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Display reference and deletion handle of a stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
    pub public_id: String,
}

/// Aggregate outcome of [`upsert_by_sku`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Existing products found by SKU, whether or not they changed.
    pub matched_count: u64,
    /// Products inserted because no product had the SKU.
    pub upserted_count: u64,
    /// Matched products whose stored values changed.
    pub modified_count: u64,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub sku: Option<String>,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(ref category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(ref subcategory) = filter.subcategory {
        qb.push(" AND subcategory = ").push_bind(subcategory.as_str());
    }
    if let Some(ref text) = filter.text {
        qb.push(" AND ((TRUE");
        for pattern in &text.name_patterns {
            qb.push(" AND name ~* ").push_bind(pattern.as_str());
        }
        qb.push(") OR sku = ").push_bind(text.term.as_str()).push(")");
    }
}

/// Returns one page of products matching `filter`, newest first, with the
/// total match count.
///
/// Ties on `created_at` are broken by `id` so pages are stable.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn find_products(
    pool: &PgPool,
    filter: &ProductFilter,
    page: Page,
) -> Result<ProductPage, DbError> {
    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
    push_filter(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut items_qb = QueryBuilder::<Postgres>::new("SELECT ");
    items_qb.push(PRODUCT_COLUMNS).push(" FROM products");
    push_filter(&mut items_qb, filter);
    items_qb
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());

    let rows: Vec<ProductRow> = items_qb.build_query_as().fetch_all(pool).await?;
    let products = rows.into_iter().map(Product::from).collect();

    Ok(ProductPage::new(products, total, page))
}

/// Returns a single product by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: Uuid) -> Result<Product, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row.into())
}

// ---------------------------------------------------------------------------
// Single-product writes
// ---------------------------------------------------------------------------

fn normalized_sku(sku: Option<&str>) -> Option<&str> {
    sku.map(str::trim).filter(|s| !s.is_empty())
}

/// Inserts a new product.
///
/// # Errors
///
/// Returns [`DbError::Duplicate`] if another product already has the SKU,
/// or [`DbError::Sqlx`] if the insert fails.
pub async fn create_product(
    pool: &PgPool,
    draft: &ProductDraft,
    image: Option<&ImageRef>,
) -> Result<Product, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products \
             (sku, name, category, subcategory, price, stock, attributes, \
              has_variations, variations, image, image_public_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(normalized_sku(draft.sku.as_deref()))
    .bind(&draft.name)
    .bind(&draft.category)
    .bind(&draft.subcategory)
    .bind(draft.price.round_dp(2))
    .bind(draft.stock)
    .bind(Json(&draft.attributes))
    .bind(draft.has_variations)
    .bind(Json(&draft.variations))
    .bind(image.map(|i| i.url.as_str()))
    .bind(image.map(|i| i.public_id.as_str()))
    .fetch_one(pool)
    .await
    .map_err(|e| DbError::from_unique(e, "product SKU"))?;

    Ok(row.into())
}

/// Replaces the editable fields of a product. The image reference changes
/// only when `new_image` is given.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`,
/// [`DbError::Duplicate`] if the SKU belongs to another product, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: Uuid,
    draft: &ProductDraft,
    new_image: Option<&ImageRef>,
) -> Result<Product, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products SET \
             sku             = $2, \
             name            = $3, \
             category        = $4, \
             subcategory     = $5, \
             price           = $6, \
             stock           = $7, \
             attributes      = $8, \
             has_variations  = $9, \
             variations      = $10, \
             image           = COALESCE($11, image), \
             image_public_id = COALESCE($12, image_public_id), \
             updated_at      = NOW() \
         WHERE id = $1 \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(normalized_sku(draft.sku.as_deref()))
    .bind(&draft.name)
    .bind(&draft.category)
    .bind(&draft.subcategory)
    .bind(draft.price.round_dp(2))
    .bind(draft.stock)
    .bind(Json(&draft.attributes))
    .bind(draft.has_variations)
    .bind(Json(&draft.variations))
    .bind(new_image.map(|i| i.url.as_str()))
    .bind(new_image.map(|i| i.public_id.as_str()))
    .fetch_optional(pool)
    .await
    .map_err(|e| DbError::from_unique(e, "product SKU"))?
    .ok_or(DbError::NotFound)?;

    Ok(row.into())
}

/// Deletes a product row. Asset cleanup is the caller's job.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no product has `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_product(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch upsert
// ---------------------------------------------------------------------------

enum UpsertOutcome {
    Inserted,
    Modified,
    Unchanged,
}

/// Upserts one record keyed by SKU.
///
/// Fields left `None` keep the stored value on update and take the column
/// default on insert. Negative price and stock are stored as 0. The `DO UPDATE ... WHERE` clause skips the write when
/// nothing would change, in which case no row comes back.
async fn upsert_one(pool: &PgPool, sku: &str, record: &ProductRecord) -> Result<UpsertOutcome, sqlx::Error> {
    let inserted: Option<bool> = sqlx::query_scalar::<_, bool>(
        "INSERT INTO products \
             (sku, name, category, subcategory, price, stock, attributes, has_variations, variations) \
         VALUES ($1, COALESCE($2::text, ''), $3::text, $4::text, COALESCE($5::numeric, 0), \
                 COALESCE($6::int4, 0), COALESCE($7::jsonb, '{}'::jsonb), \
                 COALESCE($8::bool, FALSE), COALESCE($9::jsonb, '[]'::jsonb)) \
         ON CONFLICT (sku) DO UPDATE SET \
             name           = COALESCE($2::text, products.name), \
             category       = COALESCE($3::text, products.category), \
             subcategory    = COALESCE($4::text, products.subcategory), \
             price          = COALESCE($5::numeric, products.price), \
             stock          = COALESCE($6::int4, products.stock), \
             attributes     = COALESCE($7::jsonb, products.attributes), \
             has_variations = COALESCE($8::bool, products.has_variations), \
             variations     = COALESCE($9::jsonb, products.variations), \
             updated_at     = NOW() \
         WHERE (products.name, products.category, products.subcategory, products.price, \
                products.stock, products.attributes, products.has_variations, products.variations) \
               IS DISTINCT FROM \
               (COALESCE($2::text, products.name), COALESCE($3::text, products.category), \
                COALESCE($4::text, products.subcategory), COALESCE($5::numeric, products.price), \
                COALESCE($6::int4, products.stock), COALESCE($7::jsonb, products.attributes), \
                COALESCE($8::bool, products.has_variations), COALESCE($9::jsonb, products.variations)) \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(sku)
    .bind(&record.name)
    .bind(&record.category)
    .bind(&record.subcategory)
    .bind(record.price.map(|p| p.max(Decimal::ZERO).round_dp(2)))
    .bind(record.stock.map(|s| s.max(0)))
    .bind(record.attributes.as_ref().map(Json))
    .bind(record.has_variations)
    .bind(record.variations.as_ref().map(Json))
    .fetch_optional(pool)
    .await?;

    Ok(match inserted {
        Some(true) => UpsertOutcome::Inserted,
        Some(false) => UpsertOutcome::Modified,
        None => UpsertOutcome::Unchanged,
    })
}

/// Upserts every record by SKU and reports aggregate counts.
///
/// Records are written one by one without a surrounding transaction: a
/// record the database rejects is listed in [`BatchResult::failed`] and the
/// remaining records are still attempted. Records without a SKU fail
/// immediately.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] only when the store itself is unreachable
/// (see [`DbError::is_unavailable`]); writes already made stay committed.
pub async fn upsert_by_sku(
    pool: &PgPool,
    records: &[ProductRecord],
) -> Result<BatchResult, DbError> {
    let mut result = BatchResult::default();

    for record in records {
        let Some(sku) = record.key() else {
            result.failed.push(BatchFailure {
                sku: None,
                reason: "missing sku".to_string(),
            });
            continue;
        };

        match upsert_one(pool, sku, record).await {
            Ok(UpsertOutcome::Inserted) => result.upserted_count += 1,
            Ok(UpsertOutcome::Modified) => {
                result.matched_count += 1;
                result.modified_count += 1;
            }
            Ok(UpsertOutcome::Unchanged) => result.matched_count += 1,
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unavailable() {
                    return Err(err);
                }
                tracing::warn!(sku, error = %err, "batch upsert rejected record");
                result.failed.push(BatchFailure {
                    sku: Some(sku.to_string()),
                    reason: "record rejected by the store".to_string(),
                });
            }
        }
    }

    tracing::info!(
        matched = result.matched_count,
        upserted = result.upserted_count,
        modified = result.modified_count,
        failed = result.failed.len(),
        "batch upsert finished"
    );

    Ok(result)
}
