use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, Request, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_core::{validate_attributes, Product, ProductDraft, ProductPage, ProductRecord, SearchQuery};
use catalog_db::{BatchResult, ImageRef};
use serde::{Deserialize, Serialize};

use crate::assets::{release_quietly, AssetError, ImageUpload};
use crate::middleware::RequestId;

use super::product_input::ProductFields;
use super::{map_db_error, parse_id, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(in crate::api) struct BatchRequest {
    pub products: Vec<ProductRecord>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct BatchResponse {
    pub message: &'static str,
    pub detalhes: BatchResult,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn map_asset_error(rid: &str, error: &AssetError) -> ApiError {
    if error.is_rejection() {
        return ApiError::validation(rid, error.to_string());
    }
    tracing::error!(error = %error, "failed to store image");
    ApiError::new(rid, "internal_error", "failed to store image")
}

/// Reject `select` attribute values that are not among the options defined
/// for the product's category.
async fn check_attributes(state: &AppState, rid: &str, draft: &ProductDraft) -> Result<(), ApiError> {
    let Some(category) = draft.category.as_deref() else {
        return Ok(());
    };
    if draft.attributes.is_empty() {
        return Ok(());
    }
    let definitions = catalog_db::list_attributes(&state.pool, Some(category))
        .await
        .map_err(|e| map_db_error(rid, &e, "attribute"))?;
    validate_attributes(&definitions, &draft.attributes)
        .map_err(|e| ApiError::validation(rid, e.to_string()))
}

async fn validate_draft(state: &AppState, rid: &str, draft: &ProductDraft) -> Result<(), ApiError> {
    if draft.name.is_empty() {
        return Err(ApiError::validation(rid, "name must not be empty"));
    }
    check_attributes(state, rid, draft).await
}

/// Log products whose stock no longer matches their variation total.
fn warn_if_stock_drifted(product: &Product) {
    if !product.stock_is_consistent() {
        tracing::warn!(
            product_id = %product.id,
            stock = product.stock,
            variation_stock = product.variation_stock(),
            "product stock differs from the sum of its variations"
        );
    }
}

async fn store_image(
    state: &AppState,
    rid: &str,
    image: Option<ImageUpload>,
) -> Result<Option<ImageRef>, ApiError> {
    match image {
        Some(upload) => {
            let stored = state
                .assets
                .put(upload)
                .await
                .map_err(|e| map_asset_error(rid, &e))?;
            Ok(Some(stored.into()))
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/products: Search and paginate.
pub(in crate::api) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ProductPage>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::validation(&req_id.0, e.body_text()))?;
    let (filter, page) = query.build();

    let result = catalog_db::find_products(&state.pool, &filter, page)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "product"))?;

    Ok(ApiResponse::wrap(req_id.0, result))
}

/// GET /api/products/{id}
pub(in crate::api) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id, "product")?;

    let product = catalog_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid, &e, "product"))?;

    Ok(ApiResponse::wrap(req_id.0, product))
}

/// POST /api/products: Multipart form (optional `image`) or JSON.
pub(in crate::api) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    req: Request,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    let rid = req_id.0.as_str();

    let mut fields = ProductFields::from_request(req, &state, rid).await?;
    let draft = fields.apply(ProductDraft::default());
    validate_draft(&state, rid, &draft).await?;

    let image = store_image(&state, rid, fields.image.take()).await?;

    let product = match catalog_db::create_product(&state.pool, &draft, image.as_ref()).await {
        Ok(product) => product,
        Err(e) => {
            release_quietly(state.assets.as_ref(), image.as_ref().map(|i| i.public_id.as_str()))
                .await;
            return Err(map_db_error(rid, &e, "product"));
        }
    };

    tracing::info!(product_id = %product.id, sku = ?product.sku, "product created");
    warn_if_stock_drifted(&product);
    Ok((StatusCode::CREATED, ApiResponse::wrap(req_id.0, product)))
}

/// PUT /api/products/{id}: Fields omitted from the body keep their value.
///
/// A new image is stored before the record changes; the previous image is
/// released only after the new reference is persisted.
pub(in crate::api) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    req: Request,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let rid = req_id.0.as_str();
    let id = parse_id(rid, &id, "product")?;

    let existing = catalog_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid, &e, "product"))?;

    let mut fields = ProductFields::from_request(req, &state, rid).await?;
    let draft = fields.apply(ProductDraft::from(&existing));
    validate_draft(&state, rid, &draft).await?;

    let new_image = store_image(&state, rid, fields.image.take()).await?;

    let updated =
        match catalog_db::update_product(&state.pool, id, &draft, new_image.as_ref()).await {
            Ok(product) => product,
            Err(e) => {
                release_quietly(
                    state.assets.as_ref(),
                    new_image.as_ref().map(|i| i.public_id.as_str()),
                )
                .await;
                return Err(map_db_error(rid, &e, "product"));
            }
        };

    if new_image.is_some() {
        release_quietly(state.assets.as_ref(), existing.image_public_id.as_deref()).await;
    }

    tracing::info!(product_id = %updated.id, "product updated");
    warn_if_stock_drifted(&updated);
    Ok(ApiResponse::wrap(req_id.0, updated))
}

/// DELETE /api/products/{id}: Releases the image, then removes the record.
pub(in crate::api) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = req_id.0.as_str();
    let id = parse_id(rid, &id, "product")?;

    let existing = catalog_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid, &e, "product"))?;

    release_quietly(state.assets.as_ref(), existing.image_public_id.as_deref()).await;

    catalog_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid, &e, "product"))?;

    tracing::info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/products/batch: Upsert by SKU.
pub(in crate::api) async fn batch_upsert(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchResponse>>, ApiError> {
    let rid = req_id.0.as_str();
    let Json(body) = body.map_err(|e| {
        tracing::debug!(error = %e, "rejected batch body");
        ApiError::validation(rid, "body must be an object with a 'products' array")
    })?;

    let records: Vec<ProductRecord> = body
        .products
        .into_iter()
        .map(ProductRecord::with_aggregated_stock)
        .collect();

    let result = catalog_db::upsert_by_sku(&state.pool, &records)
        .await
        .map_err(|e| map_db_error(rid, &e, "product"))?;

    Ok(ApiResponse::wrap(
        req_id.0,
        BatchResponse {
            message: "batch sync complete",
            detalhes: result,
        },
    ))
}
