use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_core::{Category, CategoryDraft};

use crate::middleware::RequestId;

use super::{map_db_error, parse_id, ApiError, ApiResponse, AppState};

fn read_draft(
    rid: &str,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> Result<CategoryDraft, ApiError> {
    let Json(draft) = body.map_err(|e| ApiError::validation(rid, e.body_text()))?;
    let draft = draft.normalized();
    if draft.name.is_empty() {
        return Err(ApiError::validation(rid, "name must not be empty"));
    }
    Ok(draft)
}

/// GET /api/categories
pub(in crate::api) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = catalog_db::list_categories(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "category"))?;
    Ok(ApiResponse::wrap(req_id.0, categories))
}

/// GET /api/categories/{id}
pub(in crate::api) async fn get_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let id = parse_id(&req_id.0, &id, "category")?;
    let category = catalog_db::get_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "category"))?;
    Ok(ApiResponse::wrap(req_id.0, category))
}

/// POST /api/categories
pub(in crate::api) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    let draft = read_draft(&req_id.0, body)?;
    let category = catalog_db::create_category(&state.pool, draft)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "category"))?;

    tracing::info!(category = %category.name, "category created");
    Ok((StatusCode::CREATED, ApiResponse::wrap(req_id.0, category)))
}

/// PUT /api/categories/{id}: Refused while products use a name or
/// subcategory the update would remove.
pub(in crate::api) async fn update_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let id = parse_id(&req_id.0, &id, "category")?;
    let draft = read_draft(&req_id.0, body)?;
    let category = catalog_db::update_category(&state.pool, id, draft)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "category"))?;
    Ok(ApiResponse::wrap(req_id.0, category))
}

/// DELETE /api/categories/{id}: Refused while any product references it.
pub(in crate::api) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&req_id.0, &id, "category")?;
    catalog_db::delete_category(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "category"))?;
    Ok(StatusCode::NO_CONTENT)
}
