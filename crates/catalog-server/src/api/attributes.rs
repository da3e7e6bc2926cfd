use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_core::{Attribute, AttributeDraft, AttributeKind};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, parse_id, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct AttributeFilter {
    pub category: Option<String>,
}

fn read_draft(
    rid: &str,
    body: Result<Json<AttributeDraft>, JsonRejection>,
) -> Result<AttributeDraft, ApiError> {
    let Json(draft) = body.map_err(|e| ApiError::validation(rid, e.body_text()))?;
    if draft.category.trim().is_empty() || draft.name.trim().is_empty() {
        return Err(ApiError::validation(rid, "category and name must not be empty"));
    }
    if draft.kind == AttributeKind::Select && draft.options.iter().all(|o| o.trim().is_empty()) {
        return Err(ApiError::validation(rid, "select attributes need at least one option"));
    }
    Ok(draft)
}

/// GET /api/attributes?category=
pub(in crate::api) async fn list_attributes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filter): Query<AttributeFilter>,
) -> Result<Json<ApiResponse<Vec<Attribute>>>, ApiError> {
    let category = filter
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let attributes = catalog_db::list_attributes(&state.pool, category)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "attribute"))?;
    Ok(ApiResponse::wrap(req_id.0, attributes))
}

/// GET /api/attributes/{id}
pub(in crate::api) async fn get_attribute(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Attribute>>, ApiError> {
    let id = parse_id(&req_id.0, &id, "attribute")?;
    let attribute = catalog_db::get_attribute(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "attribute"))?;
    Ok(ApiResponse::wrap(req_id.0, attribute))
}

/// POST /api/attributes
pub(in crate::api) async fn create_attribute(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<AttributeDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Attribute>>), ApiError> {
    let draft = read_draft(&req_id.0, body)?;
    let attribute = catalog_db::create_attribute(&state.pool, &draft)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "attribute"))?;
    Ok((StatusCode::CREATED, ApiResponse::wrap(req_id.0, attribute)))
}

/// PUT /api/attributes/{id}
pub(in crate::api) async fn update_attribute(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Result<Json<AttributeDraft>, JsonRejection>,
) -> Result<Json<ApiResponse<Attribute>>, ApiError> {
    let id = parse_id(&req_id.0, &id, "attribute")?;
    let draft = read_draft(&req_id.0, body)?;
    let attribute = catalog_db::update_attribute(&state.pool, id, &draft)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "attribute"))?;
    Ok(ApiResponse::wrap(req_id.0, attribute))
}

/// DELETE /api/attributes/{id}
pub(in crate::api) async fn delete_attribute(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&req_id.0, &id, "attribute")?;
    catalog_db::delete_attribute(&state.pool, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "attribute"))?;
    Ok(StatusCode::NO_CONTENT)
}
