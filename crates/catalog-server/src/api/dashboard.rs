use std::collections::BTreeMap;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(in crate::api) struct DashboardStats {
    pub total: i64,
    /// Product count per category name, including empty categories.
    pub categories: BTreeMap<String, i64>,
}

/// GET /api/dashboard/stats
pub(in crate::api) async fn stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let total = catalog_db::count_products(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "product"))?;
    let rows = catalog_db::category_product_counts(&state.pool)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e, "category"))?;

    let categories = rows
        .into_iter()
        .map(|row| (row.name, row.product_count))
        .collect();

    Ok(ApiResponse::wrap(req_id.0, DashboardStats { total, categories }))
}
