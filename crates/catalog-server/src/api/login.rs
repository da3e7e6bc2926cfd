use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(in crate::api) struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct LoginResponse {
    pub token: String,
}

/// POST /api/login: Exchange admin credentials for a bearer token.
pub(in crate::api) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let rid = req_id.0.as_str();
    let Json(body) = body.map_err(|e| ApiError::validation(rid, e.body_text()))?;

    let Some(admin) = state.auth.admin.as_ref() else {
        tracing::warn!("login attempted but no admin account is configured");
        return Err(ApiError::new(rid, "auth_invalid", "invalid email or password"));
    };

    if !admin.verify(&body.email, &body.password) {
        tracing::info!("login rejected");
        return Err(ApiError::new(rid, "auth_invalid", "invalid email or password"));
    }

    let token = state.auth.tokens.issue(admin.email()).map_err(|e| {
        tracing::error!(error = %e, "failed to issue token");
        ApiError::new(rid, "internal_error", "failed to issue token")
    })?;

    tracing::info!(subject = %admin.email(), "admin logged in");
    Ok(ApiResponse::wrap(req_id.0, LoginResponse { token }))
}
