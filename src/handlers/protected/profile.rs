// handlers/protected/profile.rs - GET /users/profile

use axum::extract::State;
use serde::Serialize;

use crate::app::AppState;
use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user_name: String,
    pub record_code: String,
    pub role: Role,
}

/// GET /users/profile - Profile data for the logged-in user
pub async fn profile_get(State(state): State<AppState>, user: SessionUser) -> ApiResult<ProfileView> {
    // The backend addresses users by numeric record code
    let code: i64 = user.record_code.parse().map_err(|_| {
        tracing::error!("Record code '{}' in a verified token is not numeric", user.record_code);
        ApiError::internal_server_error("Unable to load profile")
    })?;

    let info = state.backend.username(code).await?;

    Ok(ApiResponse::success(ProfileView {
        user_name: info.user_name,
        record_code: user.record_code,
        role: user.role,
    }))
}
