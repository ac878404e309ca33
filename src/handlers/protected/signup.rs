// handlers/protected/signup.rs - GET/POST /users/signup, GET /users/signup/success

use axum::{
    extract::{Query, State},
    http::{header::LOCATION, StatusCode},
    response::IntoResponse,
    Form,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::app::AppState;
use crate::backend::Registration;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};

/// Where a successful registration lands
pub const SIGNUP_SUCCESS_PATH: &str = "/users/signup/success";

/// Fields of the registration form
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub user_name: String,
    pub email: String,
    pub phone: String,
    pub user_status: String,
}

/// Account echoed back on the success page
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegisteredUser {
    pub user_name: String,
    pub email: String,
    pub phone: String,
}

/// GET /users/signup - Describe the registration form with the backend's roles
pub async fn signup_page(State(state): State<AppState>) -> ApiResult<Value> {
    let roles = state.backend.roles().await?;

    Ok(ApiResponse::success(json!({
        "form": {
            "action": "/users/signup",
            "method": "POST",
            "fields": {
                "user_name": "full name",
                "email": "email address",
                "phone": "phone number, international format",
                "user_status": "one of roles"
            }
        },
        "roles": roles
    })))
}

/// POST /users/signup - Register a new account with the backend
///
/// On `201 Created` from the backend the browser is sent to the success page
/// with the registered values in the query string.
pub async fn signup_submit(
    State(state): State<AppState>,
    user: SessionUser,
    Form(form): Form<SignupForm>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = Registration {
        user_name: required("user_name", form.user_name)?,
        email: required("email", form.email)?,
        phone: normalize_phone(&required("phone", form.phone)?),
        user_status: required("user_status", form.user_status)?,
    };

    state.backend.signup(&registration).await.map_err(|e| {
        if e.is_rejection() {
            tracing::info!(registered_by = %user.record_code, "backend refused registration: {}", e);
            ApiError::bad_request("Registration was rejected by the backend")
        } else {
            ApiError::from(e)
        }
    })?;

    tracing::info!(
        registered_by = %user.record_code,
        user_status = %registration.user_status,
        "user registered"
    );

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("user_name", &registration.user_name)
        .append_pair("email", &registration.email)
        .append_pair("phone", &registration.phone)
        .finish();

    Ok((
        StatusCode::FOUND,
        [(LOCATION, format!("{SIGNUP_SUCCESS_PATH}?{query}"))],
    ))
}

/// GET /users/signup/success - Show the account that was just registered
pub async fn signup_success(Query(registered): Query<RegisteredUser>) -> ApiResponse<RegisteredUser> {
    ApiResponse::with_status(registered, StatusCode::CREATED)
}

fn required(field: &str, value: String) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("Field '{}' is required", field)));
    }
    Ok(value.to_string())
}

/// Phone numbers are stored in E.164; browsers often drop the leading `+`.
fn normalize_phone(phone: &str) -> String {
    if phone.contains('+') {
        phone.to_string()
    } else {
        format!("+{phone}")
    }
}
