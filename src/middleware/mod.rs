pub mod auth;
pub mod response;

pub use auth::{authenticate_middleware, AuthGate, GateRejection, SessionUser, BYPASS_PATHS};
pub use response::{ApiResponse, ApiResult};
