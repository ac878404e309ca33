pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod session;

pub use app::{router, AppState};
