pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod request;
pub mod storage;
pub mod store;
pub mod thumbnail;

pub use app::{local_backends, router, AppState, LocalBackends};
pub use error::ApiError;
