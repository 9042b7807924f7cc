// handlers/public/mod.rs - account endpoints (anonymous callers admitted by default)
pub mod auth;
