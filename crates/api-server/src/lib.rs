#![warn(clippy::unwrap_used)]

pub mod auth_rest;
pub mod contact_rest;
pub mod error;
pub mod extract;
pub mod prediction_rest;
pub mod rest;
pub mod server;
pub mod swagger;

pub use rest::AppState;
pub use server::{build_router, ApiServer};
pub use swagger::ApiDoc;
