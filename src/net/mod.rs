mod api;
pub mod endpoints;

pub use api::{ApiClient, ApiError, HttpApiClient};
