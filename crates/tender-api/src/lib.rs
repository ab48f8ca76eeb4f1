//! HTTP surface for the tender ingestion core: batch upload, on-demand
//! expansion trigger, progress polling, and summary retrieval (§4.8).

pub mod bootstrap;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
