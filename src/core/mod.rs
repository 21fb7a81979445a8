//! Shared building blocks for consultd.

pub mod error;

pub use error::{ApiError, ApiResult};
