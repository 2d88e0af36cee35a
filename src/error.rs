//! Errors for rejected warp input
//!
//! The geometry itself never fails; these only come from values a client
//! sends that could not have come from a real layout or pointer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    /// Negative or non-finite container measurement
    #[error("Invalid measurement: {width}x{height}")]
    InvalidMeasurement { width: f64, height: f64 },

    /// Source rectangle that the engine cannot normalize
    #[error("Invalid source size: {width}x{height}")]
    InvalidSourceSize { width: f64, height: f64 },
}

impl IntoResponse for WarpError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}
