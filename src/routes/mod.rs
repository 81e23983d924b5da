pub mod compare;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod video;

use axum::http::StatusCode;

pub(crate) fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
