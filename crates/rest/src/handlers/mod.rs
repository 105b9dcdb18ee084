//! HTTP request handlers.
//!
//! - [`get`] - Read and search, `GET [base]/[type](/[id])?(?params)`
//! - [`post`] - Create, `POST [base]/[type]`
//! - [`health`] - Health and readiness checks

pub mod get;
pub mod health;
pub mod post;

pub use get::get_handler;
pub use health::{health_handler, readiness_handler};
pub use post::post_handler;

use axum::http::Uri;

/// Returns the path and query of a request URI.
fn request_target(uri: &Uri) -> &str {
    uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str())
}
