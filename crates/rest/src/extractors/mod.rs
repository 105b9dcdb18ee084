//! Axum extractors.
//!
//! - [`JsonBody`] - Decodes a request body into a JSON value

mod json_body;

pub use json_body::{JsonBody, JsonBodyRejection};
