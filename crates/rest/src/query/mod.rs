//! Request URL parsing.
//!
//! [`parse_url`] turns `Type`, `Type/id` and `Type?name[:modifier]=value`
//! forms into a [`ResourceQuery`](fhirmap_persistence::types::ResourceQuery).
//! [`query_url`] goes the other way and is used for Bundle paging links.

mod parser;

pub use parser::{QueryValidationError, parse_url, query_url};
