//! Core types for the persistence layer.
//!
//! - [`ResourceQuery`] - the structured form of a request URL
//! - [`StoredResource`] - a resource's JSON with persistence metadata
//! - [`Pagination`], [`PageResult`] - offset paging
//!
//! # Example
//!
//! ```
//! use fhirmap_persistence::types::{
//!     PageLimits, ResourceQuery, SearchFilter, SearchModifier, SortDirective,
//! };
//!
//! let query = ResourceQuery::new("Patient")
//!     .with_filter(SearchFilter::new("name", "pet").with_modifier(SearchModifier::Contains))
//!     .with_sort(SortDirective::parse("-birthdate"))
//!     .with_count(10);
//!
//! assert_eq!(query.pagination(PageLimits::default()).count, 10);
//! ```

mod pagination;
mod query;
mod stored_resource;

pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits, PageResult, Pagination};
pub use query::{
    IncludeDirective, ResourceQuery, SearchFilter, SearchModifier, SearchPrefix, SortDirection,
    SortDirective,
};
pub use stored_resource::{ResourceMeta, StoredResource};
