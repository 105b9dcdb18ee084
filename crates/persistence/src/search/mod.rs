//! Search support shared by the backends.
//!
//! - [`extractor`] pulls indexable values out of resource JSON.
//! - [`filter`] validates query filters and sort directives against a
//!   resource definition.
//! - [`matcher`] evaluates compiled filters and sorts in memory.

pub mod extractor;
pub mod filter;
pub mod matcher;

pub use extractor::{ExtractedValue, IndexValue, extract_all, extract_param};
pub use filter::{
    CompareValue, CompiledFilter, CompiledSort, FilterOp, compile_filter, compile_filters,
    compile_sort,
};
pub use matcher::{matches, matches_all, sort_resources};
