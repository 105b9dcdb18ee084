//! Searchset Bundle building.

use fhirmap_persistence::schema::FhirResource;
use fhirmap_persistence::types::{Pagination, ResourceQuery};
use serde_json::Value;

use crate::query::query_url;

/// Search mode for bundle entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Primary search result.
    Match,
    /// Included via _include.
    Include,
}

impl SearchMode {
    /// Returns the FHIR code string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Match => "match",
            SearchMode::Include => "include",
        }
    }
}

/// A link in a Bundle.
#[derive(Debug, Clone)]
pub struct BundleLink {
    /// The relation type (self, next, previous).
    pub relation: String,
    /// The URL.
    pub url: String,
}

impl BundleLink {
    /// Creates a new link.
    pub fn new(relation: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            url: url.into(),
        }
    }

    /// Converts to FHIR JSON.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "relation": self.relation,
            "url": self.url
        })
    }
}

/// An entry in a Bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Full URL of the resource.
    pub full_url: String,
    /// The resource itself.
    pub resource: Value,
    /// Why the entry is in the bundle.
    pub search_mode: SearchMode,
}

impl BundleEntry {
    /// Creates an entry for a resource served under `base_url`.
    pub fn new(base_url: &str, resource: FhirResource, search_mode: SearchMode) -> Self {
        let full_url = format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            resource.resource_type(),
            resource.id().unwrap_or_default()
        );
        Self {
            full_url,
            resource: resource.into_json(),
            search_mode,
        }
    }

    /// Converts to FHIR JSON.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "fullUrl": self.full_url,
            "resource": self.resource,
            "search": {
                "mode": self.search_mode.as_str()
            }
        })
    }
}

/// Builder for searchset Bundles.
#[derive(Debug, Default)]
pub struct BundleBuilder {
    total: Option<usize>,
    links: Vec<BundleLink>,
    entries: Vec<BundleEntry>,
}

impl BundleBuilder {
    /// Creates a searchset bundle builder.
    pub fn searchset() -> Self {
        Self::default()
    }

    /// Sets the total count.
    pub fn total(mut self, count: usize) -> Self {
        self.total = Some(count);
        self
    }

    /// Adds a link.
    pub fn add_link(mut self, link: BundleLink) -> Self {
        self.links.push(link);
        self
    }

    /// Adds an entry.
    pub fn add_entry(mut self, entry: BundleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Builds the Bundle resource.
    ///
    /// `entry` is always present, empty for a search without matches.
    pub fn build(self) -> Value {
        let mut bundle = serde_json::json!({
            "resourceType": "Bundle",
            "type": "searchset"
        });

        if let Some(total) = self.total {
            bundle["total"] = serde_json::json!(total);
        }

        if !self.links.is_empty() {
            bundle["link"] = Value::Array(self.links.iter().map(BundleLink::to_json).collect());
        }

        bundle["entry"] = Value::Array(self.entries.iter().map(BundleEntry::to_json).collect());
        bundle
    }
}

/// One page of search results ready to be rendered.
#[derive(Debug)]
pub struct SearchPage<'a> {
    /// The query that produced the page.
    pub query: &'a ResourceQuery,
    /// Matches on this page.
    pub resources: Vec<FhirResource>,
    /// Resources reached through include directives.
    pub included: Vec<FhirResource>,
    /// Total matches across all pages.
    pub total: usize,
    /// The window the page was cut with.
    pub pagination: Pagination,
}

/// Renders a page of results as a searchset Bundle with paging links.
pub fn searchset_bundle(base_url: &str, page: SearchPage<'_>) -> Value {
    let SearchPage {
        query,
        resources,
        included,
        total,
        pagination,
    } = page;

    let mut builder = BundleBuilder::searchset()
        .total(total)
        .add_link(BundleLink::new("self", query_url(base_url, query, pagination)));

    if let Some(next) = pagination.next_page(total) {
        builder = builder.add_link(BundleLink::new("next", query_url(base_url, query, next)));
    }
    if let Some(previous) = pagination.previous_page() {
        builder = builder.add_link(BundleLink::new(
            "previous",
            query_url(base_url, query, previous),
        ));
    }

    for resource in resources {
        builder = builder.add_entry(BundleEntry::new(base_url, resource, SearchMode::Match));
    }
    for resource in included {
        builder = builder.add_entry(BundleEntry::new(base_url, resource, SearchMode::Include));
    }

    builder.build()
}
