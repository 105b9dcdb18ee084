//! The structured query a request URL is parsed into.
//!
//! A [`ResourceQuery`] always names a resource type. When it carries an id it
//! addresses a single resource; otherwise it describes a collection search
//! through its filters, sort directives and paging window.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{PageLimits, Pagination};

/// A parsed request against one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceQuery {
    /// The resource type name, exactly as given.
    pub resource_type: String,

    /// The logical id for a single-resource lookup.
    pub id: Option<String>,

    /// Filters, in the order they appeared.
    pub filters: Vec<SearchFilter>,

    /// Include directives, in the order they appeared.
    pub includes: Vec<IncludeDirective>,

    /// Sort directives, highest priority first.
    pub sort: Vec<SortDirective>,

    /// Requested page size (`_count`).
    pub count: Option<usize>,

    /// Requested page offset (`_offset`).
    pub offset: Option<usize>,
}

impl ResourceQuery {
    /// Creates a collection query for the given resource type.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    /// Creates a single-resource query.
    pub fn by_id(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(resource_type).with_id(id)
    }

    /// Sets the logical id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a filter.
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an include directive.
    pub fn with_include(mut self, include: IncludeDirective) -> Self {
        self.includes.push(include);
        self
    }

    /// Adds a sort directive.
    pub fn with_sort(mut self, sort: SortDirective) -> Self {
        self.sort.push(sort);
        self
    }

    /// Sets the requested page size.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the requested page offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if this query addresses a single resource.
    pub fn is_single(&self) -> bool {
        self.id.is_some()
    }

    /// Resolves the requested paging window against server limits.
    pub fn pagination(&self, limits: PageLimits) -> Pagination {
        Pagination::from_request(self.count, self.offset, limits)
    }
}

/// A single `name[:modifier]=value` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// The search parameter code.
    pub name: String,

    /// The modifier, if any.
    pub modifier: Option<SearchModifier>,

    /// The raw value, including any comparison prefix.
    pub value: String,
}

impl SearchFilter {
    /// Creates a filter without a modifier.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifier: None,
            value: value.into(),
        }
    }

    /// Sets the modifier.
    pub fn with_modifier(mut self, modifier: SearchModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }
}

/// Search modifiers accepted after a parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchModifier {
    /// Case- and accent-sensitive whole-value match (strings).
    Exact,
    /// Case-insensitive substring match (strings).
    Contains,
    /// `true` matches resources without a value, `false` those with one.
    Missing,
    /// Matches resources that have no value equal to the given one.
    Not,
}

impl SearchModifier {
    /// Returns the modifier as it appears in a URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchModifier::Exact => "exact",
            SearchModifier::Contains => "contains",
            SearchModifier::Missing => "missing",
            SearchModifier::Not => "not",
        }
    }
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchModifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(SearchModifier::Exact),
            "contains" => Ok(SearchModifier::Contains),
            "missing" => Ok(SearchModifier::Missing),
            "not" => Ok(SearchModifier::Not),
            _ => Err(format!("unknown modifier: {}", s)),
        }
    }
}

/// Comparison prefixes for date and number values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    /// Equal (default).
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
}

impl SearchPrefix {
    /// Splits a leading prefix off a value string.
    ///
    /// Only strips the prefix when the remainder starts with a digit or sign,
    /// so a value like `"never"` is not mistaken for `ne` + `"ver"`.
    pub fn extract(value: &str) -> (Self, &str) {
        let prefixes = [
            ("eq", SearchPrefix::Eq),
            ("ne", SearchPrefix::Ne),
            ("gt", SearchPrefix::Gt),
            ("lt", SearchPrefix::Lt),
            ("ge", SearchPrefix::Ge),
            ("le", SearchPrefix::Le),
        ];

        for (text, prefix) in prefixes {
            if let Some(rest) = value.strip_prefix(text)
                && rest
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
            {
                return (prefix, rest);
            }
        }

        (SearchPrefix::Eq, value)
    }
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchPrefix::Eq => "eq",
            SearchPrefix::Ne => "ne",
            SearchPrefix::Gt => "gt",
            SearchPrefix::Lt => "lt",
            SearchPrefix::Ge => "ge",
            SearchPrefix::Le => "le",
        };
        f.write_str(s)
    }
}

/// An `_include` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDirective {
    /// Source type named in `Type:relation` form, if given.
    pub source_type: Option<String>,

    /// The relation to follow.
    pub relation: String,
}

impl IncludeDirective {
    /// Creates a directive for a bare relation name.
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            source_type: None,
            relation: relation.into(),
        }
    }

    /// Returns true if the directive applies to `resource_type`.
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.source_type
            .as_deref()
            .is_none_or(|source| source == resource_type)
    }
}

/// Sort direction for `_sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

/// A sort directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// The parameter to sort by.
    pub parameter: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Parses a sort parameter value (e.g., "-date" for descending).
    pub fn parse(s: &str) -> Self {
        if let Some(stripped) = s.strip_prefix('-') {
            Self {
                parameter: stripped.to_string(),
                direction: SortDirection::Descending,
            }
        } else {
            Self {
                parameter: s.to_string(),
                direction: SortDirection::Ascending,
            }
        }
    }
}
