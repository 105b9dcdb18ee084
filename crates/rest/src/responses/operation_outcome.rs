//! OperationOutcome payloads.
//!
//! Every failure leaving the dispatcher is one OperationOutcome with a single
//! issue whose `code` comes from the closed set in [`IssueType`].

use serde_json::Value;

/// Severity of an issue. Dispatch failures are always errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// The request failed.
    Error,
    /// The request succeeded with a caveat.
    Warning,
}

impl IssueSeverity {
    /// Returns the value placed in `issue[].severity`.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        }
    }
}

/// Issue codes the adapter reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueType {
    /// The request URL could not be parsed.
    BadRequest,
    /// Misconfiguration or an unexpected failure.
    ServerError,
    /// Unknown resource type, missing record, or a record that failed mapping.
    NotFound,
    /// The submitted resource was rejected.
    Validation,
}

impl IssueType {
    /// Returns the code string placed in `issue[].code`.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::BadRequest => "bad-request",
            IssueType::ServerError => "server-error",
            IssueType::NotFound => "not-found",
            IssueType::Validation => "validation",
        }
    }
}

/// One entry of `OperationOutcome.issue`.
#[derive(Debug, Clone)]
pub struct Issue {
    /// How bad it is.
    pub severity: IssueSeverity,
    /// Machine-readable category.
    pub code: IssueType,
    /// Free text shown to the client.
    pub diagnostics: String,
}

impl Issue {
    /// Creates an issue.
    pub fn new(severity: IssueSeverity, code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            diagnostics: diagnostics.into(),
        }
    }

    /// Shorthand for an error-severity issue.
    pub fn error(code: IssueType, diagnostics: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, diagnostics)
    }

    /// Renders the issue as JSON.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "severity": self.severity.as_str(),
            "code": self.code.as_str(),
            "diagnostics": self.diagnostics
        })
    }
}

/// Collects issues into an OperationOutcome.
#[derive(Debug, Default)]
pub struct OperationOutcomeBuilder {
    issues: Vec<Issue>,
}

impl OperationOutcomeBuilder {
    /// Starts an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an issue.
    pub fn add_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    /// Appends an error-severity issue.
    pub fn error(self, code: IssueType, diagnostics: impl Into<String>) -> Self {
        self.add_issue(Issue::error(code, diagnostics))
    }

    /// Renders the OperationOutcome. `issue` is present even when empty.
    pub fn build(self) -> Value {
        serde_json::json!({
            "resourceType": "OperationOutcome",
            "issue": self.issues.iter().map(Issue::to_json).collect::<Vec<_>>()
        })
    }
}

/// The OperationOutcome for a single error.
pub fn error_outcome(code: IssueType, diagnostics: impl Into<String>) -> Value {
    OperationOutcomeBuilder::new().error(code, diagnostics).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_to_json() {
        let json = Issue::error(IssueType::NotFound, "Resource not found").to_json();

        assert_eq!(json["severity"], "error");
        assert_eq!(json["code"], "not-found");
        assert_eq!(json["diagnostics"], "Resource not found");
    }

    #[test]
    fn test_issue_codes() {
        assert_eq!(IssueType::BadRequest.as_str(), "bad-request");
        assert_eq!(IssueType::ServerError.as_str(), "server-error");
        assert_eq!(IssueType::NotFound.as_str(), "not-found");
        assert_eq!(IssueType::Validation.as_str(), "validation");
    }

    #[test]
    fn test_builder() {
        let builder = OperationOutcomeBuilder::new()
            .error(IssueType::Validation, "Missing status")
            .add_issue(Issue::new(
                IssueSeverity::Warning,
                IssueType::Validation,
                "Unusual code",
            ));

        let outcome = builder.build();
        assert_eq!(outcome["resourceType"], "OperationOutcome");
        assert_eq!(outcome["issue"].as_array().unwrap().len(), 2);
        assert_eq!(outcome["issue"][1]["severity"], "warning");
    }

    #[test]
    fn test_empty_outcome() {
        let outcome = OperationOutcomeBuilder::new().build();
        assert_eq!(outcome["issue"], serde_json::json!([]));
    }

    #[test]
    fn test_error_outcome() {
        let outcome = error_outcome(IssueType::BadRequest, "bad url");
        assert_eq!(outcome["issue"][0]["severity"], "error");
        assert_eq!(outcome["issue"][0]["code"], "bad-request");
        assert_eq!(outcome["issue"][0]["diagnostics"], "bad url");
    }
}
