//! Validation reports.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule name.
    pub rule: String,
    /// Rendered message.
    pub message: String,
}

/// Result of running a validator against a data snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Summary message set when the report holds errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    /// Failures per attribute path, in path order.
    #[serde(default)]
    attributes: BTreeMap<String, Vec<Violation>>,
    /// Failures of record-level rules.
    #[serde(default)]
    record: Vec<Violation>,
}

impl Report {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any rule failed or a summary message was set.
    pub fn has_errors(&self) -> bool {
        self.message.is_some() || !self.attributes.is_empty() || !self.record.is_empty()
    }

    /// Negation of [`Report::has_errors`].
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Record a failure for an attribute path.
    pub fn add(&mut self, path: impl Into<String>, violation: Violation) {
        self.attributes.entry(path.into()).or_default().push(violation);
    }

    /// Record a failure of a record-level rule.
    pub fn add_record(&mut self, violation: Violation) {
        self.record.push(violation);
    }

    /// Set the summary message.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// The summary message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Failures for one attribute path.
    pub fn attribute(&self, path: &str) -> &[Violation] {
        self.attributes.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a given rule failed for a path.
    pub fn failed(&self, path: &str, rule: &str) -> bool {
        self.attribute(path).iter().any(|v| v.rule == rule)
    }

    /// First message for a path.
    pub fn first(&self, path: &str) -> Option<&str> {
        self.attribute(path).first().map(|v| v.message.as_str())
    }

    /// Paths with at least one failure.
    pub fn failed_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Record-level failures.
    pub fn record(&self) -> &[Violation] {
        &self.record
    }

    /// Every message, attribute failures first.
    pub fn messages(&self) -> Vec<&str> {
        self.attributes
            .values()
            .flatten()
            .chain(self.record.iter())
            .map(|v| v.message.as_str())
            .collect()
    }
}
