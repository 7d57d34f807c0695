use std::collections::{BTreeMap, HashSet};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::document::DocumentType;
use crate::normalize::normalize_issue_key;

pub mod engine;
pub mod file_repository;

/// Section label used when a finding is not tied to a named section.
pub const NO_SECTION: &str = "N/A";

/// Finding severity as shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A pattern-based risk detected in a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    pub issue: String,
    pub severity: Severity,
    /// Text used to anchor the flag to a paragraph.
    pub matched: String,
}

/// A single compliance issue for one document.
///
/// The issue text is the identity used when reconciling with external
/// suggestions; there is no separate id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub document: DocumentType,
    pub section: String,
    pub issue: String,
    pub severity: Severity,
    /// Rule-derived remediation; empty for findings appended from suggestions.
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion_ai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale_ai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_label: Option<String>,
}

impl Finding {
    pub fn new(
        document: DocumentType,
        issue: impl Into<String>,
        severity: Severity,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            document,
            section: NO_SECTION.to_string(),
            issue: issue.into(),
            severity,
            suggestion: suggestion.into(),
            suggestion_ai: None,
            rationale_ai: None,
            citation_label: None,
        }
    }

    /// Canonical matching key derived from the issue text.
    pub fn key(&self) -> String {
        normalize_issue_key(&self.issue)
    }

    pub fn has_ai_advice(&self) -> bool {
        self.suggestion_ai.is_some() || self.rationale_ai.is_some()
    }
}

/// Errors raised when a rule set document cannot be interpreted at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleSetError {
    #[error("rule set root must be a mapping with `required_documents` and `clauses_per_doc`")]
    NotAMapping,
    #[error("unsupported rule set format `{extension}` (expected .json, .yaml or .yml)")]
    UnsupportedFormat { extension: String },
}

/// Required clauses per document type plus the documents a complete batch needs.
///
/// Read-only once loaded; callers share it by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    pub required_documents: Vec<String>,
    pub clauses_per_doc: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    pub fn new(
        required_documents: Vec<String>,
        clauses_per_doc: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            required_documents,
            clauses_per_doc,
        }
    }

    /// Interpret a parsed rule document leniently.
    ///
    /// Only a non-mapping root is an error. Malformed entries are dropped with a
    /// warning and behave as if no clauses were required.
    pub fn from_value(value: &Value) -> Result<Self, RuleSetError> {
        let root = value.as_object().ok_or(RuleSetError::NotAMapping)?;

        let required_documents = match root.get("required_documents") {
            Some(Value::Array(items)) => string_items("required_documents", items),
            Some(other) => {
                warn!(found = %kind_of(other), "ignoring malformed `required_documents`");
                Vec::new()
            }
            None => Vec::new(),
        };

        let mut clauses_per_doc = BTreeMap::new();
        match root.get("clauses_per_doc") {
            Some(Value::Object(entries)) => {
                for (doc_type, clauses) in entries {
                    let clauses = match clauses {
                        Value::Array(items) => string_items(doc_type, items),
                        other => {
                            warn!(%doc_type, found = %kind_of(other), "clause entry is not a list; treating as empty");
                            Vec::new()
                        }
                    };
                    clauses_per_doc.insert(doc_type.clone(), clauses);
                }
            }
            Some(other) => {
                warn!(found = %kind_of(other), "ignoring malformed `clauses_per_doc`");
            }
            None => {}
        }

        Ok(Self {
            required_documents,
            clauses_per_doc,
        })
    }

    /// Required clause keywords for a type, in rule-set order.
    ///
    /// Lookup is by label, exact first and then case-insensitive; absent types
    /// have no requirements.
    pub fn required_clauses(&self, doc_type: DocumentType) -> &[String] {
        let label = doc_type.label();
        self.clauses_per_doc
            .get(label)
            .or_else(|| {
                self.clauses_per_doc
                    .iter()
                    .find(|(key, _)| key.trim().eq_ignore_ascii_case(label))
                    .map(|(_, clauses)| clauses)
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Required document labels absent from the detected types, case-insensitive,
    /// in rule-set order.
    pub fn missing_documents<I>(&self, detected: I) -> Vec<String>
    where
        I: IntoIterator<Item = DocumentType>,
    {
        let found: HashSet<String> = detected
            .into_iter()
            .map(|kind| kind.label().to_lowercase())
            .collect();
        self.required_documents
            .iter()
            .filter(|doc| !found.contains(&doc.trim().to_lowercase()))
            .cloned()
            .collect()
    }
}

fn string_items(context: &str, items: &[Value]) -> Vec<String> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
            Value::String(_) => {}
            Value::Number(n) => out.push(n.to_string()),
            other => warn!(%context, found = %kind_of(other), "skipping non-string rule item"),
        }
    }
    out
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// Source of the active rule set.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Retrieve the active rule set.
    async fn load_rules(&self) -> AnyResult<RuleSet>;
}
