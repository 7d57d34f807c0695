//! Merges externally generated suggestions into rule-engine findings.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::document::DocumentType;
use crate::normalize::normalize_issue_key;
use crate::rules::{Finding, Severity};

/// Advisory record produced by the suggestion service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_label: Option<String>,
}

impl Suggestion {
    pub fn key(&self) -> String {
        normalize_issue_key(&self.issue)
    }
}

const COMMON_KEYS: &[&str] = &["jurisdiction", "adgm", "ambiguity", "signatories"];
const ARTICLES_KEYS: &[&str] = &[
    "company name",
    "objects",
    "share capital",
    "directors",
    "dividends",
];
const MEMORANDUM_KEYS: &[&str] = &["registered address", "objects", "share capital"];
const RESOLUTION_KEYS: &[&str] = &["resolution approval", "authorized representative"];
const REGISTER_KEYS: &[&str] = &["register", "members", "directors"];
const UBO_KEYS: &[&str] = &["ubo", "beneficial owner", "declaration"];

/// Type-specific key tokens on top of the common bucket.
fn specific_keys(doc_type: DocumentType) -> &'static [&'static str] {
    match doc_type {
        DocumentType::ArticlesOfAssociation => ARTICLES_KEYS,
        DocumentType::MemorandumOfAssociation => MEMORANDUM_KEYS,
        DocumentType::BoardResolution => RESOLUTION_KEYS,
        DocumentType::RegisterOfMembersAndDirectors => REGISTER_KEYS,
        DocumentType::UboDeclarationForm => UBO_KEYS,
        _ => &[],
    }
}

/// Whether a normalized issue key is relevant to a document type.
///
/// A key is accepted when it contains any token of the type's allow-list.
pub fn accepts_issue_key(doc_type: DocumentType, key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    COMMON_KEYS
        .iter()
        .chain(specific_keys(doc_type))
        .any(|token| key.contains(token))
}

/// Decides whether a suggestion and an existing finding describe the same issue.
pub trait IssueMatcher {
    fn matches(&self, suggestion_key: &str, finding_key: &str) -> bool;
}

/// Symmetric substring heuristic over normalized keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringMatcher;

impl IssueMatcher for SubstringMatcher {
    fn matches(&self, suggestion_key: &str, finding_key: &str) -> bool {
        !suggestion_key.is_empty()
            && !finding_key.is_empty()
            && (suggestion_key.contains(finding_key) || finding_key.contains(suggestion_key))
    }
}

/// What happened to a batch of suggestions for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub enriched: usize,
    pub appended: usize,
    pub dropped: usize,
    /// Suggestions that enriched or created a finding, in input order.
    pub accepted: Vec<Suggestion>,
}

#[derive(Debug, Default, Clone)]
pub struct Reconciler<M = SubstringMatcher> {
    matcher: M,
}

impl Reconciler<SubstringMatcher> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M: IssueMatcher> Reconciler<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    /// Enrich or extend `findings` with `suggestions` for a document of `doc_type`.
    ///
    /// Existing findings are never removed or reordered. Each applicable
    /// suggestion enriches the first matching finding, or is appended as a new
    /// Medium finding when nothing matches.
    pub fn reconcile(
        &self,
        findings: &mut Vec<Finding>,
        suggestions: &[Suggestion],
        doc_type: DocumentType,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut keys: Vec<String> = findings.iter().map(Finding::key).collect();

        for suggestion in suggestions {
            let key = suggestion.key();
            if key.is_empty() {
                trace!("discarding suggestion without a usable issue");
                outcome.dropped += 1;
                continue;
            }
            if !accepts_issue_key(doc_type, &key) {
                debug!(%doc_type, issue = %suggestion.issue, "suggestion not applicable to document type");
                outcome.dropped += 1;
                continue;
            }

            let hit = keys
                .iter()
                .position(|finding_key| self.matcher.matches(&key, finding_key));
            match hit {
                Some(idx) => {
                    let finding = &mut findings[idx];
                    finding.suggestion_ai = Some(suggestion.suggestion.clone());
                    finding.rationale_ai = Some(suggestion.rationale.clone());
                    finding.citation_label = suggestion.citation_label.clone();
                    trace!(issue = %finding.issue, "suggestion enriched existing finding");
                    outcome.enriched += 1;
                }
                None => {
                    let mut finding = Finding::new(
                        doc_type,
                        suggestion.issue.trim(),
                        Severity::Medium,
                        String::new(),
                    );
                    finding.suggestion_ai = Some(suggestion.suggestion.clone());
                    finding.rationale_ai = Some(suggestion.rationale.clone());
                    finding.citation_label = suggestion.citation_label.clone();
                    findings.push(finding);
                    keys.push(key);
                    outcome.appended += 1;
                }
            }
            outcome.accepted.push(suggestion.clone());
        }

        debug!(
            enriched = outcome.enriched,
            appended = outcome.appended,
            dropped = outcome.dropped,
            "suggestions reconciled"
        );
        outcome
    }
}

/// Reconcile with the default substring matcher.
pub fn reconcile(
    findings: &mut Vec<Finding>,
    suggestions: &[Suggestion],
    doc_type: DocumentType,
) -> ReconcileOutcome {
    Reconciler::new().reconcile(findings, suggestions, doc_type)
}
