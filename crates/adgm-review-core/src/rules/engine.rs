use std::sync::Arc;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use tracing::{debug, instrument, trace};

use super::{Finding, RedFlag, RuleSet, Severity};
use crate::document::{Document, DocumentType};

/// Hedge phrases that make an obligation non-binding.
pub const AMBIGUOUS_MARKERS: [&str; 4] = [
    "may consider",
    "where possible",
    "as appropriate",
    "at its discretion",
];

pub const WRONG_JURISDICTION_ISSUE: &str = "References UAE Federal Court instead of ADGM";
pub const AMBIGUOUS_LANGUAGE_ISSUE: &str = "Ambiguous or non-binding language";
pub const MISSING_SIGNATORY_ISSUE: &str = "Appears to be missing signatory section";

const WRONG_JURISDICTION_MARKER: &str = "uae federal court";
const WRONG_JURISDICTION_MATCH: &str = "UAE Federal Court";
const SIGNATURE_MATCH: &str = "signature";
const RED_FLAG_SUGGESTION: &str = "Align with ADGM wording where applicable.";

static HEDGE_AUTOMATON: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostFirst)
        .build(AMBIGUOUS_MARKERS)
        .expect("hedge markers form a valid automaton")
});

/// Required clause keywords for `doc_type` that do not occur in the document.
///
/// Matching is a case-insensitive substring test against the full text; the
/// result keeps rule-set order.
pub fn check_required_clauses(
    document: &Document,
    doc_type: DocumentType,
    rules: &RuleSet,
) -> Vec<String> {
    let text = document.full_text().to_lowercase();
    rules
        .required_clauses(doc_type)
        .iter()
        .map(|clause| clause.trim())
        .filter(|clause| !clause.is_empty())
        .filter(|clause| !text.contains(&clause.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Every red flag that applies to the document; checks are independent.
pub fn find_red_flags(document: &Document, doc_type: DocumentType) -> Vec<RedFlag> {
    let text = document.full_text();
    let lowered = text.to_lowercase();
    let mut flags = Vec::new();

    if lowered.contains(WRONG_JURISDICTION_MARKER) {
        flags.push(RedFlag {
            issue: WRONG_JURISDICTION_ISSUE.to_string(),
            severity: Severity::High,
            matched: WRONG_JURISDICTION_MATCH.to_string(),
        });
    }

    // Report the hedge as written so the flag can be anchored to its paragraph.
    if let Some(hedge) = HEDGE_AUTOMATON.find(text) {
        flags.push(RedFlag {
            issue: AMBIGUOUS_LANGUAGE_ISSUE.to_string(),
            severity: Severity::Medium,
            matched: text[hedge.start()..hedge.end()].to_string(),
        });
    }

    if doc_type.requires_signature() && !lowered.contains("sign") {
        flags.push(RedFlag {
            issue: MISSING_SIGNATORY_ISSUE.to_string(),
            severity: Severity::High,
            matched: SIGNATURE_MATCH.to_string(),
        });
    }

    flags
}

/// Turn rule results into report findings: missing clauses first, then red flags.
pub fn build_findings(
    doc_type: DocumentType,
    missing_clauses: &[String],
    red_flags: &[RedFlag],
) -> Vec<Finding> {
    let missing = missing_clauses.iter().map(|clause| {
        Finding::new(
            doc_type,
            format!("Missing required clause: {clause}"),
            Severity::High,
            format!("Add clause referencing '{clause}'."),
        )
    });
    let flagged = red_flags.iter().map(|flag| {
        Finding::new(
            doc_type,
            flag.issue.clone(),
            flag.severity,
            RED_FLAG_SUGGESTION,
        )
    });
    missing.chain(flagged).collect()
}

/// Everything the rule engine derives for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub missing_clauses: Vec<String>,
    pub red_flags: Vec<RedFlag>,
    pub findings: Vec<Finding>,
}

/// Rule engine bound to a shared, read-only rule set.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Arc<RuleSet>,
}

impl RuleEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[instrument(
        name = "evaluate_rules",
        skip_all,
        fields(doc_type = %doc_type, paragraphs = document.paragraphs().len())
    )]
    pub fn evaluate(&self, document: &Document, doc_type: DocumentType) -> Evaluation {
        let missing_clauses = check_required_clauses(document, doc_type, &self.rules);
        trace!(?missing_clauses, "required clause check finished");
        let red_flags = find_red_flags(document, doc_type);
        trace!(count = red_flags.len(), "red flag check finished");
        let findings = build_findings(doc_type, &missing_clauses, &red_flags);
        debug!(
            missing = missing_clauses.len(),
            red_flags = red_flags.len(),
            "rule evaluation completed"
        );
        Evaluation {
            missing_clauses,
            red_flags,
            findings,
        }
    }
}
