use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::locate::{fallback_index, target_index};
use crate::reconcile::Suggestion;
use crate::rules::RedFlag;

const DEFAULT_CITATION: &str = "ADGM Reference";

/// Visual weight of an annotation in the reviewed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Informational,
    Critical,
}

/// One comment to attach to one paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub paragraph: usize,
    pub comment: String,
    pub highlight: Highlight,
}

/// Identity of a written annotation: paragraph plus case-folded, trimmed comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationTarget {
    pub paragraph: usize,
    pub comment: String,
}

impl AnnotationTarget {
    pub fn new(paragraph: usize, comment: &str) -> Self {
        Self {
            paragraph,
            comment: comment.trim().to_lowercase(),
        }
    }
}

/// Targets already committed for the current document. Create one per document.
#[derive(Debug, Default, Clone)]
pub struct AnnotationLedger {
    written: HashSet<AnnotationTarget>,
}

impl AnnotationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_write(&self, target: &AnnotationTarget) -> bool {
        !self.written.contains(target)
    }

    pub fn record(&mut self, target: AnnotationTarget) {
        self.written.insert(target);
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }
}

/// Builds the ordered, duplicate-free annotation list for one document.
struct Planner<'a> {
    paragraphs: &'a [String],
    ledger: AnnotationLedger,
    annotations: Vec<Annotation>,
}

impl<'a> Planner<'a> {
    fn push(&mut self, snippet: &str, comment: String, highlight: Highlight) {
        let paragraph = target_index(snippet, self.paragraphs);
        let target = AnnotationTarget::new(paragraph, &comment);
        if !self.ledger.should_write(&target) {
            return;
        }
        self.ledger.record(target);
        self.annotations.push(Annotation {
            paragraph,
            comment,
            highlight,
        });
    }
}

/// Annotation instructions for a document: missing clauses, then red flags,
/// then accepted suggestions.
pub fn plan_annotations(
    document: &Document,
    missing_clauses: &[String],
    red_flags: &[RedFlag],
    suggestions: &[Suggestion],
) -> Vec<Annotation> {
    let mut planner = Planner {
        paragraphs: document.paragraphs(),
        ledger: AnnotationLedger::new(),
        annotations: Vec::new(),
    };

    for clause in missing_clauses {
        planner.push(
            clause,
            format!("Missing required clause: {clause}"),
            Highlight::Informational,
        );
    }
    for flag in red_flags {
        planner.push(
            &flag.matched,
            format!("Red flag: {}", flag.issue),
            Highlight::Critical,
        );
    }
    for suggestion in suggestions {
        let key_phrase = suggestion.issue.split(':').next().unwrap_or_default().trim();
        planner.push(key_phrase, suggestion_comment(suggestion), Highlight::Informational);
    }

    planner.annotations
}

fn suggestion_comment(suggestion: &Suggestion) -> String {
    let mut comment = format!("AI Suggestion: {}", suggestion.suggestion);
    let source = suggestion.citation_label.as_deref().unwrap_or(DEFAULT_CITATION);
    if !source.is_empty() {
        comment.push_str(" | Source: ");
        comment.push_str(source);
    }
    comment
}

/// Render the document with inline comment markers appended to target paragraphs.
///
/// Out-of-range indices land on the last paragraph.
pub fn render_reviewed_text(document: &Document, annotations: &[Annotation]) -> String {
    let paragraphs = document.paragraphs();
    if paragraphs.is_empty() {
        return annotations
            .iter()
            .map(|annotation| marker(annotation).trim_start().to_string())
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut rendered: Vec<String> = paragraphs.to_vec();
    let last = fallback_index(paragraphs.len());
    for annotation in annotations {
        let idx = annotation.paragraph.min(last);
        rendered[idx].push_str(&marker(annotation));
    }
    rendered.join("\n")
}

fn marker(annotation: &Annotation) -> String {
    match annotation.highlight {
        Highlight::Informational => format!(" [COMMENT: {}]", annotation.comment),
        Highlight::Critical => format!(" [CRITICAL: {}]", annotation.comment),
    }
}
