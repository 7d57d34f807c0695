//! Per-document and batch review pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::annotate::{plan_annotations, render_reviewed_text, Annotation};
use crate::document::{detect_process, Document, DocumentType};
use crate::llm::Advisor;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::rules::{engine::RuleEngine, Finding, RuleSet};

/// Shown when a batch contains no files at all.
pub const NO_FILES_MESSAGE: &str = "No files received. Please upload one or more .txt files.";

/// Result of reviewing one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReview {
    pub file: String,
    pub doc_type: DocumentType,
    pub findings: Vec<Finding>,
    pub annotations: Vec<Annotation>,
    #[serde(skip)]
    pub reviewed_text: String,
    #[serde(skip)]
    pub reconciliation: Option<ReconcileOutcome>,
}

/// A file that could not be reviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Result of reviewing a batch of documents.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReview {
    pub process: String,
    pub required_documents: usize,
    pub missing_documents: Vec<String>,
    pub documents: Vec<DocumentReview>,
    pub skipped: Vec<SkippedFile>,
    pub ai_used: bool,
}

impl BatchReview {
    /// Every finding in the batch, in document order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.documents.iter().flat_map(|review| review.findings.iter())
    }
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// Nothing was submitted; carries [`NO_FILES_MESSAGE`].
    NoFiles(&'static str),
    Reviewed(BatchReview),
}

/// Runs the rule engine, the optional suggestion service, reconciliation and
/// annotation planning over documents, one at a time.
pub struct Reviewer {
    engine: RuleEngine,
    reconciler: Reconciler,
    advisor: Option<Advisor>,
}

impl Reviewer {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            engine: RuleEngine::new(rules),
            reconciler: Reconciler::new(),
            advisor: None,
        }
    }

    pub fn with_advisor(mut self, advisor: Advisor) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn ai_enabled(&self) -> bool {
        self.advisor.is_some()
    }

    #[instrument(skip_all, fields(file = %file.as_ref().display()))]
    pub async fn review_document(&self, file: impl AsRef<Path>, document: &Document) -> DocumentReview {
        let file = file.as_ref();
        let doc_type = DocumentType::infer(file, document.full_text());
        let evaluation = self.engine.evaluate(document, doc_type);
        let mut findings = evaluation.findings;

        let reconciliation = match &self.advisor {
            Some(advisor) => {
                let suggestions = advisor.suggest(document, &findings).await;
                Some(self.reconciler.reconcile(&mut findings, &suggestions, doc_type))
            }
            None => None,
        };
        let accepted = reconciliation
            .as_ref()
            .map(|outcome| outcome.accepted.as_slice())
            .unwrap_or(&[]);

        let annotations = plan_annotations(
            document,
            &evaluation.missing_clauses,
            &evaluation.red_flags,
            accepted,
        );
        let reviewed_text = render_reviewed_text(document, &annotations);
        info!(
            %doc_type,
            findings = findings.len(),
            annotations = annotations.len(),
            "document reviewed"
        );

        DocumentReview {
            file: file.display().to_string(),
            doc_type,
            findings,
            annotations,
            reviewed_text,
            reconciliation,
        }
    }

    /// Review already-extracted documents and derive the batch-level results.
    pub async fn review_documents<P: AsRef<Path>>(&self, documents: &[(P, Document)]) -> BatchOutcome {
        if documents.is_empty() {
            return BatchOutcome::NoFiles(NO_FILES_MESSAGE);
        }
        let mut reviews = Vec::with_capacity(documents.len());
        for (file, document) in documents {
            reviews.push(self.review_document(file, document).await);
        }
        BatchOutcome::Reviewed(self.summarize(reviews, Vec::new()))
    }

    /// Read plain-text files and review them in order. Unreadable files are
    /// skipped and reported; they never abort the batch.
    pub async fn review_files(&self, paths: &[PathBuf]) -> BatchOutcome {
        if paths.is_empty() {
            return BatchOutcome::NoFiles(NO_FILES_MESSAGE);
        }
        let mut reviews = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for path in paths {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    let document = Document::from_text(&text);
                    reviews.push(self.review_document(path, &document).await);
                }
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping unreadable document");
                    skipped.push(SkippedFile {
                        file: path.display().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        BatchOutcome::Reviewed(self.summarize(reviews, skipped))
    }

    fn summarize(&self, documents: Vec<DocumentReview>, skipped: Vec<SkippedFile>) -> BatchReview {
        let rules = self.engine.rules();
        let detected: Vec<DocumentType> = documents.iter().map(|review| review.doc_type).collect();
        BatchReview {
            process: detect_process(detected.iter().copied()).to_string(),
            required_documents: rules.required_documents.len(),
            missing_documents: rules.missing_documents(detected),
            skipped,
            ai_used: self.ai_enabled(),
            documents,
        }
    }
}
