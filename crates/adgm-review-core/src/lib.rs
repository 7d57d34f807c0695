pub mod annotate;
pub mod document;
pub mod llm;
pub mod locate;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod review;
pub mod rules;

pub use annotate::{
    plan_annotations, render_reviewed_text, Annotation, AnnotationLedger, AnnotationTarget,
    Highlight,
};
pub use document::{detect_process, Document, DocumentType};
pub use llm::{
    build_provider, load_references, parse_suggestions, Advisor, NoopSuggestionProvider,
    ReferenceSnippet, SuggestionError, SuggestionProvider, SuggestionSettings,
};
pub use locate::{locate, target_index};
pub use normalize::normalize_issue_key;
pub use reconcile::{reconcile, IssueMatcher, ReconcileOutcome, Reconciler, Suggestion};
pub use report::{render_summary, write_json_report, write_reviewed_copies, BatchSummary, OutputFormat};
pub use review::{BatchOutcome, BatchReview, DocumentReview, Reviewer, SkippedFile, NO_FILES_MESSAGE};
pub use rules::{
    engine::{Evaluation, RuleEngine},
    file_repository::FileRuleRepository,
    Finding, RedFlag, RuleRepository, RuleSet, RuleSetError, Severity,
};
