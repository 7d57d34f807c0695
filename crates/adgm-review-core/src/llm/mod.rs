//! Suggestion service: provider abstraction, reference retrieval, prompting
//! and response parsing.

mod openai;
pub mod prompt;
pub mod references;
mod settings;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::Document;
use crate::reconcile::Suggestion;
use crate::rules::Finding;

pub use openai::OpenAiCompatibleClient;
pub use references::{load_references, retrieve_top_k, ReferenceSnippet};
pub use settings::SuggestionSettings;

/// Number of reference snippets retrieved per document.
pub const DEFAULT_TOP_K: usize = 3;

/// Source of raw model text for a prompt.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Provider that never suggests anything.
#[derive(Debug, Default, Clone)]
pub struct NoopSuggestionProvider;

#[async_trait]
impl SuggestionProvider for NoopSuggestionProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("[]".to_string())
    }
}

/// Typed failures at the suggestion-service boundary.
#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error("API key must be provided via {0}")]
    MissingApiKey(&'static str),
    #[error("suggestion service error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("suggestion service response missing message content")]
    MissingContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiCompatible,
    Noop,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" | "groq" => Some(Self::OpenAiCompatible),
            "noop" => Some(Self::Noop),
            _ => None,
        }
    }
}

/// Instantiate the provider named by `settings.provider`.
pub fn build_provider(settings: &SuggestionSettings) -> Result<Box<dyn SuggestionProvider>> {
    match ProviderKind::parse(&settings.provider) {
        Some(ProviderKind::OpenAiCompatible) => {
            Ok(Box::new(OpenAiCompatibleClient::new(settings)?))
        }
        Some(ProviderKind::Noop) => Ok(Box::new(NoopSuggestionProvider)),
        None => bail!("unsupported suggestion provider `{}`", settings.provider),
    }
}

/// Parse model output into suggestions. Never fails: anything unusable yields an empty list.
///
/// The JSON list is taken from the first `[` to the last `]`; strict JSON is
/// tried first, then JSON5 for trailing commas and single quotes.
pub fn parse_suggestions(raw: &str) -> Vec<Suggestion> {
    let slice = match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    };
    let value = serde_json::from_str::<Value>(slice)
        .ok()
        .or_else(|| json5::from_str::<Value>(slice).ok());
    let Some(Value::Array(items)) = value else {
        debug!("suggestion response was not a JSON list");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(suggestion_from_object)
        .collect()
}

fn suggestion_from_object(object: &Map<String, Value>) -> Suggestion {
    let text = |key: &str| match object.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    Suggestion {
        issue: text("issue").unwrap_or_default(),
        rationale: text("rationale").unwrap_or_default(),
        suggestion: text("suggestion").unwrap_or_default(),
        citation_label: text("citation_label"),
    }
}

/// Asks a provider for suggestions on one document, grounded in reference snippets.
pub struct Advisor {
    provider: Box<dyn SuggestionProvider>,
    references: Vec<ReferenceSnippet>,
}

impl Advisor {
    pub fn new(provider: Box<dyn SuggestionProvider>, references: Vec<ReferenceSnippet>) -> Self {
        Self {
            provider,
            references,
        }
    }

    /// Suggestions for `document`. Provider failures are logged and yield none.
    pub async fn suggest(&self, document: &Document, findings: &[Finding]) -> Vec<Suggestion> {
        let query = prompt::retrieval_query(document.full_text(), findings);
        let retrieved = retrieve_top_k(&query, &self.references, DEFAULT_TOP_K);
        let request = prompt::build_issue_prompt(document.full_text(), findings, &retrieved);

        let raw = match self.provider.complete(&request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "suggestion service failed; continuing without suggestions");
                return Vec::new();
            }
        };

        let mut suggestions = parse_suggestions(&raw);
        if let Some(top) = retrieved.first() {
            for suggestion in &mut suggestions {
                if suggestion.citation_label.is_none() {
                    suggestion.citation_label = Some(top.label.clone());
                }
            }
        }
        debug!(count = suggestions.len(), "parsed suggestions");
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentType;
    use crate::rules::Severity;
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SuggestionProvider for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow::anyhow!(message.clone())),
            }
        }
    }

    #[async_trait]
    impl SuggestionProvider for std::sync::Arc<Scripted> {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.as_ref().complete(prompt).await
        }
    }

    fn references() -> Vec<ReferenceSnippet> {
        vec![
            ReferenceSnippet {
                label: "ADGM Courts".into(),
                text: "Disputes are heard by the ADGM Courts, not the UAE federal court.".into(),
            },
            ReferenceSnippet {
                label: "Execution".into(),
                text: "Documents must be signed by authorised signatories.".into(),
            },
        ]
    }

    #[test]
    fn parses_list_embedded_in_prose() {
        let raw = "Sure! Here you go:\n[{\"issue\": \"Jurisdiction\", \"rationale\": \"r\", \
                   \"suggestion\": \"Use ADGM Courts\", \"citation_label\": \"ADGM Courts\"}]\nThanks.";
        let parsed = parse_suggestions(raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].issue, "Jurisdiction");
        assert_eq!(parsed[0].citation_label.as_deref(), Some("ADGM Courts"));
    }

    #[test]
    fn falls_back_to_json5() {
        let raw = "[{issue: 'Signatories', suggestion: 'Add a signature block',},]";
        let parsed = parse_suggestions(raw);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].suggestion, "Add a signature block");
        assert!(parsed[0].rationale.is_empty());
        assert!(parsed[0].citation_label.is_none());
    }

    #[test]
    fn unusable_output_yields_nothing() {
        assert!(parse_suggestions("").is_empty());
        assert!(parse_suggestions("no json here").is_empty());
        assert!(parse_suggestions("{\"issue\": \"x\"}").is_empty());
        assert!(parse_suggestions("[1, \"two\", null]").is_empty());
    }

    #[test]
    fn non_string_fields_are_stringified() {
        let parsed = parse_suggestions("[{\"issue\": 42, \"citation_label\": null}]");
        assert_eq!(parsed[0].issue, "42");
        assert!(parsed[0].citation_label.is_none());
    }

    #[test]
    fn provider_names_resolve() {
        assert_eq!(ProviderKind::parse("OpenAI"), Some(ProviderKind::OpenAiCompatible));
        assert_eq!(ProviderKind::parse("groq"), Some(ProviderKind::OpenAiCompatible));
        assert_eq!(ProviderKind::parse(" noop "), Some(ProviderKind::Noop));
        assert_eq!(ProviderKind::parse("azure"), None);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let settings = SuggestionSettings {
            provider: "azure".into(),
            api_key: "k".into(),
            endpoint: None,
            model: None,
            timeout_secs: None,
            max_retries: 0,
        };
        let err = build_provider(&settings).err().expect("should fail");
        assert!(err.to_string().contains("azure"));
    }

    #[tokio::test]
    async fn noop_provider_returns_empty_list() {
        let advisor = Advisor::new(Box::new(NoopSuggestionProvider), references());
        let doc = Document::from_text("Articles of Association");
        assert!(advisor.suggest(&doc, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn fills_missing_citation_from_top_reference() {
        let provider = std::sync::Arc::new(Scripted::ok(
            "[{\"issue\": \"Jurisdiction\", \"suggestion\": \"Use ADGM Courts\"}, \
              {\"issue\": \"Signatories\", \"citation_label\": \"Execution\"}]",
        ));
        let advisor = Advisor::new(Box::new(provider.clone()), references());
        let doc = Document::from_text("Articles of Association\nJurisdiction: UAE Federal Court");
        let findings = vec![Finding::new(
            DocumentType::ArticlesOfAssociation,
            "References UAE Federal Court instead of ADGM",
            Severity::High,
            "",
        )];

        let suggestions = advisor.suggest(&doc, &findings).await;
        assert_eq!(suggestions[0].citation_label.as_deref(), Some("ADGM Courts"));
        assert_eq!(suggestions[1].citation_label.as_deref(), Some("Execution"));

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("- ADGM Courts: Disputes are heard"));
        assert!(!prompts[0].contains("- Execution:"));
    }

    #[tokio::test]
    async fn provider_failure_yields_no_suggestions() {
        let provider = Scripted {
            reply: Err("connection refused".into()),
            prompts: Mutex::new(Vec::new()),
        };
        let advisor = Advisor::new(Box::new(provider), references());
        let doc = Document::from_text("Board Resolution");
        assert!(advisor.suggest(&doc, &[]).await.is_empty());
    }
}
