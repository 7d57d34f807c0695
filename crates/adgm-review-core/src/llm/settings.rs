use anyhow::{Context, Result};
use std::collections::HashMap;

/// Environment-driven configuration for the suggestion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSettings {
    pub provider: String,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
}

impl SuggestionSettings {
    pub const PROVIDER_ENV: &'static str = "ADGM_REVIEW_PROVIDER";
    pub const API_KEY_ENV: &'static str = "ADGM_REVIEW_API_KEY";
    pub const FALLBACK_API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    pub const ENDPOINT_ENV: &'static str = "ADGM_REVIEW_ENDPOINT";
    pub const MODEL_ENV: &'static str = "ADGM_REVIEW_MODEL";
    pub const TIMEOUT_ENV: &'static str = "ADGM_REVIEW_TIMEOUT_SECS";
    pub const RETRIES_ENV: &'static str = "ADGM_REVIEW_MAX_RETRIES";

    /// Load settings from environment variables.
    ///
    /// * `ADGM_REVIEW_PROVIDER` : `openai` (any OpenAI-compatible endpoint, default) or `noop`.
    /// * `ADGM_REVIEW_API_KEY` : bearer token; falls back to `OPENAI_API_KEY`.
    /// * `ADGM_REVIEW_ENDPOINT` : base URL (default: the Groq OpenAI-compatible API).
    pub fn from_env() -> Result<Self> {
        Self::from_map(std::env::vars().collect())
    }

    /// Same as [`Self::from_env`] but reads from an explicit variable map.
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let non_blank = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = non_blank(Self::PROVIDER_ENV).unwrap_or_else(|| "openai".to_string());
        let api_key = non_blank(Self::API_KEY_ENV).or_else(|| non_blank(Self::FALLBACK_API_KEY_ENV));
        let api_key = match provider.to_lowercase().as_str() {
            "noop" => api_key.unwrap_or_default(),
            _ => api_key.with_context(|| {
                format!(
                    "environment variable {} (or {}) must be set when --with-ai is used",
                    Self::API_KEY_ENV,
                    Self::FALLBACK_API_KEY_ENV
                )
            })?,
        };
        let timeout_secs = non_blank(Self::TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok());
        let max_retries = non_blank(Self::RETRIES_ENV)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(2);

        Ok(Self {
            provider,
            api_key,
            endpoint: non_blank(Self::ENDPOINT_ENV),
            model: non_blank(Self::MODEL_ENV),
            timeout_secs,
            max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_openai_compatible_provider() {
        let settings =
            SuggestionSettings::from_map(vars(&[(SuggestionSettings::API_KEY_ENV, "secret")]))
                .expect("should load settings");
        assert_eq!(settings.provider, "openai");
        assert_eq!(settings.api_key, "secret");
        assert!(settings.endpoint.is_none());
        assert!(settings.model.is_none());
        assert!(settings.timeout_secs.is_none());
        assert_eq!(settings.max_retries, 2);
    }

    #[test]
    fn falls_back_to_openai_api_key() {
        let settings = SuggestionSettings::from_map(vars(&[
            (SuggestionSettings::API_KEY_ENV, "   "),
            (SuggestionSettings::FALLBACK_API_KEY_ENV, "gsk-123"),
        ]))
        .unwrap();
        assert_eq!(settings.api_key, "gsk-123");
    }

    #[test]
    fn errors_when_api_key_missing() {
        let err = SuggestionSettings::from_map(vars(&[(SuggestionSettings::PROVIDER_ENV, "openai")]))
            .expect_err("missing API key should error");
        assert!(err.to_string().contains(SuggestionSettings::API_KEY_ENV));
    }

    #[test]
    fn noop_provider_allows_missing_key() {
        let settings =
            SuggestionSettings::from_map(vars(&[(SuggestionSettings::PROVIDER_ENV, "noop")]))
                .expect("noop should not require key");
        assert_eq!(settings.provider, "noop");
        assert!(settings.api_key.is_empty());
    }

    #[test]
    fn parses_timeout_and_retries() {
        let settings = SuggestionSettings::from_map(vars(&[
            (SuggestionSettings::API_KEY_ENV, "secret"),
            (SuggestionSettings::TIMEOUT_ENV, " 45 "),
            (SuggestionSettings::RETRIES_ENV, "5"),
            (SuggestionSettings::MODEL_ENV, "llama-3.3-70b-versatile"),
        ]))
        .unwrap();
        assert_eq!(settings.timeout_secs, Some(45));
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.model.as_deref(), Some("llama-3.3-70b-versatile"));
    }

    #[test]
    fn ignores_unparsable_numbers() {
        let settings = SuggestionSettings::from_map(vars(&[
            (SuggestionSettings::PROVIDER_ENV, "noop"),
            (SuggestionSettings::TIMEOUT_ENV, "soon"),
            (SuggestionSettings::RETRIES_ENV, "-1"),
        ]))
        .unwrap();
        assert!(settings.timeout_secs.is_none());
        assert_eq!(settings.max_retries, 2);
    }
}
