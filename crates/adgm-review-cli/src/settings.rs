use std::collections::HashMap;
use std::path::{Path, PathBuf};

use adgm_review_core::SuggestionSettings;
use anyhow::{Context, Result};
use ::config::{Config, File};
use serde::Deserialize;

pub const DEFAULT_RULES: &str = "./config/adgm_rules.json";
pub const DEFAULT_REFERENCES: &str = "./data/adgm_refs.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";

/// Optional settings file passed with `--config` (TOML, YAML or JSON).
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub review: ReviewSection,
    #[serde(default)]
    pub ai: AiSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewSection {
    pub rules: Option<PathBuf>,
    pub references: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Suggestion-service settings. The API key is only read from the environment.
#[derive(Debug, Default, Deserialize)]
pub struct AiSection {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl FileConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        Config::builder()
            .add_source(File::from(path))
            .build()
            .and_then(Config::try_deserialize)
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    pub fn rules_path(&self, flag: Option<PathBuf>) -> PathBuf {
        pick(flag, &self.review.rules, DEFAULT_RULES)
    }

    pub fn references_path(&self, flag: Option<PathBuf>) -> PathBuf {
        pick(flag, &self.review.references, DEFAULT_REFERENCES)
    }

    pub fn output_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        pick(flag, &self.review.output_dir, DEFAULT_OUTPUT_DIR)
    }

    /// Resolve suggestion settings: environment variables override the `ai` table.
    pub fn suggestion_settings<I>(&self, env: I) -> Result<SuggestionSettings>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars = self.ai.as_vars();
        vars.extend(env);
        SuggestionSettings::from_map(vars)
    }
}

impl AiSection {
    fn as_vars(&self) -> HashMap<String, String> {
        let entries = [
            (SuggestionSettings::PROVIDER_ENV, self.provider.clone()),
            (SuggestionSettings::MODEL_ENV, self.model.clone()),
            (SuggestionSettings::ENDPOINT_ENV, self.endpoint.clone()),
            (
                SuggestionSettings::TIMEOUT_ENV,
                self.timeout_secs.map(|v| v.to_string()),
            ),
            (
                SuggestionSettings::RETRIES_ENV,
                self.max_retries.map(|v| v.to_string()),
            ),
        ];
        entries
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)))
            .collect()
    }
}

fn pick(flag: Option<PathBuf>, file: &Option<PathBuf>, default: &str) -> PathBuf {
    flag.or_else(|| file.clone())
        .unwrap_or_else(|| PathBuf::from(default))
}
