use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::debug;

use super::{RuleRepository, RuleSet, RuleSetError};

/// Loads a rule set from a JSON or YAML file, parsing it once per repository.
pub struct FileRuleRepository {
    path: PathBuf,
    cache: OnceCell<RuleSet>,
}

impl FileRuleRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    fn parse(&self) -> Result<RuleSet> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read rule set at {}", self.path.display()))?;
        let extension = self
            .path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let value: Value = match extension.as_str() {
            "json" => serde_json::from_str(&raw).with_context(|| {
                format!("invalid JSON in rule set at {}", self.path.display())
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&raw).with_context(|| {
                format!("invalid YAML in rule set at {}", self.path.display())
            })?,
            _ => return Err(RuleSetError::UnsupportedFormat { extension }.into()),
        };
        let rules = RuleSet::from_value(&value)
            .with_context(|| format!("invalid rule set at {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            document_types = rules.clauses_per_doc.len(),
            required_documents = rules.required_documents.len(),
            "rule set loaded"
        );
        Ok(rules)
    }
}

#[async_trait::async_trait]
impl RuleRepository for FileRuleRepository {
    async fn load_rules(&self) -> Result<RuleSet> {
        let rules = self.cache.get_or_try_init(|| self.parse())?;
        Ok(rules.clone())
    }
}
