mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use adgm_review_core::{
    build_provider, load_references, render_summary, write_json_report, write_reviewed_copies,
    Advisor, BatchOutcome, BatchSummary, FileRuleRepository, OutputFormat, Reviewer,
    RuleRepository, RuleSet,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::settings::FileConfig;

#[derive(Parser, Debug)]
#[command(
    name = "adgm-review",
    author,
    version,
    about = "ADGM corporate document compliance reviewer"
)]
struct Cli {
    /// Rule set file (JSON or YAML) [default: ./config/adgm_rules.json]
    #[arg(long, value_name = "FILE", global = true)]
    rules: Option<PathBuf>,

    /// Labelled ADGM reference snippets [default: ./data/adgm_refs.txt]
    #[arg(long, value_name = "FILE", global = true)]
    references: Option<PathBuf>,

    /// Optional settings file with `review` and `ai` tables
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Review plain-text documents and write annotated copies plus a JSON summary
    Review {
        /// Documents to review, one paragraph per line
        #[arg(value_name = "FILES")]
        files: Vec<PathBuf>,
        /// Ask the suggestion service for rationales and rewrites
        #[arg(long)]
        with_ai: bool,
        /// Directory for reviewed copies and the summary [default: data/output]
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Print the summary as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// List the loaded rule set
    ListRules {
        /// Emit rules as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let file_config = FileConfig::load(cli.config.as_deref())?;
    let rules_path = file_config.rules_path(cli.rules.clone());

    match cli.command.unwrap_or(Commands::ListRules { json: false }) {
        Commands::ListRules { json } => list_rules(&rules_path, json).await?,
        Commands::Review {
            files,
            with_ai,
            output_dir,
            json,
        } => {
            let rules = load_rules(&rules_path).await?;
            let advisor = if with_ai {
                build_advisor(&file_config, file_config.references_path(cli.references.clone()))
            } else {
                None
            };
            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            };
            review(
                Arc::new(rules),
                advisor,
                &files,
                &file_config.output_dir(output_dir),
                format,
            )
            .await?
        }
    }
    Ok(())
}

async fn load_rules(path: &Path) -> Result<RuleSet> {
    let repo = FileRuleRepository::new(path);
    RuleRepository::load_rules(&repo)
        .await
        .with_context(|| format!("failed to load rules from {}", path.display()))
}

async fn list_rules(path: &Path, json: bool) -> Result<()> {
    let rules = load_rules(path).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    println!(
        "{} required document(s), {} clause list(s) loaded from {}",
        rules.required_documents.len(),
        rules.clauses_per_doc.len(),
        path.display()
    );
    println!("Required documents:");
    for doc in &rules.required_documents {
        println!("  - {doc}");
    }
    println!("Required clauses:");
    for (doc_type, clauses) in &rules.clauses_per_doc {
        println!("  - {:<36} {}", doc_type.bold(), clauses.join(", "));
    }
    Ok(())
}

/// Suggestion enrichment is best effort: bad settings fall back to a rule-only run.
fn build_advisor(file_config: &FileConfig, references_path: PathBuf) -> Option<Advisor> {
    let built = file_config
        .suggestion_settings(std::env::vars())
        .and_then(|settings| build_provider(&settings))
        .and_then(|provider| Ok((provider, load_references(&references_path)?)));
    match built {
        Ok((provider, references)) => {
            info!(
                references = references.len(),
                path = %references_path.display(),
                "suggestion service enabled"
            );
            Some(Advisor::new(provider, references))
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "suggestion service unavailable; running rule checks only");
            None
        }
    }
}

async fn review(
    rules: Arc<RuleSet>,
    advisor: Option<Advisor>,
    files: &[PathBuf],
    output_dir: &Path,
    format: OutputFormat,
) -> Result<()> {
    let mut reviewer = Reviewer::new(rules);
    if let Some(advisor) = advisor {
        reviewer = reviewer.with_advisor(advisor);
    }

    let batch = match reviewer.review_files(files).await {
        BatchOutcome::NoFiles(message) => {
            println!("{message}");
            return Ok(());
        }
        BatchOutcome::Reviewed(batch) => batch,
    };

    let reviewed_files: Vec<String> = write_reviewed_copies(&batch, output_dir)?
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    let generated = SystemTime::now();
    let summary = BatchSummary::new(&batch, &reviewed_files, generated);
    let report_path = write_json_report(&summary, output_dir, generated)?;

    match format {
        OutputFormat::Json => println!("{}", render_summary(&summary, OutputFormat::Json)?),
        OutputFormat::Human => {
            print!("{}", render_summary(&summary, OutputFormat::Human)?);
            let issues = summary.issues_found.len();
            let status = if issues == 0 {
                "compliant".green()
            } else {
                format!("{issues} issue(s)").yellow()
            };
            println!(
                "\n{} {} document(s) reviewed: {}",
                "Done:".bold(),
                batch.documents.len(),
                status
            );
            println!("Summary written to {}", report_path.display());
        }
    }
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
