use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::review::{BatchReview, SkippedFile};
use crate::rules::Finding;

/// Format styles supported by the summary renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Batch-level report written next to the reviewed documents.
#[derive(Debug, Serialize)]
pub struct BatchSummary<'a> {
    pub process: &'a str,
    pub documents_uploaded: usize,
    pub required_documents: usize,
    pub missing_documents: &'a [String],
    pub issues_found: Vec<&'a Finding>,
    pub reviewed_files: &'a [String],
    pub skipped_files: &'a [SkippedFile],
    pub ai_used: bool,
    pub generated_at: String,
}

impl<'a> BatchSummary<'a> {
    pub fn new(batch: &'a BatchReview, reviewed_files: &'a [String], generated: SystemTime) -> Self {
        Self {
            process: &batch.process,
            documents_uploaded: batch.documents.len() + batch.skipped.len(),
            required_documents: batch.required_documents,
            missing_documents: &batch.missing_documents,
            issues_found: batch.findings().collect(),
            reviewed_files,
            skipped_files: &batch.skipped,
            ai_used: batch.ai_used,
            generated_at: humantime::format_rfc3339_seconds(generated).to_string(),
        }
    }
}

/// Produce a summary string in the desired format.
pub fn render_summary(summary: &BatchSummary<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => render_human(summary),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
    }
}

fn render_human(summary: &BatchSummary<'_>) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Process: {}", summary.process)?;
    writeln!(
        out,
        "Documents uploaded: {} (required: {})",
        summary.documents_uploaded, summary.required_documents
    )?;
    if summary.missing_documents.is_empty() {
        writeln!(out, "Missing documents: none")?;
    } else {
        writeln!(
            out,
            "Missing documents: {}",
            summary.missing_documents.join(", ")
        )?;
    }
    writeln!(
        out,
        "AI suggestions: {}",
        if summary.ai_used { "enabled" } else { "disabled" }
    )?;
    writeln!(out)?;

    if summary.issues_found.is_empty() {
        writeln!(out, "No issues found.")?;
    } else {
        writeln!(out, "Issues ({}):", summary.issues_found.len())?;
        for finding in &summary.issues_found {
            writeln!(
                out,
                "  - [{severity:?}] {document} :: {issue}",
                severity = finding.severity,
                document = finding.document,
                issue = finding.issue,
            )?;
            if !finding.suggestion.is_empty() {
                writeln!(out, "    Suggestion: {}", finding.suggestion)?;
            }
            if let Some(ai) = finding.suggestion_ai.as_deref().filter(|s| !s.is_empty()) {
                match finding.citation_label.as_deref().filter(|s| !s.is_empty()) {
                    Some(label) => writeln!(out, "    AI: {ai} (Source: {label})")?,
                    None => writeln!(out, "    AI: {ai}")?,
                }
            }
        }
    }

    if !summary.reviewed_files.is_empty() {
        writeln!(out, "\nReviewed files:")?;
        for file in summary.reviewed_files {
            writeln!(out, "  - {file}")?;
        }
    }
    if !summary.skipped_files.is_empty() {
        writeln!(out, "\nSkipped files:")?;
        for skipped in summary.skipped_files {
            writeln!(out, "  - {}: {}", skipped.file, skipped.reason)?;
        }
    }
    Ok(out)
}

/// Write each document's annotated text as `<stem>_reviewed.txt` under `out_dir`.
pub fn write_reviewed_copies(batch: &BatchReview, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let mut written = Vec::with_capacity(batch.documents.len());
    for review in &batch.documents {
        let stem = Path::new(&review.file)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let target = out_dir.join(format!("{stem}_reviewed.txt"));
        fs::write(&target, &review.reviewed_text)
            .with_context(|| format!("failed to write {}", target.display()))?;
        written.push(target);
    }
    Ok(written)
}

/// Write the JSON summary as `analysis_summary_<unix-seconds>.json` under `out_dir`.
pub fn write_json_report(
    summary: &BatchSummary<'_>,
    out_dir: &Path,
    generated: SystemTime,
) -> Result<PathBuf> {
    let secs = generated
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let target = out_dir.join(format!("analysis_summary_{secs}.json"));
    let body = render_summary(summary, OutputFormat::Json)?;
    fs::write(&target, body).with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}
