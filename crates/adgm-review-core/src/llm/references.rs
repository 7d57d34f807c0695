use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LABEL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(.+?)\]\s*$").expect("label regex"));
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").expect("word regex"));

/// Labelled excerpt of ADGM guidance used to ground suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSnippet {
    pub label: String,
    pub text: String,
}

/// Parse `[Label]` blocks; text lines are joined with spaces, blank lines end a block.
pub fn parse_references(raw: &str) -> Vec<ReferenceSnippet> {
    let mut refs = Vec::new();
    let mut label: Option<String> = None;
    let mut buf: Vec<&str> = Vec::new();

    let mut flush = |label: &mut Option<String>, buf: &mut Vec<&str>| {
        if let Some(done) = label.take() {
            if !buf.is_empty() {
                refs.push(ReferenceSnippet {
                    label: done,
                    text: buf.join(" ").trim().to_string(),
                });
            }
        }
        buf.clear();
    };

    for line in raw.lines() {
        if line.trim().is_empty() {
            flush(&mut label, &mut buf);
            continue;
        }
        if let Some(caps) = LABEL_LINE.captures(line) {
            flush(&mut label, &mut buf);
            label = Some(caps[1].trim().to_string());
        } else {
            buf.push(line.trim());
        }
    }
    flush(&mut label, &mut buf);
    refs
}

/// Load references from disk. A missing file means no references.
pub fn load_references(path: &Path) -> Result<Vec<ReferenceSnippet>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read reference file at {}", path.display()))?;
    Ok(parse_references(&raw))
}

fn words(text: &str) -> HashSet<&str> {
    WORD.find_iter(text).map(|m| m.as_str()).collect()
}

/// Number of distinct lowercase words shared by query and text.
pub fn overlap_score(query: &str, text: &str) -> usize {
    let query = query.to_lowercase();
    let text = text.to_lowercase();
    let query_words = words(&query);
    if query_words.is_empty() {
        return 0;
    }
    words(&text).intersection(&query_words).count()
}

/// Up to `k` references with positive overlap, best first; ties keep file order.
pub fn retrieve_top_k<'a>(
    query: &str,
    refs: &'a [ReferenceSnippet],
    k: usize,
) -> Vec<&'a ReferenceSnippet> {
    let mut scored: Vec<_> = refs
        .iter()
        .map(|snippet| (snippet, overlap_score(query, &snippet.text)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(k)
        .filter(|(_, score)| *score > 0)
        .map(|(snippet, _)| snippet)
        .collect()
}
