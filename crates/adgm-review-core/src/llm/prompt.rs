use std::fmt::Write;

use super::references::ReferenceSnippet;
use crate::rules::Finding;

const MAX_DOCUMENT_CHARS: usize = 4000;
pub(crate) const MAX_QUERY_CHARS: usize = 500;

/// Longest prefix of `input` with at most `max_chars` characters.
pub(crate) fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Retrieval query for a document: its issue texts, or its opening text when there are none.
pub fn retrieval_query(document_text: &str, findings: &[Finding]) -> String {
    let issues = findings
        .iter()
        .map(|finding| finding.issue.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let query = truncate_chars(&issues, MAX_QUERY_CHARS);
    if query.is_empty() {
        truncate_chars(document_text, MAX_QUERY_CHARS).to_string()
    } else {
        query.to_string()
    }
}

/// Prompt asking for a rationale, a compliant rewrite, and a citation per issue.
pub fn build_issue_prompt(
    document_text: &str,
    findings: &[Finding],
    references: &[&ReferenceSnippet],
) -> String {
    let mut refs_block = String::new();
    for snippet in references {
        let _ = writeln!(refs_block, "- {}: {}", snippet.label, snippet.text);
    }
    let mut issues_block = String::new();
    for finding in findings {
        let _ = writeln!(
            issues_block,
            "- Document: {}; Issue: {} (Severity: {:?})",
            finding.document, finding.issue, finding.severity
        );
    }
    let or_none = |block: &str| {
        let block = block.trim_end();
        if block.is_empty() {
            "None".to_string()
        } else {
            block.to_string()
        }
    };

    format!(
        "You are a legal assistant focused on ADGM compliance. Based on the user's document text and \
the retrieved ADGM reference snippets, do the following for each issue:\n\
1) Provide a brief rationale explaining the problem in context of ADGM.\n\
2) Suggest a short, compliant clause or wording to fix the problem (concise).\n\
3) Cite one of the retrieved snippet labels as a pointer (not a URL).\n\n\
Retrieved ADGM references:\n{refs}\n\n\
Issues:\n{issues}\n\n\
Document text (truncated if long):\n{text}\n\n\
Return a JSON list; each item with keys: issue, rationale, suggestion, citation_label.",
        refs = or_none(&refs_block),
        issues = or_none(&issues_block),
        text = truncate_chars(document_text, MAX_DOCUMENT_CHARS),
    )
}
