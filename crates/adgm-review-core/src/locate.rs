//! Maps findings onto paragraph indices for annotation.

/// Indices of every paragraph containing `snippet`, case-insensitively, in document order.
///
/// An empty snippet matches nothing.
pub fn locate<S: AsRef<str>>(snippet: &str, paragraphs: &[S]) -> Vec<usize> {
    if snippet.is_empty() {
        return Vec::new();
    }
    let needle = snippet.to_lowercase();
    let mut hits = Vec::new();
    for (idx, paragraph) in paragraphs.iter().enumerate() {
        if paragraph.as_ref().to_lowercase().contains(&needle) {
            hits.push(idx);
        }
    }
    hits
}

/// Paragraph used when a snippet cannot be located: the last one, or 0 for an empty document.
pub fn fallback_index(paragraph_count: usize) -> usize {
    paragraph_count.saturating_sub(1)
}

/// First paragraph containing `snippet`, falling back to [`fallback_index`].
pub fn target_index<S: AsRef<str>>(snippet: &str, paragraphs: &[S]) -> usize {
    locate(snippet, paragraphs)
        .first()
        .copied()
        .unwrap_or_else(|| fallback_index(paragraphs.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAGRAPHS: [&str; 4] = [
        "Articles of Association",
        "Jurisdiction: UAE Federal Court",
        "Disputes are heard by the uae federal court.",
        "Date: 9 August 2025",
    ];

    #[test]
    fn returns_every_match_in_order() {
        assert_eq!(locate("UAE FEDERAL COURT", &PARAGRAPHS), vec![1, 2]);
    }

    #[test]
    fn empty_snippet_matches_nothing() {
        assert!(locate("", &PARAGRAPHS).is_empty());
    }

    #[test]
    fn target_falls_back_to_last_paragraph() {
        assert_eq!(target_index("Signatories", &PARAGRAPHS), 3);
        assert_eq!(target_index("", &PARAGRAPHS), 3);
        assert_eq!(target_index("jurisdiction", &PARAGRAPHS), 1);
    }

    #[test]
    fn empty_document_targets_index_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(target_index("anything", &empty), 0);
    }
}
