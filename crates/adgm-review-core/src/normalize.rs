//! Canonical issue keys used to compare findings from different producers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between the words of a collapse phrase.
const SEP: &str = "[^a-z0-9]+";

static PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:missing required clause|red flag)\s*:\s*").expect("prefix regex")
});

fn phrase(words: &[&str]) -> String {
    words.join(SEP)
}

/// Anchor an alternation on whole words.
fn whole_words(alternatives: &[String]) -> String {
    format!(r"\b(?:{})\b", alternatives.join("|"))
}

/// Phrase collapses in priority order: earlier entries win over later ones.
/// Patterns run on text already reduced to `[a-z0-9 ]`, so `\b` is an ASCII
/// word boundary there.
static COLLAPSES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let table = [
        (
            whole_words(&[phrase(&["appears", "to", "be", "missing", "signatory", "section"])]),
            "signatories",
        ),
        (
            whole_words(&[format!("abu[^a-z0-9]*dhabi{SEP}global{SEP}market")]),
            "adgm",
        ),
        (
            whole_words(&[format!("u[^a-z0-9]*a[^a-z0-9]*e{SEP}federal{SEP}court")]),
            "uae federal court",
        ),
        (
            whole_words(&[
                r"ambiguous\b.*\blanguage".to_string(),
                "non[^a-z0-9]*binding".to_string(),
                phrase(&["may", "consider"]),
                phrase(&["where", "possible"]),
                phrase(&["as", "appropriate"]),
                phrase(&["at", "its", "discretion"]),
                "discretionary".to_string(),
            ]),
            "ambiguity",
        ),
        (
            whole_words(&["signator(?:ies|y)".to_string(), "signatures?".to_string()]),
            "signatories",
        ),
    ];
    table
        .into_iter()
        .map(|(pattern, token)| (Regex::new(&pattern).expect("collapse regex"), token))
        .collect()
});

/// Map everything outside `[a-z0-9]` to a space and squeeze runs of spaces.
fn clean(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce a free-text issue description to a short comparable key.
///
/// The result only contains `[a-z0-9]` words separated by single spaces, and
/// `normalize_issue_key(normalize_issue_key(x)) == normalize_issue_key(x)`.
/// Collapses only fire on whole words: "has appropriate" is not a hedge.
pub fn normalize_issue_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut key = clean(&PREFIX.replace(&lowered, ""));
    for (pattern, token) in COLLAPSES.iter() {
        if pattern.is_match(&key) {
            key = pattern.replace_all(&key, *token).into_owned();
        }
    }
    clean(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_yields_empty_key() {
        assert_eq!(normalize_issue_key(""), "");
        assert_eq!(normalize_issue_key("  :;  "), "");
    }

    #[test]
    fn strips_known_prefixes() {
        assert_eq!(
            normalize_issue_key("Missing required clause: Registered Address"),
            "registered address"
        );
        assert_eq!(normalize_issue_key("Red flag: Something odd"), "something odd");
    }

    #[test]
    fn collapses_jurisdiction_phrases() {
        assert_eq!(
            normalize_issue_key("Governed by the Abu Dhabi Global Market courts"),
            "governed by the adgm courts"
        );
        assert_eq!(
            normalize_issue_key("References U.A.E. Federal Court instead of ADGM"),
            "references uae federal court instead of adgm"
        );
    }

    #[test]
    fn collapses_signature_phrases() {
        assert_eq!(
            normalize_issue_key("Appears to be missing signatory section"),
            "signatories"
        );
        assert_eq!(
            normalize_issue_key("Missing required clause: Signatories"),
            "signatories"
        );
        assert_eq!(normalize_issue_key("No signature block"), "no signatories block");
    }

    #[test]
    fn collapses_ambiguity_phrases() {
        assert_eq!(normalize_issue_key("Ambiguous or non-binding language"), "ambiguity");
        assert_eq!(
            normalize_issue_key("Company may consider where possible"),
            "company ambiguity ambiguity"
        );
        assert_eq!(normalize_issue_key("Non-binding wording"), "ambiguity wording");
    }

    #[test]
    fn specific_rule_beats_generic_signature_rule() {
        // The generic rule alone would leave "appears to be missing signatories section".
        assert_eq!(
            normalize_issue_key("APPEARS TO BE MISSING SIGNATORY SECTION!"),
            "signatories"
        );
    }

    #[test]
    fn collapses_need_whole_words() {
        assert_eq!(
            normalize_issue_key("The Company has appropriate share capital"),
            "the company has appropriate share capital"
        );
        assert_eq!(
            normalize_issue_key("Share capital elsewhere possible"),
            "share capital elsewhere possible"
        );
        assert_eq!(
            normalize_issue_key("Dismay consider share capital"),
            "dismay consider share capital"
        );
        assert_eq!(normalize_issue_key("nonbindingness"), "nonbindingness");
        assert_eq!(normalize_issue_key("Unambiguous language"), "unambiguous language");
        assert_eq!(normalize_issue_key("Cosignatory"), "cosignatory");
        assert_eq!(normalize_issue_key("as appropriate"), "ambiguity");
    }

    #[test]
    fn non_ascii_neighbours_do_not_block_collapses() {
        assert_eq!(normalize_issue_key("émay consider"), "ambiguity");
        assert_eq!(normalize_issue_key("_where possible_"), "ambiguity");
    }

    #[test]
    fn punctuation_separated_phrases_still_collapse() {
        assert_eq!(normalize_issue_key("abu-dhabi global market"), "adgm");
        assert_eq!(normalize_issue_key("where\npossible"), "ambiguity");
    }

    fn issue_like() -> impl Strategy<Value = String> {
        let phrase = prop::sample::select(vec![
            "Missing required clause: ",
            "Red flag: ",
            "Abu Dhabi Global Market",
            "abu-dhabi  global\nmarket",
            "U.A.E Federal Court",
            "ambiguous",
            "language",
            "non-binding",
            "may consider",
            "where possible",
            "at its discretion",
            "signatory",
            "Signatures",
            "appears to be missing signatory section",
            "sign",
            ":",
            " ",
        ]);
        let noise = proptest::string::string_regex("[A-Za-z0-9 ,.:;\\-\\n'é]{0,12}").unwrap();
        proptest::collection::vec(prop_oneof![phrase.prop_map(str::to_string), noise], 0..8)
            .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(text in issue_like()) {
            let once = normalize_issue_key(&text);
            prop_assert_eq!(normalize_issue_key(&once), once.clone());
        }

        #[test]
        fn normalization_is_idempotent_on_arbitrary_text(text in "\\PC{0,64}") {
            let once = normalize_issue_key(&text);
            prop_assert_eq!(normalize_issue_key(&once), once.clone());
        }

        #[test]
        fn keys_only_contain_ascii_words(text in issue_like()) {
            let key = normalize_issue_key(&text);
            prop_assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
            prop_assert!(!key.starts_with(' ') && !key.ends_with(' ') && !key.contains("  "));
        }
    }
}
