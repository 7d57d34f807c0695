use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

/// Closed set of ADGM incorporation document types recognised by the rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "Articles of Association")]
    ArticlesOfAssociation,
    #[serde(rename = "Memorandum of Association")]
    MemorandumOfAssociation,
    #[serde(rename = "Board Resolution")]
    BoardResolution,
    #[serde(rename = "Shareholder Resolution")]
    ShareholderResolution,
    #[serde(rename = "Register of Members and Directors")]
    RegisterOfMembersAndDirectors,
    #[serde(rename = "UBO Declaration Form")]
    UboDeclarationForm,
    #[serde(rename = "Incorporation Application Form")]
    IncorporationApplicationForm,
    #[serde(rename = "Change of Registered Address Notice")]
    ChangeOfRegisteredAddressNotice,
    Unknown,
}

impl DocumentType {
    pub const ALL: [DocumentType; 9] = [
        Self::ArticlesOfAssociation,
        Self::MemorandumOfAssociation,
        Self::BoardResolution,
        Self::ShareholderResolution,
        Self::RegisterOfMembersAndDirectors,
        Self::UboDeclarationForm,
        Self::IncorporationApplicationForm,
        Self::ChangeOfRegisteredAddressNotice,
        Self::Unknown,
    ];

    /// Label used in rule sets, reports, and prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::ArticlesOfAssociation => "Articles of Association",
            Self::MemorandumOfAssociation => "Memorandum of Association",
            Self::BoardResolution => "Board Resolution",
            Self::ShareholderResolution => "Shareholder Resolution",
            Self::RegisterOfMembersAndDirectors => "Register of Members and Directors",
            Self::UboDeclarationForm => "UBO Declaration Form",
            Self::IncorporationApplicationForm => "Incorporation Application Form",
            Self::ChangeOfRegisteredAddressNotice => "Change of Registered Address Notice",
            Self::Unknown => "Unknown",
        }
    }

    /// Case-insensitive label lookup; anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(wanted))
            .unwrap_or(Self::Unknown)
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Types that conventionally carry a signatory block.
    pub fn requires_signature(self) -> bool {
        matches!(
            self,
            Self::ArticlesOfAssociation
                | Self::MemorandumOfAssociation
                | Self::BoardResolution
                | Self::ShareholderResolution
                | Self::UboDeclarationForm
                | Self::IncorporationApplicationForm
        )
    }

    /// Heuristic classification from a file name.
    pub fn from_file_name(path: impl AsRef<Path>) -> Self {
        let name = path
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.contains("articles") {
            Self::ArticlesOfAssociation
        } else if name.contains("memorandum") || name.contains("mou") {
            Self::MemorandumOfAssociation
        } else if name.contains("register") {
            Self::RegisterOfMembersAndDirectors
        } else if name.contains("resolution") {
            Self::BoardResolution
        } else if name.contains("ubo") {
            Self::UboDeclarationForm
        } else {
            Self::Unknown
        }
    }

    /// Fallback classification from document content.
    pub fn from_content(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |needle: &str| text.contains(needle);
        if has("articles of association") {
            Self::ArticlesOfAssociation
        } else if has("memorandum of association")
            || has("memorandum of understanding")
            || has("moa")
            || has("mou")
        {
            Self::MemorandumOfAssociation
        } else if has("register of members") || has("register of directors") {
            Self::RegisterOfMembersAndDirectors
        } else if has("board resolution") {
            Self::BoardResolution
        } else if has("ultimate beneficial owner") || has("ubo") {
            Self::UboDeclarationForm
        } else {
            Self::Unknown
        }
    }

    /// Filename heuristic first; content is only consulted when the name is inconclusive.
    pub fn infer(path: impl AsRef<Path>, text: &str) -> Self {
        match Self::from_file_name(path) {
            Self::Unknown => Self::from_content(text),
            detected => detected,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Extracted document: non-empty paragraphs in order plus their newline join.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    paragraphs: Vec<String>,
    full_text: String,
}

impl Document {
    /// Build from raw paragraphs, trimming each and dropping blank ones.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paragraphs: Vec<String> = paragraphs
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let full_text = paragraphs.join("\n");
        Self {
            paragraphs,
            full_text,
        }
    }

    /// Plain-text extraction: every non-blank line is a paragraph.
    pub fn from_text(text: &str) -> Self {
        Self::from_paragraphs(text.lines())
    }

    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }
}

pub const INCORPORATION_PROCESS: &str = "Company Incorporation";
pub const UNKNOWN_PROCESS: &str = "Unknown";

/// Name the legal process a batch belongs to from its detected types.
pub fn detect_process<I>(doc_types: I) -> &'static str
where
    I: IntoIterator<Item = DocumentType>,
{
    if doc_types.into_iter().any(DocumentType::is_known) {
        INCORPORATION_PROCESS
    } else {
        UNKNOWN_PROCESS
    }
}
