//! Structured output contracts for the two inference tasks.
//!
//! Everything the model returns is parsed into one of the closed variants
//! of [`StructuredOutput`]; no untyped JSON travels through the pipeline.
//! Field bounds live here as named constants so the validator and the
//! prompt builders agree on them.

use serde::{Deserialize, Serialize};

/// Maximum length of a summary title, in characters
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum length of a summary body, in characters
pub const MAX_SUMMARY_CHARS: usize = 2000;

/// Maximum number of keywords attached to a summary
pub const MAX_KEYWORDS: usize = 20;

/// The two inference tasks this core implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Produce a structured title + summary + keywords for a page
    Summarize,
    /// Recommend a folder from the user's hierarchy for a bookmark
    ClassifyFolder,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::ClassifyFolder => "classify_folder",
        }
    }
}

/// Structured page summary returned by the Summarize task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Page title, non-empty, at most [`MAX_TITLE_CHARS`] characters
    pub title: String,

    /// Content summary, non-empty, at most [`MAX_SUMMARY_CHARS`] characters
    pub summary: String,

    /// Keywords/tags for the page, at most [`MAX_KEYWORDS`] entries
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Folder recommendation returned by the ClassifyFolder task
///
/// `recommended_folder` is whatever the model emitted: a full path, a bare
/// display name, or a node identifier. Mapping it onto a real node of the
/// user's tree is the resolver's job, not the schema's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDecision {
    /// Model-proposed folder reference (path-like or identifier-like)
    #[serde(alias = "recommended_folder")]
    pub recommended_folder: String,

    /// Why the model chose this folder
    pub reasoning: String,

    /// Suggested name for a new child folder, if the model was asked to
    /// propose one and judged no existing folder a good fit
    #[serde(default, alias = "new_folder_name")]
    pub new_folder_name: Option<String>,

    /// Self-reported confidence in [0, 1]
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Validated model output, discriminated by task kind
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput {
    Summary(Summary),
    FolderDecision(FolderDecision),
}

impl StructuredOutput {
    /// Which task this output belongs to
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Summary(_) => TaskKind::Summarize,
            Self::FolderDecision(_) => TaskKind::ClassifyFolder,
        }
    }

    pub fn as_summary(&self) -> Option<&Summary> {
        match self {
            Self::Summary(s) => Some(s),
            Self::FolderDecision(_) => None,
        }
    }

    pub fn as_folder_decision(&self) -> Option<&FolderDecision> {
        match self {
            Self::FolderDecision(d) => Some(d),
            Self::Summary(_) => None,
        }
    }
}
