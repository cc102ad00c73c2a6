//! Structured response validation.
//!
//! A pure function from raw model text to either a typed
//! [`StructuredOutput`] or a classified [`ValidationDefect`]. No retry
//! logic lives here; the orchestrator decides what a defect is worth.
//! Tree-validity of a proposed folder reference is deliberately out of
//! scope: the validator has no tree context and stays schema-only.

pub mod json_extract;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{
    FolderDecision, StructuredOutput, Summary, TaskKind, MAX_KEYWORDS, MAX_SUMMARY_CHARS,
    MAX_TITLE_CHARS,
};

/// Schema-level defects in a model response, in rejection order
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationDefect {
    /// The response is not parseable JSON at all (prose, truncation)
    #[error("Response is not valid JSON")]
    MalformedSyntax,

    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field is present but has the wrong type or an out-of-range value
    #[error("Invalid value for field: {0}")]
    InvalidValue(String),
}

/// Validate raw model output against the schema for `kind`.
pub fn validate(raw: &str, kind: TaskKind) -> Result<StructuredOutput, ValidationDefect> {
    match kind {
        TaskKind::Summarize => validate_summary(raw).map(StructuredOutput::Summary),
        TaskKind::ClassifyFolder => {
            validate_folder_decision(raw).map(StructuredOutput::FolderDecision)
        }
    }
}

/// Typed entry point for the Summarize schema
pub fn validate_summary(raw: &str) -> Result<Summary, ValidationDefect> {
    let value = json_extract::extract_json_object(raw).ok_or(ValidationDefect::MalformedSyntax)?;
    summary_from_value(&value)
}

/// Typed entry point for the ClassifyFolder schema
pub fn validate_folder_decision(raw: &str) -> Result<FolderDecision, ValidationDefect> {
    let value = json_extract::extract_json_object(raw).ok_or(ValidationDefect::MalformedSyntax)?;
    decision_from_value(&value)
}

fn summary_from_value(value: &Value) -> Result<Summary, ValidationDefect> {
    let title = require_string(value, "title")?;
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(ValidationDefect::InvalidValue("title".to_string()));
    }

    let summary = require_string(value, "summary")?;
    if summary.is_empty() || summary.chars().count() > MAX_SUMMARY_CHARS {
        return Err(ValidationDefect::InvalidValue("summary".to_string()));
    }

    let keywords = match value.get("keywords") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            if items.len() > MAX_KEYWORDS {
                return Err(ValidationDefect::InvalidValue("keywords".to_string()));
            }
            let mut keywords = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) if !s.trim().is_empty() => keywords.push(s.trim().to_string()),
                    _ => return Err(ValidationDefect::InvalidValue("keywords".to_string())),
                }
            }
            keywords
        }
        Some(_) => return Err(ValidationDefect::InvalidValue("keywords".to_string())),
    };

    Ok(Summary {
        title,
        summary,
        keywords,
    })
}

fn decision_from_value(value: &Value) -> Result<FolderDecision, ValidationDefect> {
    let recommended_folder = require_string_aliased(
        value,
        "recommendedFolder",
        &["recommended_folder"],
    )?;
    // Deeper validity against the actual tree is the resolver's job;
    // here the reference only has to exist and be non-empty.
    if recommended_folder.is_empty() {
        return Err(ValidationDefect::InvalidValue("recommendedFolder".to_string()));
    }

    let reasoning = require_string(value, "reasoning")?;

    let new_folder_name = match field_aliased(value, "newFolderName", &["new_folder_name"]) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::String(_)) => None,
        Some(_) => return Err(ValidationDefect::InvalidValue("newFolderName".to_string())),
    };

    let confidence = match value.get("confidence") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let score = v
                .as_f64()
                .ok_or_else(|| ValidationDefect::InvalidValue("confidence".to_string()))?;
            if !(0.0..=1.0).contains(&score) {
                return Err(ValidationDefect::InvalidValue("confidence".to_string()));
            }
            Some(score as f32)
        }
    };

    Ok(FolderDecision {
        recommended_folder,
        reasoning,
        new_folder_name,
        confidence,
    })
}

fn field_aliased<'a>(value: &'a Value, name: &str, aliases: &[&str]) -> Option<&'a Value> {
    value
        .get(name)
        .or_else(|| aliases.iter().find_map(|alias| value.get(alias)))
}

fn require_string(value: &Value, name: &str) -> Result<String, ValidationDefect> {
    require_string_aliased(value, name, &[])
}

fn require_string_aliased(
    value: &Value,
    name: &str,
    aliases: &[&str],
) -> Result<String, ValidationDefect> {
    let field = field_aliased(value, name, aliases)
        .ok_or_else(|| ValidationDefect::MissingField(name.to_string()))?;
    field
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ValidationDefect::InvalidValue(name.to_string()))
}
