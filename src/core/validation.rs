//! Request Validation
//!
//! Checks applied to request parameters before any datastore access.

use thiserror::Error;

/// Maximum comment length, counted in characters after trimming
pub const MAX_COMMENT_CHARS: usize = 5000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),

    #[error("Comment text cannot be empty")]
    EmptyText,

    #[error("Comment text exceeds maximum length of {max} characters")]
    TextTooLong { max: usize },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Unwrap a required string parameter; blank values count as missing
pub fn required(name: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(name)),
    }
}

/// Trim comment text and enforce the 1..=5000 character bound
pub fn comment_text(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(ValidationError::TextTooLong { max: MAX_COMMENT_CHARS });
    }
    Ok(trimmed.to_string())
}

/// Split a comma-separated id list, dropping blanks and duplicates
pub fn id_list(csv: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for id in csv.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}
