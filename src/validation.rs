//! Precondition checks shared by the contact and professional services.
//!
//! Every check runs before any storage lookup or write and reports the first
//! violation as [`AppError::InvalidInput`].

use crate::errors::AppError;

/// The kind of write a request is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    Create,
    Update,
}

/// Enforces the id rule: creates must not carry an id, updates must.
///
/// Returns the id for updates so callers do not unwrap it again.
pub fn check_id(entity: &str, id: Option<i64>, intent: WriteIntent) -> Result<Option<i64>, AppError> {
    match (intent, id) {
        (WriteIntent::Create, Some(_)) => Err(AppError::InvalidInput(format!(
            "{} cannot be created because it already has an id",
            entity
        ))),
        (WriteIntent::Update, None) => Err(AppError::InvalidInput(format!(
            "{} cannot be updated without an id",
            entity
        ))),
        (_, id) => Ok(id),
    }
}

/// Requires an optional field to be present.
pub fn require<T>(value: Option<T>, message: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::InvalidInput(message.to_string()))
}

/// Requires a text field to be present and not blank.
pub fn require_text(value: Option<&str>, message: &str) -> Result<String, AppError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(AppError::InvalidInput(message.to_string())),
    }
}
