//! Session language preference
//!
//! A client reports its preferred language; the value is stored in the
//! session under `_language` so later requests render in that language.

use crate::session::SessionData;
use serde_json::Value;
use thiserror::Error;

/// Body key carrying the requested language
pub const LANGUAGE_KEY: &str = "pref-lang";

/// Session key holding the active language
pub const LANGUAGE_SESSION_KEY: &str = "_language";

#[derive(Debug, Error, PartialEq)]
pub enum LanguageError {
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,
}

/// Language requested by a PATCH body, falling back to `default`
///
/// A missing or null `pref-lang` means "use the site default". Non-string
/// values are stored as their JSON text.
pub fn requested_language(body: &[u8], default: &str) -> Result<String, LanguageError> {
    let data: Value =
        serde_json::from_slice(body).map_err(|e| LanguageError::InvalidJson(e.to_string()))?;
    let object = data.as_object().ok_or(LanguageError::NotAnObject)?;

    Ok(match object.get(LANGUAGE_KEY) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(language)) => language.clone(),
        Some(other) => other.to_string(),
    })
}

/// Store `language` in the session unless it is already the active one
///
/// Returns true when the session changed.
pub fn apply_language(session: &mut SessionData, language: &str) -> bool {
    if session.get(LANGUAGE_SESSION_KEY).map(String::as_str) == Some(language) {
        return false;
    }
    session.insert(LANGUAGE_SESSION_KEY.to_string(), language.to_string());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_language() {
        assert_eq!(requested_language(br#"{"pref-lang": "eo"}"#, "en").unwrap(), "eo");
        assert_eq!(requested_language(b"{}", "en").unwrap(), "en");
        assert_eq!(requested_language(br#"{"pref-lang": null}"#, "en").unwrap(), "en");
        assert_eq!(requested_language(br#"{"pref-lang": 5}"#, "en").unwrap(), "5");
    }

    #[test]
    fn test_requested_language_rejects_bad_bodies() {
        assert!(matches!(
            requested_language(b"not json", "en"),
            Err(LanguageError::InvalidJson(_))
        ));
        assert!(matches!(
            requested_language(b"", "en"),
            Err(LanguageError::InvalidJson(_))
        ));
        assert_eq!(requested_language(b"[]", "en"), Err(LanguageError::NotAnObject));
    }

    #[test]
    fn test_apply_language_only_writes_changes() {
        let mut session = SessionData::new();
        assert!(apply_language(&mut session, "eo"));
        assert!(!apply_language(&mut session, "eo"));
        assert!(apply_language(&mut session, "fr"));
        assert_eq!(session.get(LANGUAGE_SESSION_KEY).map(String::as_str), Some("fr"));
    }
}
