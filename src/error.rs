//! Error types for content loading and validation.
//!
//! Evaluation and defense resolution never fail: malformed or unknown
//! content is recorded as a failure entry instead. Errors only surface
//! while authored content is loaded ([`ContentError`]) or validated
//! as a whole ([`RulesError::Cycle`]).

use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[String]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.join(" -> ")
}

/// A single authored prerequisite node could not be parsed.
///
/// # Examples
///
/// ```rust
/// use swse_rules::ContentError;
///
/// let err = ContentError::InvalidNumber {
///     kind: "CHARACTER LEVEL".into(),
///     value: "seven".into(),
/// };
/// assert_eq!(err.to_string(), "CHARACTER LEVEL requirement is not a number: seven");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// A numeric requirement (level, bonus, count, age bound) did not parse.
    #[error("{kind} requirement is not a number: {value}")]
    InvalidNumber { kind: String, value: String },

    /// An ATTRIBUTE requirement was not of the form `<key> <threshold>`.
    #[error("attribute requirement must be `<key> <threshold>`: {0}")]
    InvalidAttributeRequirement(String),

    /// An AND/OR node was authored without children.
    #[error("{0} prerequisite has no children")]
    MissingChildren(String),

    /// A leaf node was authored without a requirement.
    #[error("{0} prerequisite has no requirement")]
    MissingRequirement(String),
}

/// Errors raised while loading or validating rules content.
#[derive(Debug, Error)]
pub enum RulesError {
    /// A prerequisite node was malformed.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// Authored prerequisites reference each other in a loop.
    ///
    /// If feat A requires feat B and feat B requires feat A, the path is
    /// `[A, B, A]`.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<String> },

    /// The content was not valid JSON for the expected shape.
    #[error("invalid content JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContentError::MissingChildren("OR".into());
        assert!(err.to_string().contains("OR"));
    }

    #[test]
    fn test_cycle_error_display() {
        let err = RulesError::Cycle {
            path: vec!["Force Training".into(), "Force Sensitivity".into(), "Force Training".into()],
        };
        let display = err.to_string();
        assert!(display.contains("Cycle detected"));
        assert!(display.contains("Force Sensitivity"));
        assert!(display.contains(" -> "));
    }

    #[test]
    fn test_empty_cycle_display() {
        let err = RulesError::Cycle { path: Vec::new() };
        assert!(err.to_string().contains("(empty cycle)"));
    }

    #[test]
    fn test_content_error_converts() {
        let err: RulesError = ContentError::MissingRequirement("FEAT".into()).into();
        assert_eq!(err.to_string(), "FEAT prerequisite has no requirement");
    }
}
