//! Error types for fsmtable.

use thiserror::Error;

/// Main error type for fsmtable operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed template or index
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Template execution aborted
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// No index row matched the device/command attributes
    #[error("{0}")]
    NotFound(#[from] TemplateNotFound),

    /// Table manipulation errors
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Parse task for a device panicked or was cancelled
    #[error("Parse task for '{0}' did not complete")]
    Aborted(String),
}

impl Error {
    /// Check if this error means "no template applies".
    ///
    /// Callers are expected to fall back to the raw device output.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Compile-time error in a template or index document.
#[derive(Error, Debug)]
#[error("{source_name}:{line}: {kind}")]
pub struct TemplateError {
    /// Template (or index) name the error was raised for.
    pub source_name: String,

    /// 1-based line number, 0 when the error concerns the whole document.
    pub line: usize,

    /// What went wrong.
    #[source]
    pub kind: TemplateErrorKind,
}

impl TemplateError {
    pub(crate) fn new(source_name: impl Into<String>, line: usize, kind: TemplateErrorKind) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            kind,
        }
    }
}

/// The specific template/index defect.
#[derive(Error, Debug)]
pub enum TemplateErrorKind {
    /// Malformed `Value` declaration
    #[error("Invalid value declaration: {message}")]
    InvalidValue { message: String },

    /// Two values share a name
    #[error("Duplicate value name '{name}'")]
    DuplicateValue { name: String },

    /// Rule references a value that was never declared
    #[error("Undeclared value '{name}' referenced in rule")]
    UndeclaredValue { name: String },

    /// Malformed rule line or action
    #[error("Invalid rule: {message}")]
    InvalidRule { message: String },

    /// Malformed or duplicated state header
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Rule transitions to a state that does not exist
    #[error("State '{target}' not found, referenced in state '{state}'")]
    UnknownState { target: String, state: String },

    /// Template declares no `Start` state
    #[error("Missing state 'Start'")]
    MissingStart,

    /// Regex failed to compile
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Malformed index document
    #[error("Invalid index: {message}")]
    InvalidIndex { message: String },
}

/// Run-time abort raised by an `Error` rule action.
#[derive(Error, Debug, Clone)]
#[error("{template}: state '{state}' raised error{}, input line {line_number}: '{line}'", quoted(.message))]
pub struct ParseError {
    /// Name of the template being executed.
    pub template: String,

    /// State whose rule raised the error.
    pub state: String,

    /// Optional message attached to the `Error` action.
    pub message: Option<String>,

    /// 1-based input line number (0 for the synthetic EOF line).
    pub line_number: usize,

    /// The input line that triggered the error.
    pub line: String,
}

fn quoted(message: &Option<String>) -> String {
    message
        .as_ref()
        .map(|m| format!(" '{m}'"))
        .unwrap_or_default()
}

/// No index row matched.
#[derive(Error, Debug, Clone)]
#[error("No template found for attributes: {attributes}")]
pub struct TemplateNotFound {
    /// Human readable rendering of the attributes that were queried.
    pub attributes: String,
}

/// Table manipulation errors.
#[derive(Error, Debug)]
pub enum TableError {
    /// Key column is absent from the table being extended
    #[error("Unknown key column '{0}'")]
    UnknownKey(String),

    /// Table from a device already has a column named like the merge column
    #[error("Table from '{device}' already has a '{column}' column")]
    DuplicateColumn { device: String, column: String },
}

/// Result type alias using fsmtable's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = TemplateError::new(
            "cisco_version",
            4,
            TemplateErrorKind::UndeclaredValue {
                name: "Uptime".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "cisco_version:4: Undeclared value 'Uptime' referenced in rule"
        );
    }

    #[test]
    fn test_parse_error_display_with_message() {
        let err = ParseError {
            template: "t".to_string(),
            state: "Start".to_string(),
            message: Some("unexpected banner".to_string()),
            line_number: 2,
            line: "% Invalid input".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("'unexpected banner'"));
        assert!(text.contains("input line 2"));
    }

    #[test]
    fn test_not_found_is_recoverable() {
        let err: Error = TemplateNotFound {
            attributes: "Command='ping'".to_string(),
        }
        .into();
        assert!(err.is_not_found());
    }
}
