//! Error types for codepack

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using codepack's Error
pub type Result<T> = std::result::Result<T, Error>;

/// codepack error types
#[derive(Error, Debug)]
pub enum Error {
    /// Per-file parse failure. Non-fatal: the file is skipped and its
    /// hash is preserved so incremental runs do not loop on it.
    #[error("Parse error in {file_path} at {line}:{column}: {message}")]
    Parser {
        file_path: String,
        line: u32,
        column: u32,
        syntax_element: Option<String>,
        message: String,
    },

    #[error("Parser already registered: {name}")]
    DuplicateParser { name: String },

    #[error("No parser found for {lookup}")]
    ParserNotFound { lookup: String },

    #[error("Parser {name} is version {actual}, required {required}")]
    IncompatibleVersion {
        name: String,
        required: String,
        actual: String,
    },

    #[error("Parser {name} failed to initialize: {message}")]
    ParserInitialization { name: String, message: String },

    #[error("Parser factory error for {name}: {message}")]
    ParserFactory { name: String, message: String },

    #[error("File {operation} failed for {file_path}: {source}")]
    File {
        file_path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
    },

    #[error("Invalid {field}: {value}")]
    Validation { field: &'static str, value: String },

    #[error("Snapshot schema error in {config_path}: expected {expected}: {message}")]
    Config {
        config_path: PathBuf,
        expected: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Process exit code for the CLI: 1 usage error, 2 I/O error,
    /// 3 internal error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation { .. } => 1,
            Error::File { .. } | Error::Io(_) => 2,
            _ => 3,
        }
    }

    /// Short kind tag for the structured CLI error object
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parser { .. } => "parser",
            Error::DuplicateParser { .. } => "duplicate_parser",
            Error::ParserNotFound { .. } => "parser_not_found",
            Error::IncompatibleVersion { .. } => "incompatible_version",
            Error::ParserInitialization { .. } => "parser_initialization",
            Error::ParserFactory { .. } => "parser_factory",
            Error::File { .. } => "file",
            Error::Validation { .. } => "validation",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
        }
    }

    /// Structured error object surfaced by the CLI
    pub fn report(&self) -> serde_json::Value {
        let mut report = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            Error::Parser {
                file_path,
                line,
                column,
                ..
            } => {
                report["filePath"] = serde_json::json!(file_path);
                report["line"] = serde_json::json!(line);
                report["column"] = serde_json::json!(column);
            }
            Error::File {
                file_path, source, ..
            } => {
                report["filePath"] = serde_json::json!(file_path.display().to_string());
                report["cause"] = serde_json::json!(source.to_string());
            }
            Error::Config {
                config_path,
                message,
                ..
            } => {
                report["filePath"] = serde_json::json!(config_path.display().to_string());
                report["cause"] = serde_json::json!(message);
            }
            _ => {}
        }
        report
    }

    /// Whether a failed file operation is worth one retry
    /// (timeout, temporarily unavailable).
    pub fn is_transient(err: &std::io::Error) -> bool {
        matches!(
            err.kind(),
            std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::WouldBlock
                | std::io::ErrorKind::Interrupted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let usage = Error::Validation {
            field: "project_path",
            value: String::new(),
        };
        assert_eq!(usage.exit_code(), 1);

        let io = Error::File {
            file_path: "a.ts".into(),
            operation: "read",
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(io.exit_code(), 2);

        let internal = Error::DuplicateParser {
            name: "typescript".into(),
        };
        assert_eq!(internal.exit_code(), 3);
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::is_transient(&std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "slow"
        )));
        assert!(!Error::is_transient(&std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone"
        )));
    }
}
