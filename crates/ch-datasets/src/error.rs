//! Error types for dataset transfers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Configuration error (invalid YAML, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// No manifest matched the requested dataset name
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// More than one repository holds a dataset with this name
    #[error("Dataset name is ambiguous, must specify repo path: {name} (found in: {})", .repos.join(", "))]
    DatasetAmbiguous { name: String, repos: Vec<String> },

    /// Dump selected no tables
    #[error("No tables found in database {database}{}", .filter.as_ref().map(|f| format!(" matching '{}'", f)).unwrap_or_default())]
    NoTablesFound {
        database: String,
        filter: Option<String>,
    },

    /// A file under data/<table>/ is neither plain nor gzip-compressed CSV
    #[error("Unsupported payload file (expected .csv or .csv.gz): {}", .0.display())]
    UnsupportedPayloadFile(PathBuf),

    /// Dump destination exists and overwrite was not requested
    #[error("Directory already exists (use overwrite to replace): {}", .0.display())]
    DirectoryExists(PathBuf),

    /// External command exited non-zero
    #[error("Process failed with exit code {code}: {command}")]
    OperationFailed { command: String, code: i32 },

    /// External command could not be started
    #[error("Process could not be started ({reason}): {command}")]
    SpawnFailed { command: String, reason: String },

    /// Identifier rejected before being placed in generated SQL
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Database client invocation failed
    #[error("Database client error: {message}\n  Statement: {statement}")]
    Client { statement: String, message: String },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid table selector
    #[error("Invalid table filter: {0}")]
    Regex(#[from] regex::Error),
}

impl DatasetError {
    /// Create a Client error for a statement.
    pub fn client(statement: impl Into<String>, message: impl Into<String>) -> Self {
        DatasetError::Client {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Whether this error is only ever recorded by the process pool rather
    /// than aborting a transfer.
    pub fn is_recorded_only(&self) -> bool {
        matches!(
            self,
            DatasetError::OperationFailed { .. } | DatasetError::SpawnFailed { .. }
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            DatasetError::Config(_)
            | DatasetError::Yaml(_)
            | DatasetError::Regex(_)
            | DatasetError::InvalidIdentifier(_)
            | DatasetError::OperationFailed { .. }
            | DatasetError::SpawnFailed { .. } => 1,
            DatasetError::DatasetNotFound(_)
            | DatasetError::DatasetAmbiguous { .. }
            | DatasetError::NoTablesFound { .. } => 2,
            DatasetError::UnsupportedPayloadFile(_) => 3,
            DatasetError::DirectoryExists(_) => 4,
            DatasetError::Client { .. } => 5,
            DatasetError::Json(_) => 1,
            DatasetError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_lists_repos() {
        let err = DatasetError::DatasetAmbiguous {
            name: "iris".to_string(),
            repos: vec!["built-ins".to_string(), "local".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("iris"));
        assert!(msg.contains("built-ins, local"));
    }

    #[test]
    fn test_no_tables_message_includes_filter() {
        let err = DatasetError::NoTablesFound {
            database: "sales".to_string(),
            filter: Some("^fact_".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "No tables found in database sales matching '^fact_'"
        );

        let err = DatasetError::NoTablesFound {
            database: "sales".to_string(),
            filter: None,
        };
        assert_eq!(err.to_string(), "No tables found in database sales");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DatasetError::DatasetNotFound("x".into()).exit_code(), 2);
        assert_eq!(
            DatasetError::UnsupportedPayloadFile(PathBuf::from("a.txt")).exit_code(),
            3
        );
        assert_eq!(
            DatasetError::DirectoryExists(PathBuf::from("out")).exit_code(),
            4
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(DatasetError::from(io).exit_code(), 7);
    }

    #[test]
    fn test_recorded_only() {
        let err = DatasetError::OperationFailed {
            command: "false".into(),
            code: 1,
        };
        assert!(err.is_recorded_only());
        assert!(!DatasetError::Config("x".into()).is_recorded_only());
    }

    #[test]
    fn test_format_detailed_starts_with_error() {
        let err = DatasetError::Config("bad".into());
        assert!(err.format_detailed().starts_with("Error: Configuration error: bad"));
    }
}
