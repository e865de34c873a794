//! A single planned unit of work.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// One shell command moving one payload file into or out of one table.
///
/// Created by the planner and consumed exactly once by the process pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    /// Table the data belongs to.
    pub table_name: String,

    /// Encoded partition key of a dump, or the payload file name of a load.
    /// `None` for whole-table dumps.
    pub partition_tag: Option<String>,

    /// Payload file read (load) or written (dump).
    pub file: PathBuf,

    /// Complete, already-quoted shell command line.
    pub command: String,
}

impl Operation {
    pub fn new(
        table_name: impl Into<String>,
        partition_tag: Option<String>,
        file: impl Into<PathBuf>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            partition_tag,
            file: file.into(),
            command: command.into(),
        }
    }

    /// File name of the payload, for progress messages.
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string())
    }

    pub fn file_path(&self) -> &Path {
        &self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        let op = Operation::new(
            "sales",
            Some("2024_Q1".to_string()),
            "/repo/ds/data/sales/data-2024_Q1.csv.gz",
            "true",
        );
        assert_eq!(op.file_name(), "data-2024_Q1.csv.gz");
        assert_eq!(op.table_name, "sales");
        assert_eq!(op.partition_tag.as_deref(), Some("2024_Q1"));
    }
}
