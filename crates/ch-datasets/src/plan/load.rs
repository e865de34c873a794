//! Load planning: payload files on disk to INSERT commands.

use super::Operation;
use crate::encoding::{quote_identifier, shell_quote};
use crate::error::{DatasetError, Result};
use crate::warehouse::ClientCommand;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Payload file encodings understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `*.csv`, streamed as-is.
    Csv,
    /// `*.csv.gz`, decompressed on the way in.
    CsvGzip,
}

impl PayloadFormat {
    /// Classify a payload file by name.
    pub fn detect(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if name.ends_with(".csv.gz") {
            Ok(PayloadFormat::CsvGzip)
        } else if name.ends_with(".csv") {
            Ok(PayloadFormat::Csv)
        } else {
            Err(DatasetError::UnsupportedPayloadFile(path.to_path_buf()))
        }
    }

    /// Command writing the file's CSV text to stdout.
    pub fn reader_command(&self, path: &Path) -> String {
        let file = shell_quote(&path.to_string_lossy());
        match self {
            PayloadFormat::Csv => format!("cat {}", file),
            PayloadFormat::CsvGzip => format!("gzip -d -c {}", file),
        }
    }
}

/// Plan one load operation per payload file under `data_path/<table>/`.
///
/// Tables and files are visited in lexicographic order. Any file that is
/// not `.csv` or `.csv.gz` fails the whole plan before an operation is
/// returned. A missing `data_path` yields no operations.
pub fn plan_load(data_path: &Path, client: &ClientCommand, csv_format: &str) -> Result<Vec<Operation>> {
    if !data_path.is_dir() {
        info!("No data directory at {}", data_path.display());
        return Ok(Vec::new());
    }

    let mut operations = Vec::new();
    for table_dir in sorted_entries(data_path)? {
        if !table_dir.is_dir() {
            debug!("Skipping non-directory entry: {}", table_dir.display());
            continue;
        }
        let table = file_name(&table_dir);
        info!("Processing table data: {}", table_dir.display());

        let insert = format!(
            "INSERT INTO {} FORMAT {}",
            quote_identifier(&table)?,
            csv_format
        );
        let client_cmd = client.shell_command(&insert);

        for payload in sorted_entries(&table_dir)? {
            if payload.is_dir() {
                debug!("Skipping nested directory: {}", payload.display());
                continue;
            }
            let format = PayloadFormat::detect(&payload)?;
            let command = format!("{} | {}", format.reader_command(&payload), client_cmd);
            let tag = file_name(&payload);
            operations.push(Operation::new(table.clone(), Some(tag), payload, command));
        }
    }

    Ok(operations)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn client() -> ClientCommand {
        ClientCommand::new("clickhouse-client", "localhost").with_database("iris")
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(
            PayloadFormat::detect(Path::new("data-all.csv")).unwrap(),
            PayloadFormat::Csv
        );
        assert_eq!(
            PayloadFormat::detect(Path::new("data-2024_Q1.csv.gz")).unwrap(),
            PayloadFormat::CsvGzip
        );
        assert!(matches!(
            PayloadFormat::detect(Path::new("events.txt")),
            Err(DatasetError::UnsupportedPayloadFile(_))
        ));
        assert!(PayloadFormat::detect(Path::new("data.csv.bz2")).is_err());
    }

    #[test]
    fn test_plan_orders_tables_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        touch(&data.join("sales/data-2.csv.gz"));
        touch(&data.join("sales/data-1.csv.gz"));
        touch(&data.join("iris/data-all.csv"));

        let ops = plan_load(&data, &client(), "CSVWithNames").unwrap();
        let files: Vec<_> = ops
            .iter()
            .map(|o| format!("{}/{}", o.table_name, o.file_name()))
            .collect();
        assert_eq!(
            files,
            vec!["iris/data-all.csv", "sales/data-1.csv.gz", "sales/data-2.csv.gz"]
        );
        assert_eq!(ops[0].partition_tag.as_deref(), Some("data-all.csv"));
    }

    #[test]
    fn test_plan_commands() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        touch(&data.join("iris/data-all.csv"));
        touch(&data.join("sales/data-1.csv.gz"));

        let ops = plan_load(&data, &client(), "CSVWithNames").unwrap();
        let csv = data.join("iris/data-all.csv");
        assert_eq!(
            ops[0].command,
            format!(
                "cat {} | clickhouse-client --host=localhost --database=iris \
                 '--query=INSERT INTO `iris` FORMAT CSVWithNames'",
                csv.display()
            )
        );
        assert!(ops[1].command.starts_with("gzip -d -c "));
        assert!(ops[1].command.contains("INSERT INTO `sales`"));
    }

    #[test]
    fn test_unsupported_file_fails_whole_plan() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        touch(&data.join("aaa/data-all.csv"));
        touch(&data.join("events/events.txt"));

        match plan_load(&data, &client(), "CSVWithNames") {
            Err(DatasetError::UnsupportedPayloadFile(path)) => {
                assert!(path.ends_with("events/events.txt"))
            }
            other => panic!("expected UnsupportedPayloadFile, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_dir_is_empty_plan() {
        let dir = tempfile::tempdir().unwrap();
        let ops = plan_load(&dir.path().join("data"), &client(), "CSVWithNames").unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_paths_with_spaces_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("my data");
        touch(&data.join("iris/data-all.csv"));

        let ops = plan_load(&data, &client(), "CSVWithNames").unwrap();
        assert!(ops[0]
            .command
            .starts_with(&format!("cat '{}'", data.join("iris/data-all.csv").display())));
    }
}
