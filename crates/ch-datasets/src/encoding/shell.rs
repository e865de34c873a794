//! Shell command-line quoting and file-name encoding.

use crate::error::{DatasetError, Result};

/// Tag used in file names for tables without a partition key.
pub const UNPARTITIONED_TAG: &str = "all";

/// Tag used in file names for the NULL partition. [`partition_tag`] never
/// yields it, since it writes a literal `%` as `%25`.
pub const NULL_PARTITION_TAG: &str = "%NULL";

/// Quote one argument for a POSIX shell.
///
/// Arguments made only of characters the shell never interprets are left
/// bare; everything else is wrapped in single quotes, with an embedded `'`
/// written as `'\''`.
pub fn shell_quote(arg: &str) -> String {
    let is_bare = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '_' | '.' | '/' | '=' | ':' | '@' | '%' | '+' | ',' | '-')
        });
    if is_bare {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Encode a partition key value for use in a data file name.
///
/// Bytes outside `[A-Za-z0-9_.~-]` and `/` are percent-encoded (upper-case
/// hex), then every `/` becomes `_` so the tag never introduces a directory.
pub fn partition_tag(value: &str) -> String {
    let mut tag = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'~' | b'-' => {
                tag.push(byte as char)
            }
            b'/' => tag.push('_'),
            other => tag.push_str(&format!("%{:02X}", other)),
        }
    }
    tag
}

/// Accept a dataset or table name as a single directory name.
///
/// Names are used verbatim so a dump loads back into the same tables; names
/// that would leave the parent directory are rejected.
pub fn path_component(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(&['/', '\\', '\0'][..]) {
        return Err(DatasetError::InvalidIdentifier(format!(
            "name cannot be used as a directory name: {:?}",
            name
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_bare() {
        assert_eq!(shell_quote("clickhouse-client"), "clickhouse-client");
        assert_eq!(shell_quote("--host=localhost"), "--host=localhost");
        assert_eq!(shell_quote("/data/iris/data-all.csv"), "/data/iris/data-all.csv");
    }

    #[test]
    fn test_shell_quote_wraps_metacharacters() {
        assert_eq!(shell_quote(""), "''");
        assert_eq!(
            shell_quote("--query=SELECT * FROM t"),
            "'--query=SELECT * FROM t'"
        );
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_partition_tag_replaces_slashes() {
        assert_eq!(partition_tag("2024/Q1"), "2024_Q1");
        assert_eq!(format!("data-{}.csv.gz", partition_tag("2024/Q1")), "data-2024_Q1.csv.gz");
    }

    #[test]
    fn test_partition_tag_percent_encodes() {
        assert_eq!(partition_tag("201801"), "201801");
        assert_eq!(partition_tag("a b"), "a%20b");
        assert_eq!(partition_tag("O'Brien"), "O%27Brien");
        assert_eq!(partition_tag("(1,'x')"), "%281%2C%27x%27%29");
        assert_eq!(partition_tag("é"), "%C3%A9");
    }

    #[test]
    fn test_null_tag_distinct_from_values() {
        assert_ne!(partition_tag("%NULL"), NULL_PARTITION_TAG);
        assert_ne!(partition_tag("NULL"), NULL_PARTITION_TAG);
        assert_ne!(partition_tag("\\N"), NULL_PARTITION_TAG);
    }

    #[test]
    fn test_path_component() {
        assert_eq!(path_component("iris").unwrap(), "iris");
        assert_eq!(path_component("my table.v2").unwrap(), "my table.v2");
        assert_eq!(path_component("..data").unwrap(), "..data");
        for name in ["", ".", "..", "../../escape", "a/b", "a\\b", "nul\0"] {
            let err = path_component(name).unwrap_err();
            assert!(matches!(err, DatasetError::InvalidIdentifier(_)), "{:?}", name);
        }
    }
}
