//! Identifier validation and quoting for generated ClickHouse SQL.
//!
//! Table and database names cannot be bound as parameters, so they are
//! validated and wrapped in backticks. Values compared against a partition
//! key are rendered as single-quoted literals when their type is string-like.

use crate::error::{DatasetError, Result};

/// Maximum identifier length accepted by ClickHouse.
const MAX_IDENTIFIER_LENGTH: usize = 255;

/// Validate an identifier for security issues.
///
/// Rejects empty names, names containing null bytes and names longer than
/// [`MAX_IDENTIFIER_LENGTH`] bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DatasetError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(DatasetError::InvalidIdentifier(format!(
            "identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DatasetError::InvalidIdentifier(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a ClickHouse identifier using backticks.
///
/// Backslashes and backticks inside the name are escaped with a backslash.
///
/// ```ignore
/// assert_eq!(quote_identifier("iris")?, "`iris`");
/// assert_eq!(quote_identifier("odd`name")?, "`odd\\`name`");
/// ```
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!(
        "`{}`",
        name.replace('\\', "\\\\").replace('`', "\\`")
    ))
}

/// Qualify a table name with its database.
pub fn qualify(database: &str, table: &str) -> Result<String> {
    Ok(format!(
        "{}.{}",
        quote_identifier(database)?,
        quote_identifier(table)?
    ))
}

/// Render a single-quoted SQL string literal.
pub fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
