//! Database metadata and statement collaborator.
//!
//! The transfer core never talks to the database directly. It asks a
//! [`Warehouse`] for table metadata, partition keys and row counts, and asks
//! it to run structural statements (database creation, DDL). Bulk data moves
//! through client processes built from a [`ClientCommand`].

mod clickhouse;
mod command;
mod result;

pub use clickhouse::ClickHouseClient;
pub use command::ClientCommand;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

/// Metadata for one table, fetched once per transfer.
///
/// `partition_key` and `sorting_key` are passed through verbatim into
/// generated SQL; they are not validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub database: String,
    pub name: String,
    pub partition_key: Option<String>,
    pub sorting_key: Option<String>,
    /// `CREATE TABLE` statement without the database qualifier.
    pub schema_definition: String,
}

impl TableMetadata {
    pub fn is_partitioned(&self) -> bool {
        self.partition_key.is_some()
    }
}

/// Distinct partition key values of a table, ascending, with the key's type.
/// A `None` value is the NULL key of a `Nullable` partition expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionKeys {
    pub values: Vec<Option<String>>,
    pub key_type: String,
}

impl PartitionKeys {
    /// Whether values must be written as quoted literals when compared in SQL.
    pub fn needs_quotes(&self) -> bool {
        needs_quoted_literal(&self.key_type)
    }
}

/// Types whose values are only comparable in SQL as a quoted literal:
/// strings, dates and times, UUIDs, enums and IP addresses, possibly wrapped
/// in `LowCardinality(..)` or `Nullable(..)`.
pub fn needs_quoted_literal(type_name: &str) -> bool {
    let mut inner = type_name.trim();
    loop {
        if let Some(rest) = strip_wrapper(inner, "LowCardinality") {
            inner = rest;
        } else if let Some(rest) = strip_wrapper(inner, "Nullable") {
            inner = rest;
        } else {
            break;
        }
    }
    match inner {
        "String" | "Date" | "Date32" | "DateTime" | "UUID" | "IPv4" | "IPv6" => true,
        _ => ["FixedString", "DateTime", "DateTime64", "Enum8", "Enum16"]
            .iter()
            .any(|family| strip_wrapper(inner, family).is_some()),
    }
}

fn strip_wrapper<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(wrapper)?
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

/// Source of table metadata and executor of structural statements.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Tables of `database`, ordered by name, optionally restricted to names
    /// matching `filter` (unanchored search).
    async fn fetch_tables(
        &self,
        database: &str,
        filter: Option<&Regex>,
    ) -> Result<Vec<TableMetadata>>;

    /// Distinct partition key values in ascending order. Empty for tables
    /// without a partition key.
    async fn fetch_partition_keys(&self, table: &TableMetadata) -> Result<PartitionKeys>;

    /// Number of rows in the table.
    async fn fetch_row_count(&self, table: &TableMetadata) -> Result<u64>;

    /// Run a statement, in the context of `database` when given. With
    /// `dry_run` the statement is only logged.
    async fn execute(&self, database: Option<&str>, statement: &str, dry_run: bool)
        -> Result<()>;
}
