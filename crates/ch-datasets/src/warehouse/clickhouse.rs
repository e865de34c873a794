//! ClickHouse warehouse backed by the `clickhouse-client` binary.

use super::command::ClientCommand;
use super::result::QueryResult;
use super::{PartitionKeys, TableMetadata, Warehouse};
use crate::encoding::{qualify, quote_identifier, string_literal};
use crate::error::{DatasetError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

const RESULT_FORMAT: &str = "JSONCompact";

/// Runs metadata queries and structural statements through the client binary.
///
/// Each call is one short-lived client process; no connection is held open.
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    command: ClientCommand,
}

impl ClickHouseClient {
    /// Client for a server. Any database set on `command` is replaced per call.
    pub fn new(command: ClientCommand) -> Self {
        Self { command }
    }

    pub fn host(&self) -> &str {
        self.command.host()
    }

    fn client_for(&self, database: Option<&str>) -> ClientCommand {
        match database {
            Some(db) => self.command.clone().with_database(db),
            None => self.command.clone(),
        }
    }

    /// Run a statement and return its raw standard output.
    async fn run(&self, database: Option<&str>, sql: &str, extra_args: &[&str]) -> Result<String> {
        let client = self.client_for(database);
        debug!("SQL: {}", sql);

        let output = Command::new(client.binary())
            .args(client.args(sql))
            .args(extra_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                DatasetError::client(sql, format!("failed to run {}: {}", client.binary(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DatasetError::client(
                sql,
                format!("{} ({})", stderr.trim(), output.status),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| DatasetError::client(sql, format!("non UTF-8 output: {}", e)))
    }

    /// Run a query and decode its typed result.
    async fn select(&self, database: Option<&str>, sql: &str) -> Result<QueryResult> {
        let format_arg = format!("--format={}", RESULT_FORMAT);
        let stdout = self.run(database, sql, &[&format_arg]).await?;
        QueryResult::from_json_compact(&stdout)
            .map_err(|e| DatasetError::client(sql, format!("unreadable result: {}", e)))
    }
}

#[async_trait]
impl Warehouse for ClickHouseClient {
    async fn fetch_tables(
        &self,
        database: &str,
        filter: Option<&Regex>,
    ) -> Result<Vec<TableMetadata>> {
        info!(
            "Fetch tables from host: {} database: {}",
            self.command.host(),
            database
        );
        let sql = format!(
            "SELECT name, partition_key, sorting_key FROM system.tables \
             WHERE database = {} AND engine NOT LIKE 'Materialized%' AND name NOT LIKE '.%' \
             ORDER BY name",
            string_literal(database)
        );
        let listing = self.select(None, &sql).await?;

        let mut tables = Vec::new();
        for row in listing.rows {
            let mut cells = row.into_iter();
            let name = cells.next().flatten().unwrap_or_default();
            if let Some(re) = filter {
                if !re.is_match(&name) {
                    continue;
                }
            }
            let partition_key = cells.next().flatten().filter(|k| !k.is_empty());
            let sorting_key = cells.next().flatten().filter(|k| !k.is_empty());

            let show = format!("SHOW CREATE TABLE {}", qualify(database, &name)?);
            let create = self.select(None, &show).await?;
            let statement = create.scalar().ok_or_else(|| {
                DatasetError::client(&show, "no CREATE statement returned")
            })?;

            tables.push(TableMetadata {
                database: database.to_string(),
                schema_definition: strip_database_qualifier(statement, database),
                name,
                partition_key,
                sorting_key,
            });
        }

        Ok(tables)
    }

    async fn fetch_partition_keys(&self, table: &TableMetadata) -> Result<PartitionKeys> {
        let Some(key) = &table.partition_key else {
            return Ok(PartitionKeys::default());
        };
        let sql = format!(
            "SELECT {} AS key FROM {} GROUP BY key ORDER BY key",
            key,
            qualify(&table.database, &table.name)?
        );
        let result = self.select(Some(&table.database), &sql).await?;
        let key_type = result.first_type().unwrap_or_default().to_string();

        Ok(PartitionKeys {
            values: result.first_column(),
            key_type,
        })
    }

    async fn fetch_row_count(&self, table: &TableMetadata) -> Result<u64> {
        let sql = format!(
            "SELECT count() FROM {}",
            qualify(&table.database, &table.name)?
        );
        let result = self.select(Some(&table.database), &sql).await?;
        let value = result.scalar().unwrap_or("0");
        value
            .trim()
            .parse()
            .map_err(|_| DatasetError::client(&sql, format!("unexpected row count {:?}", value)))
    }

    async fn execute(
        &self,
        database: Option<&str>,
        statement: &str,
        dry_run: bool,
    ) -> Result<()> {
        if dry_run {
            debug!("Dry run SQL: {}", statement);
            return Ok(());
        }
        self.run(database, statement, &["--multiquery"]).await?;
        Ok(())
    }
}

/// Remove the `<database>.` qualifier from the object name of a
/// `SHOW CREATE` statement so the DDL can be replayed into another database.
fn strip_database_qualifier(statement: &str, database: &str) -> String {
    let mut qualifiers = vec![format!("{}.", database)];
    if let Ok(quoted) = quote_identifier(database) {
        qualifiers.push(format!("{}.", quoted));
    }

    for kind in ["CREATE TABLE ", "CREATE VIEW ", "CREATE DICTIONARY "] {
        if let Some(rest) = statement.strip_prefix(kind) {
            for qualifier in &qualifiers {
                if let Some(unqualified) = rest.strip_prefix(qualifier.as_str()) {
                    return format!("{}{}", kind, unqualified);
                }
            }
        }
    }
    statement.to_string()
}
