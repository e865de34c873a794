//! Dump planning: table partitions to SELECT commands writing CSV files.

use super::Operation;
use crate::encoding::{
    partition_tag, path_component, qualify, shell_quote, string_literal, NULL_PARTITION_TAG,
    UNPARTITIONED_TAG,
};
use crate::error::Result;
use crate::warehouse::{ClientCommand, TableMetadata, Warehouse};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings for [`plan_dump`].
#[derive(Debug, Clone)]
pub struct DumpPlanOptions {
    /// Dataset `data/` directory; files go to `<data_path>/<table>/`.
    pub data_path: PathBuf,
    /// Output format of the SELECT statements.
    pub csv_format: String,
    /// Pipe output through gzip and name files `*.csv.gz`.
    pub compress: bool,
    /// Create the per-table directories while planning.
    pub create_dirs: bool,
}

/// Plan one dump operation per partition of each table.
///
/// Unpartitioned tables get a single `all` operation. Partition values are
/// taken in the order the warehouse returns them (ascending, already
/// grouped); the planner does not deduplicate them again. The NULL key is
/// selected with `isNull(..)` and written to `data-%NULL.csv`.
pub async fn plan_dump<W: Warehouse + ?Sized>(
    warehouse: &W,
    tables: &[TableMetadata],
    client: &ClientCommand,
    options: &DumpPlanOptions,
) -> Result<Vec<Operation>> {
    let mut operations = Vec::new();

    for table in tables {
        info!("Generating table dump command: {}", table.name);
        let table_path = options.data_path.join(path_component(&table.name)?);
        if options.create_dirs {
            std::fs::create_dir_all(&table_path)?;
        }

        let Some(partition_key) = &table.partition_key else {
            let select = select_statement(table, None, &options.csv_format)?;
            operations.push(dump_operation(
                table,
                None,
                UNPARTITIONED_TAG,
                &select,
                &table_path,
                client,
                options.compress,
            ));
            continue;
        };

        let keys = warehouse.fetch_partition_keys(table).await?;
        debug!(
            "{}: {} partitions of type {}",
            table.name,
            keys.values.len(),
            keys.key_type
        );
        let quote = keys.needs_quotes();

        for value in &keys.values {
            let (predicate, tag) = match value {
                Some(value) if quote => (
                    format!("{} = {}", partition_key, string_literal(value)),
                    partition_tag(value),
                ),
                Some(value) => (format!("{} = {}", partition_key, value), partition_tag(value)),
                None => (
                    format!("isNull({})", partition_key),
                    NULL_PARTITION_TAG.to_string(),
                ),
            };
            let select = select_statement(table, Some(&predicate), &options.csv_format)?;
            operations.push(dump_operation(
                table,
                Some(tag.clone()),
                &tag,
                &select,
                &table_path,
                client,
                options.compress,
            ));
        }
    }

    Ok(operations)
}

/// `SELECT * FROM db.t [WHERE ..] [ORDER BY sorting_key] FORMAT fmt`
fn select_statement(table: &TableMetadata, predicate: Option<&str>, format: &str) -> Result<String> {
    let mut sql = format!("SELECT * FROM {}", qualify(&table.database, &table.name)?);
    if let Some(predicate) = predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }
    if let Some(sorting_key) = &table.sorting_key {
        sql.push_str(&format!(" ORDER BY {}", sorting_key));
    }
    sql.push_str(&format!(" FORMAT {}", format));
    Ok(sql)
}

fn dump_operation(
    table: &TableMetadata,
    partition_tag: Option<String>,
    file_tag: &str,
    select: &str,
    table_path: &Path,
    client: &ClientCommand,
    compress: bool,
) -> Operation {
    let mut file_name = format!("data-{}.csv", file_tag);
    let mut command = client.shell_command(select);
    if compress {
        command.push_str(" | gzip");
        file_name.push_str(".gz");
    }
    let file = table_path.join(file_name);
    command.push_str(&format!(" > {}", shell_quote(&file.to_string_lossy())));

    Operation::new(table.name.clone(), partition_tag, file, command)
}
