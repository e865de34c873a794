//! Dataset transfer orchestrator - load and dump workflows.
//!
//! Both directions run through the same phases:
//!
//! 1. Planning: resolve the dataset or tables and build every operation
//! 2. SchemaApplied: structural work done sequentially (database, DDL)
//! 3. Transferring: operations run through a bounded [`ProcessPool`]
//! 4. Drained / Reported: counters collected into a [`TransferSummary`]
//!
//! Structural errors abort the transfer before any data operation starts.
//! Failed data operations are only counted.

mod summary;

pub use summary::{Direction, TransferPhase, TransferSummary};

use crate::config::TransferConfig;
use crate::encoding::{path_component, quote_identifier};
use crate::error::{DatasetError, Result};
use crate::plan::{plan_dump, plan_load, DumpPlanOptions, Operation};
use crate::process::{CommandRunner, PoolResult, ProcessPool, ShellRunner};
use crate::progress::Progress;
use crate::repo::{DatasetCatalog, DatasetManifest, Sources, MANIFEST_FILE};
use crate::warehouse::{ClientCommand, Warehouse};
use chrono::Utc;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Schema definition directory of a dataset.
pub const DDL_DIR: &str = "ddl";

/// Payload directory of a dataset.
pub const DATA_DIR: &str = "data";

/// Options for [`DatasetTransfer::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Search only this repository directory.
    pub repo_path: Option<PathBuf>,
    /// Target database; defaults to the dataset name.
    pub database: Option<String>,
    /// Pool capacity; defaults to the configured value.
    pub parallel: Option<usize>,
    /// Drop the database before loading.
    pub clean: bool,
    pub dry_run: bool,
}

/// Options for [`DatasetTransfer::dump`].
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Repository directory receiving `<name>/`.
    pub repo_path: PathBuf,
    /// Source database; defaults to the dataset name.
    pub database: Option<String>,
    /// Regex selecting tables by name.
    pub table_filter: Option<String>,
    /// Pool capacity; defaults to the configured value.
    pub parallel: Option<usize>,
    /// Reuse an existing dataset directory.
    pub overwrite: bool,
    /// Write `*.csv.gz` files.
    pub compress: bool,
    pub dry_run: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            database: None,
            table_filter: None,
            parallel: None,
            overwrite: false,
            compress: false,
            dry_run: false,
        }
    }
}

/// Runs loads and dumps against one server.
pub struct DatasetTransfer<W, R = ShellRunner> {
    warehouse: W,
    runner: R,
    client: ClientCommand,
    catalog: DatasetCatalog,
    settings: TransferConfig,
    progress: Progress,
}

impl<W: Warehouse> DatasetTransfer<W, ShellRunner> {
    /// Create a transfer running data operations through the system shell.
    ///
    /// `client` is the command used inside data operations; its database is
    /// set per transfer.
    pub fn new(
        warehouse: W,
        client: ClientCommand,
        catalog: DatasetCatalog,
        settings: TransferConfig,
    ) -> Self {
        Self {
            warehouse,
            runner: ShellRunner::new(),
            client,
            catalog,
            settings,
            progress: Progress::none(),
        }
    }
}

impl<W: Warehouse, R: CommandRunner + Clone> DatasetTransfer<W, R> {
    /// Run data operations with another runner.
    pub fn with_runner<R2: CommandRunner + Clone>(self, runner: R2) -> DatasetTransfer<W, R2> {
        DatasetTransfer {
            warehouse: self.warehouse,
            runner,
            client: self.client,
            catalog: self.catalog,
            settings: self.settings,
            progress: self.progress,
        }
    }

    /// Report progress messages to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    /// Load a dataset from its repository into the database.
    pub async fn load(&self, name: &str, options: &LoadOptions) -> Result<TransferSummary> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut phase = TransferPhase::Planning;
        info!("Starting load run: {}", run_id);

        let dataset = self.catalog.resolve(name, options.repo_path.as_deref())?;
        let database = options.database.clone().unwrap_or_else(|| name.to_string());
        let quoted_db = quote_identifier(&database)?;
        info!(
            "Loading to host: {} database: {}",
            self.client.host(),
            database
        );

        // Every payload file is checked before the database is touched.
        let client = self.client.clone().with_database(&database);
        let operations = plan_load(
            &dataset.path.join(DATA_DIR),
            &client,
            &self.settings.csv_format,
        )?;
        let ddl_files = ddl_files(&dataset.path.join(DDL_DIR))?;

        if options.clean {
            self.progress
                .report(&format!("Dropping database if it exists: {}", database));
            self.warehouse
                .execute(
                    None,
                    &format!("DROP DATABASE IF EXISTS {}", quoted_db),
                    options.dry_run,
                )
                .await?;
        }

        self.progress.report(&format!(
            "Creating database if it does not exist: {}",
            database
        ));
        self.warehouse
            .execute(
                None,
                &format!("CREATE DATABASE IF NOT EXISTS {}", quoted_db),
                options.dry_run,
            )
            .await?;

        for sql_file in &ddl_files {
            self.progress
                .report(&format!("Executing DDL: {}", sql_file.display()));
            let script = std::fs::read_to_string(sql_file)?;
            self.warehouse
                .execute(Some(&database), &script, options.dry_run)
                .await?;
        }
        phase.advance(TransferPhase::SchemaApplied);

        let planned = operations.len();
        phase.advance(TransferPhase::Transferring);
        let result = self
            .run_operations(operations, options.parallel, options.dry_run, |op| {
                format!(
                    "Loading data: table={}, file={}",
                    op.table_name,
                    op.file_name()
                )
            })
            .await;
        phase.advance(TransferPhase::Drained);

        Ok(self.report(
            run_id,
            Direction::Load,
            name,
            database,
            started_at,
            planned,
            result,
            &mut phase,
        ))
    }

    /// Dump tables of a database into a dataset directory.
    pub async fn dump(&self, name: &str, options: &DumpOptions) -> Result<TransferSummary> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut phase = TransferPhase::Planning;
        info!("Starting dump run: {}", run_id);

        let database = options.database.clone().unwrap_or_else(|| name.to_string());
        quote_identifier(&database)?;
        path_component(name)?;
        let filter = options
            .table_filter
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        let tables = self.warehouse.fetch_tables(&database, filter.as_ref()).await?;
        if tables.is_empty() {
            return Err(DatasetError::NoTablesFound {
                database,
                filter: options.table_filter.clone(),
            });
        }
        for table in &tables {
            path_component(&table.name)?;
        }
        info!("Found {} tables to dump", tables.len());

        let dataset_path = options.repo_path.join(name);
        let ddl_path = dataset_path.join(DDL_DIR);
        let data_path = dataset_path.join(DATA_DIR);
        self.progress.report(&format!(
            "Preparing dataset directory: {}",
            dataset_path.display()
        ));
        prepare_directory(&dataset_path, options.overwrite, options.dry_run)?;
        if !options.dry_run {
            std::fs::create_dir_all(&ddl_path)?;
            std::fs::create_dir_all(&data_path)?;
        }

        self.progress.report("Computing data set size");
        let mut size: u64 = 0;
        for table in &tables {
            debug!("Counting table rows: {}", table.name);
            let rows = self.warehouse.fetch_row_count(table).await?;
            self.progress
                .report(&format!("Table: {} Rows: {}", table.name, rows));
            size += rows;
        }
        self.progress.report(&format!("Total rows: {}", size));

        let manifest = DatasetManifest {
            title: Some(format!("{} Data Set", name)),
            description: Some(format!(
                "Data set dumped from host {}, database {}",
                self.client.host(),
                database
            )),
            size: Some(format!("{} rows", size)),
            sources: Some(Sources::One("(Add source URL here)".to_string())),
            ..DatasetManifest::default()
        };
        self.progress.report(&format!(
            "Writing manifest: {}",
            dataset_path.join(MANIFEST_FILE).display()
        ));
        if !options.dry_run {
            manifest.write(&dataset_path)?;
        }

        for table in &tables {
            let sql_path = ddl_path.join(format!("{}.sql", table.name));
            info!("Writing table definition: {}", sql_path.display());
            if !options.dry_run {
                std::fs::write(&sql_path, &table.schema_definition)?;
            }
        }
        phase.advance(TransferPhase::SchemaApplied);

        let client = self.client.clone().with_database(&database);
        let plan_options = DumpPlanOptions {
            data_path,
            csv_format: self.settings.csv_format.clone(),
            compress: options.compress,
            create_dirs: !options.dry_run,
        };
        let operations = plan_dump(&self.warehouse, &tables, &client, &plan_options).await?;

        let planned = operations.len();
        phase.advance(TransferPhase::Transferring);
        let result = self
            .run_operations(operations, options.parallel, options.dry_run, |op| {
                format!(
                    "Dumping data: table={}, partition={}",
                    op.table_name,
                    op.partition_tag.as_deref().unwrap_or("all")
                )
            })
            .await;
        phase.advance(TransferPhase::Drained);

        Ok(self.report(
            run_id,
            Direction::Dump,
            name,
            database,
            started_at,
            planned,
            result,
            &mut phase,
        ))
    }

    /// Submit every operation in order and wait for all of them.
    async fn run_operations(
        &self,
        operations: Vec<Operation>,
        parallel: Option<usize>,
        dry_run: bool,
        describe: impl Fn(&Operation) -> String,
    ) -> PoolResult {
        let capacity = parallel.unwrap_or(self.settings.parallel);
        let mut pool = ProcessPool::with_runner(self.runner.clone(), capacity)
            .dry_run(dry_run)
            .with_poll_interval(self.settings.poll_interval())
            .with_progress(self.progress.clone());

        for operation in operations {
            self.progress.report(&describe(&operation));
            pool.submit(operation).await;
        }
        pool.finish().await
    }

    #[allow(clippy::too_many_arguments)]
    fn report(
        &self,
        run_id: String,
        direction: Direction,
        dataset: &str,
        database: String,
        started_at: chrono::DateTime<Utc>,
        operations: usize,
        result: PoolResult,
        phase: &mut TransferPhase,
    ) -> TransferSummary {
        self.progress
            .report(&format!("Process outputs: {:?}", result.outputs));
        phase.advance(TransferPhase::Reported);

        let completed_at = Utc::now();
        let duration = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let summary = TransferSummary {
            run_id,
            direction,
            dataset: dataset.to_string(),
            database,
            started_at,
            completed_at,
            duration_seconds: duration,
            operations,
            succeeded: result.succeeded,
            failed: result.failed,
            outputs: result.outputs,
            failures: result.failures.iter().map(ToString::to_string).collect(),
            phase: *phase,
        };
        self.progress.report(&summary.summary_line());
        summary
    }
}

/// Regular files under `ddl/`, sorted by name. A missing directory has none.
fn ddl_files(ddl_path: &Path) -> Result<Vec<PathBuf>> {
    if !ddl_path.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(ddl_path)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Create the dataset directory, or accept an existing one when overwriting.
fn prepare_directory(path: &Path, overwrite: bool, dry_run: bool) -> Result<()> {
    if path.exists() {
        if !overwrite {
            return Err(DatasetError::DirectoryExists(path.to_path_buf()));
        }
        debug!("Reusing existing directory: {}", path.display());
        return Ok(());
    }
    if !dry_run {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
