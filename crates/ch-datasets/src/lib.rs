//! # ch-datasets
//!
//! Load and dump ClickHouse datasets stored as plain directories.
//!
//! A dataset is a directory holding a `manifest.yaml`, one `ddl/<table>.sql`
//! file per table and CSV payloads under `data/<table>/`. This library
//! provides:
//!
//! - **Dataset catalog** searching configured repositories for datasets
//! - **Operation planning** turning files or table partitions into client commands
//! - **Process pool** running those commands with bounded parallelism
//! - **Transfer orchestration** for the load and dump directions
//!
//! ## Example
//!
//! ```rust,no_run
//! use ch_datasets::{
//!     ClickHouseClient, ClientCommand, Config, DatasetCatalog, DatasetTransfer, LoadOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ch_datasets::Result<()> {
//!     let config = Config::load("ch-datasets.yaml")?;
//!     let client = ClientCommand::from_server(&config.server);
//!     let transfer = DatasetTransfer::new(
//!         ClickHouseClient::new(client.clone()),
//!         client,
//!         DatasetCatalog::new(config.repos.clone()),
//!         config.transfer.clone(),
//!     );
//!     let summary = transfer.load("iris", &LoadOptions::default()).await?;
//!     println!("{}", summary.summary_line());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encoding;
pub mod error;
pub mod plan;
pub mod process;
pub mod progress;
pub mod repo;
pub mod transfer;
pub mod warehouse;

// Re-exports for convenient access
pub use config::{Config, RepoConfig, ServerConfig, TransferConfig};
pub use error::{DatasetError, Result};
pub use plan::Operation;
pub use process::{CommandRunner, PoolResult, ProcessPool, ShellRunner};
pub use progress::Progress;
pub use repo::{DatasetCatalog, DatasetManifest, Sources};
pub use transfer::{
    DatasetTransfer, Direction, DumpOptions, LoadOptions, TransferPhase, TransferSummary,
};
pub use warehouse::{ClickHouseClient, ClientCommand, TableMetadata, Warehouse};
