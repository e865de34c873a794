//! Encoding rules shared by the planner and the warehouse client.
//!
//! Every string that ends up inside generated SQL or a shell command line
//! passes through one of these functions:
//!
//! - [`identifier`]: ClickHouse identifier quoting and SQL string literals
//! - [`shell`]: POSIX shell quoting, partition tags and directory names

pub mod identifier;
pub mod shell;

pub use identifier::{qualify, quote_identifier, string_literal, validate_identifier};
pub use shell::{
    partition_tag, path_component, shell_quote, NULL_PARTITION_TAG, UNPARTITIONED_TAG,
};
