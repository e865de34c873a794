//! Bounded-concurrency execution of external commands.
//!
//! - [`CommandRunner`]: starts one command and reports its status without blocking
//! - [`ShellRunner`]: runs command lines through the system shell
//! - [`ProcessPool`]: keeps at most `capacity` commands running and accounts
//!   for every completion

mod pool;
mod runner;

pub use pool::{PoolResult, ProcessPool};
pub use runner::{CommandRunner, ExecFailure, ExecStatus, ShellHandle, ShellRunner};
