//! Operation planning for both transfer directions.
//!
//! The planner turns dataset layout (load) or table metadata (dump) into an
//! ordered list of [`Operation`]s, each one a single shell command. Planning
//! is deterministic: the same inputs always yield the same list in the same
//! order, even though execution order is not guaranteed.
//!
//! - [`plan_load`]: one operation per payload file under `data/<table>/`
//! - [`plan_dump`]: one operation per partition of each selected table

mod dump;
mod load;
mod operation;

pub use dump::{plan_dump, DumpPlanOptions};
pub use load::{plan_load, PayloadFormat};
pub use operation::Operation;
