//! Batch orchestration.
//!
//! Runs one pipeline per input file with a bounded number in flight and
//! collects every outcome into a single report.

mod inputs;
mod runner;
mod types;

pub use inputs::collect_inputs;
pub use runner::BatchRunner;
pub use types::{BatchInput, BatchOutcome, BatchReport, PoolStatus};
