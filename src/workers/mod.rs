pub mod cycle;

pub use cycle::{CycleOutcome, CycleWorker};
