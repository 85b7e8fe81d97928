pub mod history;
pub mod json_file;
pub mod lock;
pub mod samples;
pub mod snapshot;

pub use history::{window_cutoff, HistoricalLog, HistoryStore};
pub use json_file::{Diagnostics, LoadStatus};
pub use lock::RunLock;
pub use samples::SampleCacheStore;
pub use snapshot::SnapshotPublisher;
