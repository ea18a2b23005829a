pub mod classifier;
pub mod config;
pub mod cycle;
pub mod error;
pub mod io;
pub mod notifier;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod walker;

pub use error::{Result, TransportError, WatchError};
pub use types::{AbortReason, ClassificationResult, CycleOutcome, ItemRecord, Verdict};
