pub mod active_set;
pub mod controller;
pub mod error;
pub mod poller;
pub mod progress;
pub mod reconciler;
pub mod registry;
pub mod submitter;

pub use controller::{TrackerController, TrackerHandle, TrackerSnapshot};
pub use error::TrackerError;
pub use reconciler::{MergeOutcome, Reconciler};
