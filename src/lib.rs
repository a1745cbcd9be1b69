pub mod common;
pub mod config;
pub mod preview;
pub mod tracker;

pub use common::api::client::ServiceClient;
pub use common::api::error::ApiError;
pub use common::api::service::{DownloadService, MetadataService};
pub use common::models::{DownloadMode, PreviewInfo, Quality, Task, TaskId, TaskStatus};
pub use config::TrackerConfig;
pub use tracker::{TrackerController, TrackerError, TrackerHandle, TrackerSnapshot};
