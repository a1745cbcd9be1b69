use thiserror::Error;

use crate::common::api::error::ApiError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("无效的请求: {0}")]
    InvalidRequest(String),

    #[error("跟踪器已关闭")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TrackerError>;
