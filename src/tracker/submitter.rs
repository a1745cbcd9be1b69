use std::sync::Arc;

use tracing::{info, warn};

use crate::common::api::service::DownloadService;
use crate::common::models::{DownloadMode, Quality, Task};

use super::error::{Result, TrackerError};

/// 提交新任务。失败时不会产生任何本地状态变化，也不会自动重试
#[derive(Clone)]
pub struct JobSubmitter {
    service: Arc<dyn DownloadService>,
}

impl JobSubmitter {
    pub fn new(service: Arc<dyn DownloadService>) -> Self {
        Self { service }
    }

    /// 本地校验：链接不能为空，质量必须属于该模式的可选列表
    pub fn validate(url: &str, mode: DownloadMode, quality: Quality) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TrackerError::InvalidRequest("链接不能为空".to_string()));
        }
        if !quality.is_allowed_for(mode) {
            return Err(TrackerError::InvalidRequest(format!(
                "模式 {} 不支持质量 {}",
                mode, quality
            )));
        }
        Ok(url.to_string())
    }

    /// 提交成功后返回一条占位记录（状态为 starting），由调用方登记并触发刷新
    pub async fn submit(&self, url: &str, mode: DownloadMode, quality: Quality) -> Result<Task> {
        let url = Self::validate(url, mode, quality)?;

        let resp = self
            .service
            .submit(&url, mode, quality)
            .await
            .map_err(|e| {
                warn!("提交任务失败: {}", e);
                e
            })?;

        info!(task_id = %resp.task_id, %mode, %quality, "任务已提交");
        Ok(Task::provisional(
            resp.task_id,
            url,
            mode,
            quality,
            resp.download_path,
        ))
    }
}
