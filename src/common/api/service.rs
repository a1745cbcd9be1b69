use async_trait::async_trait;

use crate::common::models::{
    AvailableQualities, ClearResult, DownloadMode, HealthStatus, PreviewInfo, Quality,
    SubmitResponse, Task,
};

use super::error::ApiError;

// -----------------------------------------------------------------------------------------------
/// 下载服务：接收任务、执行下载、汇报状态
#[async_trait]
pub trait DownloadService: Send + Sync {
    // 列出全部任务，顺序即服务端的插入顺序
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;

    // 查询单个任务，不存在时返回 ApiError::NotFound
    async fn get_status(&self, id: &str) -> Result<Task, ApiError>;

    // 提交新任务，重复调用会创建不同的任务
    async fn submit(
        &self,
        url: &str,
        mode: DownloadMode,
        quality: Quality,
    ) -> Result<SubmitResponse, ApiError>;

    async fn health(&self) -> Result<HealthStatus, ApiError>;

    // 清理服务端已完成 / 失败的任务
    async fn clear_finished(&self) -> Result<ClearResult, ApiError>;
}

/// 元数据服务：把链接解析成预览信息
#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn resolve_preview(&self, url: &str) -> Result<PreviewInfo, ApiError>;

    async fn available_qualities(&self, url: &str) -> Result<AvailableQualities, ApiError>;
}
