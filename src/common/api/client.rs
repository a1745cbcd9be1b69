use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use crate::common::models::{
    AvailableQualities, ClearResult, DownloadMode, ErrorBody, HealthStatus, PreviewInfo, Quality,
    SubmitRequest, SubmitResponse, Task, UrlRequest,
};

use super::error::ApiError;
use super::service::{DownloadService, MetadataService};

// 下载服务与元数据服务共用一个 HTTP 后端
#[derive(Debug, Clone)]
pub struct ServiceClient {
    pub inner: Client,
    base_url: Url,
}

impl ServiceClient {
    // 超时属于传输层策略，由调用方配置
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let inner = ClientBuilder::new()
            .timeout(timeout)
            .default_headers(Self::get_default_headers())
            .build()?;
        Self::with_client(inner, base_url)
    }

    pub fn with_client(inner: Client, base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        // 保证 join 时不会吞掉最后一段路径
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { inner, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ytdl-tracker/", env!("CARGO_PKG_VERSION"))),
        );
        headers
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn status_endpoint(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint("api/status/")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    // 通用请求
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let resp = self.inner.get(url).send().await.map_err(|e| {
            error!("请求失败: {}", e);
            e
        })?;
        Self::handle_response::<T>(resp).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("POST {}", url);
        let resp = self.inner.post(url).json(body).send().await.map_err(|e| {
            error!("请求失败: {}", e);
            e
        })?;
        Self::handle_response::<T>(resp).await
    }

    // 处理响应
    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| {
                ApiError::InvalidResponse(format!("解析响应失败: {}. 原始响应: {}", e, text))
            });
        }

        // 错误响应体统一为 {"error": "..."}，不是 JSON 时退回到状态码描述
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| text.clone()),
        };

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(message));
        }
        Err(ApiError::Service {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DownloadService for ServiceClient {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.get(self.endpoint("api/downloads")?).await
    }

    async fn get_status(&self, id: &str) -> Result<Task, ApiError> {
        match self.get(self.status_endpoint(id)?).await {
            Err(ApiError::NotFound(_)) => Err(ApiError::NotFound(id.to_string())),
            other => other,
        }
    }

    async fn submit(
        &self,
        url: &str,
        mode: DownloadMode,
        quality: Quality,
    ) -> Result<SubmitResponse, ApiError> {
        let body = SubmitRequest {
            url: url.to_string(),
            mode,
            quality,
        };
        self.post_json(self.endpoint("api/download")?, &body).await
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get(self.endpoint("api/health")?).await
    }

    async fn clear_finished(&self) -> Result<ClearResult, ApiError> {
        self.post_json(self.endpoint("api/clear-downloads")?, &serde_json::json!({}))
            .await
    }
}

#[async_trait]
impl MetadataService for ServiceClient {
    async fn resolve_preview(&self, url: &str) -> Result<PreviewInfo, ApiError> {
        let body = UrlRequest {
            url: url.to_string(),
        };
        self.post_json(self.endpoint("api/playlist-info")?, &body)
            .await
    }

    async fn available_qualities(&self, url: &str) -> Result<AvailableQualities, ApiError> {
        let body = UrlRequest {
            url: url.to_string(),
        };
        self.post_json(self.endpoint("api/available-qualities")?, &body)
            .await
    }
}
