use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("响应解析失败: {0}")]
    InvalidResponse(String),

    #[error("任务不存在: {0}")]
    NotFound(String),

    // 服务端返回的 {"error": "..."}
    #[error("服务端错误 ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("无效的服务地址: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// 用于展示给用户的错误信息（服务端错误只保留原文）
    pub fn user_message(&self) -> String {
        match self {
            Self::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidBaseUrl(e.to_string())
    }
}
