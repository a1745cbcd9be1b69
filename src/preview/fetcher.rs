use serde::Serialize;
use tracing::debug;

use crate::common::models::PreviewInfo;

/// 预览区域的状态
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum PreviewState {
    #[default]
    Idle,
    Loading { url: String },
    Preview(PreviewInfo),
    Error(String),
}

/// 带请求令牌的预览状态机。
///
/// 每次 `begin_fetch` 都会发放一个递增令牌；`complete` 只接受最新令牌的结果，
/// 较早发出但较晚返回的请求会被丢弃。`clear` 同样会让之前的令牌作废
#[derive(Debug, Default)]
pub struct PreviewFetcher {
    latest_token: u64,
    state: PreviewState,
}

impl PreviewFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发起一次新的查询，返回本次请求的令牌
    pub fn begin_fetch(&mut self, url: &str) -> u64 {
        self.latest_token += 1;
        self.state = PreviewState::Loading {
            url: url.to_string(),
        };
        self.latest_token
    }

    /// 清空预览和错误，同时作废所有未返回的请求
    pub fn clear(&mut self) {
        self.latest_token += 1;
        self.state = PreviewState::Idle;
    }

    /// 应用查询结果，过期结果返回 false
    pub fn complete(&mut self, token: u64, result: Result<PreviewInfo, String>) -> bool {
        if token != self.latest_token {
            debug!(token, latest = self.latest_token, "丢弃过期的预览结果");
            return false;
        }
        // 已经被 clear 过的令牌也不再生效
        if !matches!(self.state, PreviewState::Loading { .. }) {
            return false;
        }

        self.state = match result {
            Ok(info) => PreviewState::Preview(info),
            Err(message) => PreviewState::Error(message),
        };
        true
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn latest_token(&self) -> u64 {
        self.latest_token
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, PreviewState::Loading { .. })
    }
}
