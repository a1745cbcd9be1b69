use std::time::Duration;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";

/// 跟踪器运行参数
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// 下载服务地址
    pub base_url: String,
    /// 轮询周期
    pub poll_interval: Duration,
    /// 输入静默多久后才触发预览
    pub debounce: Duration,
    /// 单个 HTTP 请求的超时
    pub request_timeout: Duration,
    /// 连续轮询失败多少次后打印一次警告
    pub stall_warning_after: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER.to_string(),
            poll_interval: Duration::from_secs(1),
            debounce: Duration::from_millis(800),
            request_timeout: Duration::from_secs(30),
            stall_warning_after: 10,
        }
    }
}

impl TrackerConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
