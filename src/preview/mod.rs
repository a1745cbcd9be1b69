pub mod debounce;
pub mod detector;
pub mod fetcher;

pub use debounce::{Debouncer, Settled};
pub use detector::is_supported_url;
pub use fetcher::{PreviewFetcher, PreviewState};

/// 输入稳定之后应该执行的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    Fetch(String),
    Clear,
}

/// 根据稳定后的输入决定是查询预览还是清空
pub fn decide(value: &str) -> TriggerAction {
    if is_supported_url(value) {
        TriggerAction::Fetch(value.trim().to_string())
    } else {
        TriggerAction::Clear
    }
}
