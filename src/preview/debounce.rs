use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 静默期结束后发出的事件
#[derive(Debug, Clone, PartialEq)]
pub struct Settled<T> {
    pub generation: u64,
    pub value: T,
}

/// 可取消的静默期计时器：每次新输入都会先取消旧计时器再重新计时，
/// 任意时刻最多只有一个计时器在等待
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    tx: mpsc::UnboundedSender<Settled<T>>,
    pending: Option<CancellationToken>,
    generation: u64,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(quiet: Duration, tx: mpsc::UnboundedSender<Settled<T>>) -> Self {
        Self {
            quiet,
            tx,
            pending: None,
            generation: 0,
        }
    }

    /// 记录一次新输入，返回它的代号
    pub fn push(&mut self, value: T) -> u64 {
        self.cancel();
        self.generation += 1;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();
        let quiet = self.quiet;
        let generation = self.generation;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!(generation, "防抖计时器已取消");
                }
                _ = tokio::time::sleep(quiet) => {
                    let _ = tx.send(Settled { generation, value });
                }
            }
        });

        self.pending = Some(token);
        generation
    }

    /// 取消正在等待的计时器（如果有）
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// 收到 Settled 事件后确认它仍是最新一次输入。
    /// 计时器在取消前已经触发、事件还在通道里时，这里会把它丢掉
    pub fn accept(&mut self, settled: &Settled<T>) -> bool {
        if self.pending.is_some() && settled.generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}
