use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::common::api::error::ApiError;
use crate::common::api::service::DownloadService;
use crate::common::models::{Task, TaskId};

use super::reconciler::{MergeOutcome, Reconciler};

/// 一次状态查询的结果，带上发出请求时的批次号
#[derive(Debug)]
pub struct PollResult {
    pub id: TaskId,
    pub tick: u64,
    pub result: Result<Task, ApiError>,
}

/// 轮询器：维护批次号，为活跃集合中的每个任务生成独立的状态查询
#[derive(Debug)]
pub struct Poller {
    tick: u64,
    failures: HashMap<TaskId, u32>,
    stall_warning_after: u32,
}

impl Poller {
    pub fn new(stall_warning_after: u32) -> Self {
        Self {
            tick: 0,
            failures: HashMap::new(),
            stall_warning_after,
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// 进入下一个批次，为每个 id 生成一个查询。
    /// 活跃集合为空时只推进批次号，不发请求
    pub fn fan_out(
        &mut self,
        service: &Arc<dyn DownloadService>,
        ids: Vec<TaskId>,
    ) -> Vec<BoxFuture<'static, PollResult>> {
        self.tick += 1;
        let tick = self.tick;

        if !ids.is_empty() {
            debug!(tick, count = ids.len(), "发起状态轮询");
        }

        ids.into_iter()
            .map(|id| {
                let service = Arc::clone(service);
                async move {
                    let result = service.get_status(&id).await;
                    PollResult { id, tick, result }
                }
                .boxed()
            })
            .collect()
    }

    /// 把一次查询结果交给 Reconciler。
    /// 查询失败视为一次未命中：任务保持不变，下一个批次自动重试
    pub fn route(&mut self, poll: PollResult, reconciler: &mut Reconciler) -> Option<MergeOutcome> {
        match poll.result {
            Ok(task) => {
                if task.id != poll.id {
                    warn!(task_id = %poll.id, returned = %task.id, "状态响应的任务ID不匹配，已忽略");
                    self.record_failure(&poll.id);
                    return None;
                }
                self.failures.remove(&poll.id);
                Some(reconciler.merge_polled(poll.tick, task))
            }
            Err(e) => {
                debug!(task_id = %poll.id, tick = poll.tick, "状态查询失败: {}", e);
                self.record_failure(&poll.id);
                None
            }
        }
    }

    /// 记录一次失败，返回连续失败次数；达到阈值时打印一次警告
    pub fn record_failure(&mut self, id: &str) -> u32 {
        let count = self.failures.entry(id.to_string()).or_insert(0);
        *count += 1;
        if *count == self.stall_warning_after {
            warn!(task_id = %id, failures = *count, "任务状态连续查询失败，仍会继续重试");
        }
        *count
    }

    pub fn failures(&self, id: &str) -> u32 {
        self.failures.get(id).copied().unwrap_or(0)
    }

    pub fn failure_counts(&self) -> &HashMap<TaskId, u32> {
        &self.failures
    }

    /// 清理已经不在活跃集合中的计数
    pub fn prune(&mut self, reconciler: &Reconciler) {
        let active = reconciler.active();
        self.failures.retain(|id, _| active.contains(id));
    }
}
