use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::common::models::{Task, TaskId};

use super::active_set::ActiveSet;
use super::registry::{TaskRegistry, Upsert};

/// merge 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
    /// 比已应用的轮询批次更旧，被丢弃
    Stale,
    /// 试图离开终态，被丢弃
    TerminalLocked,
}

impl MergeOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated | Self::Unchanged)
    }
}

/// 任务表与活跃集合的唯一写入口。
///
/// 所有修改都经过 `load_all` / `merge` / `merge_polled` / `register_submitted`，
/// 保证活跃集合始终是任务表的子集，终态任务不会重新变为活跃
#[derive(Debug, Default)]
pub struct Reconciler {
    registry: TaskRegistry,
    active: ActiveSet,
    // 每个任务最后一次被应用的轮询批次
    applied_ticks: HashMap<TaskId, u64>,
    reload_token: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// 用服务端的完整快照替换任务表，并重新计算活跃集合
    pub fn load_all(&mut self, snapshot: Vec<Task>) {
        let merged: Vec<Task> = snapshot
            .into_iter()
            .map(|task| match self.registry.get(&task.id) {
                // 终态不可离开，保留本地已经观察到的终态记录
                Some(existing) if existing.is_terminal() && existing.status != task.status => {
                    warn!(task_id = %task.id, local = %existing.status, remote = %task.status, "快照试图改变终态，保留本地记录");
                    existing.clone()
                }
                _ => task,
            })
            .collect();

        self.registry.replace_all(merged);

        for id in self.active.snapshot() {
            match self.registry.get(&id) {
                Some(task) if task.is_terminal() => {
                    self.active.remove(&id);
                    info!(task_id = %id, status = %task.status, "任务已结束，停止轮询");
                }
                Some(_) => {}
                None => {
                    self.active.forget(&id);
                    debug!(task_id = %id, "任务不在快照中，停止轮询");
                }
            }
        }

        for task in self.registry.iter() {
            if !task.is_terminal() {
                self.active.add(&task.id);
            }
        }

        let registry = &self.registry;
        self.applied_ticks.retain(|id, _| registry.contains(id));
        // 服务端已经删除的终态任务不会再出现，无需继续记住
        self.active.release_retired(|id| registry.contains(id));

        debug!(
            total = self.registry.len(),
            active = self.active.len(),
            "任务表已刷新"
        );
    }

    /// 发起一次刷新，返回刷新令牌
    pub fn begin_reload(&mut self) -> u64 {
        self.reload_token += 1;
        self.reload_token
    }

    /// 只应用最新一次刷新的结果，较早的刷新晚到时返回 false
    pub fn finish_reload(&mut self, token: u64, snapshot: Vec<Task>) -> bool {
        if token != self.reload_token {
            debug!(token, latest = self.reload_token, "丢弃过期的刷新结果");
            return false;
        }
        self.load_all(snapshot);
        true
    }

    /// 按 id 插入或覆盖一个任务；终态任务会退出活跃集合。
    /// 同一个值重复应用结果不变
    pub fn merge(&mut self, task: Task) -> MergeOutcome {
        if let Some(existing) = self.registry.get(&task.id) {
            if existing.is_terminal() && existing.status != task.status {
                debug!(task_id = %task.id, "忽略离开终态的更新");
                return MergeOutcome::TerminalLocked;
            }
        }

        let id = task.id.clone();
        let terminal = task.is_terminal();
        let outcome = match self.registry.upsert(task) {
            Upsert::Inserted => MergeOutcome::Inserted,
            Upsert::Updated => MergeOutcome::Updated,
            Upsert::Unchanged => MergeOutcome::Unchanged,
        };

        if terminal && self.active.remove(&id) {
            info!(task_id = %id, "任务已结束，停止轮询");
        }

        outcome
    }

    /// 带轮询批次号的 merge：批次号小于已应用批次的响应直接丢弃。
    /// 发出请求之后被刷新移除的任务也不再写回
    pub fn merge_polled(&mut self, tick: u64, task: Task) -> MergeOutcome {
        if !self.registry.contains(&task.id) {
            debug!(task_id = %task.id, tick, "任务已不在任务表中，丢弃轮询结果");
            return MergeOutcome::Stale;
        }
        if let Some(&last) = self.applied_ticks.get(&task.id) {
            if tick < last {
                debug!(task_id = %task.id, tick, last, "丢弃过期的轮询结果");
                return MergeOutcome::Stale;
            }
        }

        let id = task.id.clone();
        let outcome = self.merge(task);
        if outcome.applied() {
            let last = self.applied_ticks.entry(id).or_insert(tick);
            *last = (*last).max(tick);
        }
        outcome
    }

    /// 登记刚提交成功的任务并加入活跃集合。
    /// 刷新可能先一步带回了完整记录，这种情况下保留已有记录
    pub fn register_submitted(&mut self, task: Task) -> bool {
        let id = task.id.clone();
        if !self.registry.contains(&id) {
            self.registry.upsert(task);
        }
        self.activate(&id)
    }

    /// 把任务表中的非终态任务加入活跃集合
    pub fn activate(&mut self, id: &str) -> bool {
        match self.registry.get(id) {
            Some(task) if !task.is_terminal() => self.active.add(id),
            _ => false,
        }
    }

    /// 手动让任务退出活跃集合
    pub fn retire(&mut self, id: &str) -> bool {
        self.active.remove(id)
    }

    pub fn last_applied_tick(&self, id: &str) -> Option<u64> {
        self.applied_ticks.get(id).copied()
    }
}
