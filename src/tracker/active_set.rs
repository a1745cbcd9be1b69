use std::collections::HashSet;

use crate::common::models::TaskId;

/// 仍在轮询中的任务 id。
/// 一个 id 退出之后会被记入 retired，之后再也不能重新加入。
/// 任务从任务表中删除后，对应的退出记录随之释放
#[derive(Debug, Default, Clone)]
pub struct ActiveSet {
    ids: Vec<TaskId>,
    retired: HashSet<TaskId>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入活跃集合；已存在或已退出的 id 返回 false
    pub fn add(&mut self, id: &str) -> bool {
        if self.retired.contains(id) || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// 退出活跃集合，只有第一次调用会返回 true
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.retired.insert(id.to_string());
        self.ids.len() != before
    }

    /// 移出活跃集合但不记为退出（任务从服务端消失时使用）
    pub fn forget(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| existing != id);
        self.ids.len() != before
    }

    /// 只保留 `keep` 返回 true 的退出记录
    pub fn release_retired(&mut self, keep: impl Fn(&str) -> bool) {
        self.retired.retain(|id| keep(id.as_str()));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    /// 当前成员的拷贝，按加入顺序
    pub fn snapshot(&self) -> Vec<TaskId> {
        self.ids.clone()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
