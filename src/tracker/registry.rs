use std::collections::HashMap;

use crate::common::models::{Task, TaskId};

/// 任务表：id -> 任务，按首次出现的顺序排列，更新不会改变顺序
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, Task>,
}

/// upsert 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用一份完整快照替换整个任务表，同一个 id 只保留最后一次出现的记录
    pub fn replace_all(&mut self, snapshot: Vec<Task>) {
        self.order.clear();
        self.tasks.clear();
        for task in snapshot {
            self.upsert(task);
        }
    }

    /// 按 id 插入或整体覆盖
    pub fn upsert(&mut self, task: Task) -> Upsert {
        match self.tasks.get_mut(&task.id) {
            Some(existing) if *existing == task => Upsert::Unchanged,
            Some(existing) => {
                *existing = task;
                Upsert::Updated
            }
            None => {
                self.order.push(task.id.clone());
                self.tasks.insert(task.id.clone(), task);
                Upsert::Inserted
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.order.iter()
    }

    pub fn to_vec(&self) -> Vec<Task> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
