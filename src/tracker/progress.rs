use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::common::models::{TaskId, TaskStatus};

use super::controller::TrackerSnapshot;

/// 终端里每个任务一条进度条
pub struct TaskProgressBoard {
    multi_pb: MultiProgress,
    bars: HashMap<TaskId, ProgressBar>,
    style: ProgressStyle,
}

impl TaskProgressBoard {
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        Self {
            multi_pb: MultiProgress::new(),
            bars: HashMap::new(),
            style,
        }
    }

    /// 根据快照刷新所有进度条，新任务按出现顺序追加
    pub fn update(&mut self, snapshot: &TrackerSnapshot) {
        for task in &snapshot.tasks {
            let pb = self.bars.entry(task.id.clone()).or_insert_with(|| {
                let pb = self.multi_pb.add(ProgressBar::new(100));
                pb.set_style(self.style.clone());
                pb.set_prefix(short_id(&task.id));
                pb
            });

            if pb.is_finished() {
                continue;
            }

            pb.set_position(task.clamped_progress().round() as u64);
            match task.status {
                TaskStatus::Starting => pb.set_message("准备中"),
                TaskStatus::Downloading => {
                    let file = task.current_file.as_deref().unwrap_or("下载中");
                    let failures = snapshot.poll_failures.get(&task.id).copied().unwrap_or(0);
                    if failures > 0 {
                        pb.set_message(format!("{} (查询失败 {} 次)", file, failures));
                    } else {
                        pb.set_message(file.to_string());
                    }
                }
                TaskStatus::Completed => {
                    pb.set_position(100);
                    let path = task.download_path.as_deref().unwrap_or_default();
                    pb.finish_with_message(format!("完成 {}", path));
                }
                TaskStatus::Failed => {
                    let reason = task.error.as_deref().unwrap_or("未知错误");
                    pb.abandon_with_message(format!("失败: {}", reason));
                }
            }
        }
    }

    pub fn clear(&self) {
        let _ = self.multi_pb.clear();
    }
}

impl Default for TaskProgressBoard {
    fn default() -> Self {
        Self::new()
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
