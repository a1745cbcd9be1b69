use colored::*;

use crate::common::models::{PreviewInfo, Task, TaskStatus};

/// 终端消息的级别，决定前缀符号和颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
    Step,
    Waiting,
}

impl Level {
    fn badge(self) -> ColoredString {
        match self {
            Level::Success => "✓".green().bold(),
            Level::Info => "ℹ".blue().bold(),
            Level::Warning => "⚠".yellow().bold(),
            Level::Error => "✗".red().bold(),
            Level::Step => "▶".cyan().bold(),
            Level::Waiting => "⏳".yellow().bold(),
        }
    }
}

/// 面向用户的终端输出，与 tracing 日志分开
pub struct PrettyLogger;

impl PrettyLogger {
    pub fn emit(level: Level, message: impl AsRef<str>) {
        let message = message.as_ref();
        match level {
            // 步骤标题前空一行
            Level::Step => println!("\n{} {}", level.badge(), message.bold()),
            _ => println!("{} {}", level.badge(), message),
        }
    }

    /// 显示预览信息
    pub fn preview(info: &PreviewInfo) {
        let kind = if info.is_playlist { "播放列表" } else { "视频" };
        println!("{} {} ({})", "🎬".magenta().bold(), info.title.bold(), kind.cyan());
        if !info.uploader.is_empty() {
            println!("   上传者: {}", info.uploader);
        }
        if info.is_playlist {
            println!("   视频数: {}", info.video_count);
        }
        if let Some(duration) = info.duration {
            let secs = duration.max(0.0) as u64;
            println!("   时长: {:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60);
        }
        if let Some(views) = info.view_count {
            println!("   播放量: {}", views);
        }
        if let Some(desc) = info.description.as_deref().filter(|d| !d.is_empty()) {
            println!("   {}", desc.bright_black());
        }
    }

    /// 单个任务的一行摘要
    pub fn task_line(task: &Task) {
        let status = match task.status {
            TaskStatus::Starting => "starting".yellow(),
            TaskStatus::Downloading => "downloading".blue(),
            TaskStatus::Completed => "completed".green(),
            TaskStatus::Failed => "failed".red(),
        };
        println!(
            "{} [{}] {} {}/{} {:.1}%",
            "⬇".blue().bold(),
            status,
            task.id.bright_black(),
            task.mode,
            task.quality,
            task.clamped_progress()
        );
        if let Some(title) = &task.playlist_title {
            println!("   {}", title.bold());
        }
        if let Some(path) = &task.download_path {
            Self::file_info("保存位置", path);
        }
        if let Some(err) = &task.error {
            println!("   {}", err.red());
        }
    }

    /// 显示文件信息
    pub fn file_info(label: impl AsRef<str>, path: impl AsRef<str>) {
        println!("{} {}: {}", "📁".blue().bold(), label.as_ref().bold(), path.as_ref());
    }

    /// 显示分割线
    pub fn separator() {
        println!("{}", "─".repeat(50).bright_black());
    }

    /// 显示完成总结
    pub fn completion_summary(items: Vec<impl AsRef<str>>) {
        println!("\n{}", "🎉 全部任务已结束".green().bold());
        for item in items {
            println!("  {}", item.as_ref());
        }
    }

    pub fn waiting(message: impl AsRef<str>) {
        Self::emit(Level::Waiting, message);
    }
}

/// `log_*!` 宏按级别格式化并输出一行
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::emit($crate::common::logger::Level::Success, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::emit($crate::common::logger::Level::Info, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::emit($crate::common::logger::Level::Warning, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::emit($crate::common::logger::Level::Error, format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_step {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::emit($crate::common::logger::Level::Step, format!($($arg)*))
    };
}
