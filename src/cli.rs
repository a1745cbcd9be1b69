use clap::{Parser, Subcommand};

use ytdl_tracker::common::models::{DownloadMode, Quality};
use ytdl_tracker::config::DEFAULT_SERVER;

/// 下载任务跟踪客户端
#[derive(Parser, Debug)]
#[command(name = "ytdl-tracker")]
#[command(version = "1.0")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "提交下载任务、预览链接并跟踪任务进度", long_about = None)]
pub struct Cli {
    /// 下载服务地址
    #[arg(long, value_name = "URL", global = true)]
    #[arg(env = "YTDL_TRACKER_SERVER", default_value = DEFAULT_SERVER)]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub server: String,

    /// 轮询周期 (毫秒)
    #[arg(long, value_name = "MS", global = true, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// 单个请求的超时 (秒)
    #[arg(long, value_name = "SECS", global = true, default_value_t = 30)]
    pub timeout_secs: u64,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 查看链接的预览信息
    Preview {
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,
    },

    /// 查看链接可用的清晰度与码率
    Qualities {
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,
    },

    /// 提交下载任务
    Submit {
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,

        /// single-video, single-audio, playlist-video, playlist-audio, subtitles
        #[arg(long, default_value = "single-video")]
        mode: DownloadMode,

        /// 2160p/1440p/1080p/720p/480p/360p, 320kbps/256kbps/192kbps/128kbps 或 best
        #[arg(long, default_value = "best")]
        quality: Quality,

        /// 提交后持续跟踪直到任务结束
        #[arg(long)]
        watch: bool,
    },

    /// 列出所有任务
    List,

    /// 跟踪所有未结束的任务直到全部结束
    Watch,

    /// 检查下载服务状态
    Health,

    /// 清理已结束的任务
    Clear,

    /// 交互模式：`url <链接>` 更新输入，`submit <模式> [质量]` 提交当前链接
    Shell,
}
