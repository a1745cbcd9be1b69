use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use ytdl_tracker::common::api::client::ServiceClient;
use ytdl_tracker::common::api::service::{DownloadService, MetadataService};
use ytdl_tracker::common::logger::PrettyLogger;
use ytdl_tracker::common::models::{DownloadMode, Quality, TaskId, TaskStatus};
use ytdl_tracker::config::TrackerConfig;
use ytdl_tracker::preview::{PreviewState, is_supported_url};
use ytdl_tracker::tracker::progress::TaskProgressBoard;
use ytdl_tracker::tracker::{TrackerController, TrackerHandle, TrackerSnapshot};
use ytdl_tracker::{log_error, log_info, log_step, log_success, log_warning};

mod cli;

type Result<T> = anyhow::Result<T>;

/// 启动后台控制器
fn start_tracker(config: &TrackerConfig, client: &Arc<ServiceClient>) -> TrackerHandle {
    let downloads: Arc<dyn DownloadService> = client.clone();
    let metadata: Arc<dyn MetadataService> = client.clone();
    let (handle, _join) = TrackerController::spawn(config.clone(), downloads, metadata);
    handle
}

/// 通过防抖输入获取预览
async fn show_preview(handle: &TrackerHandle, url: &str) -> Result<()> {
    if !is_supported_url(url) {
        log_warning!("不支持的链接: {}", url);
        return Ok(());
    }

    log_step!("获取预览信息");
    handle.input(url).await?;
    let snapshot = handle
        .wait_until(|s| matches!(s.preview, PreviewState::Preview(_) | PreviewState::Error(_)))
        .await?;

    match &snapshot.preview {
        PreviewState::Preview(info) => PrettyLogger::preview(info),
        PreviewState::Error(message) => log_error!("获取预览失败: {}", message),
        _ => {}
    }
    Ok(())
}

/// 持续显示进度，`only` 为空时等待所有活跃任务结束
async fn watch_tasks(handle: &TrackerHandle, only: Option<TaskId>) -> Result<()> {
    let mut board = TaskProgressBoard::new();
    let mut rx = handle.subscribe();

    loop {
        let snapshot = rx.borrow_and_update().clone();
        board.update(&snapshot);

        let done = match &only {
            Some(id) => snapshot.task(id).map(|t| t.is_terminal()).unwrap_or(true),
            None => snapshot.all_settled(),
        };
        if done {
            print_summary(&snapshot, only.as_deref());
            return Ok(());
        }

        tokio::select! {
            changed = rx.changed() => changed?,
            _ = tokio::signal::ctrl_c() => {
                board.clear();
                log_warning!("已停止跟踪，任务仍在服务端继续执行");
                return Ok(());
            }
        }
    }
}

fn print_summary(snapshot: &TrackerSnapshot, only: Option<&str>) {
    let items: Vec<String> = snapshot
        .tasks
        .iter()
        .filter(|t| only.map(|id| id == t.id).unwrap_or(true))
        .map(|t| match t.status {
            TaskStatus::Completed => format!(
                "{} {} -> {}",
                "✓".green(),
                t.playlist_title.as_deref().unwrap_or(&t.url),
                t.download_path.as_deref().unwrap_or("-")
            ),
            TaskStatus::Failed => format!(
                "{} {}: {}",
                "✗".red(),
                t.url,
                t.error.as_deref().unwrap_or("未知错误")
            ),
            _ => format!("{} {} {:.1}%", "…".yellow(), t.url, t.clamped_progress()),
        })
        .collect();
    PrettyLogger::completion_summary(items);
}

/// 交互模式
async fn run_shell(handle: &TrackerHandle) -> Result<()> {
    log_info!("`url <链接>` 预览, `submit <模式> [质量]` 提交, `list` 查看任务, `quit` 退出");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rx = handle.subscribe();
    let mut current_url = String::new();
    let mut last_preview = PreviewState::Idle;
    let mut last_status: HashMap<TaskId, TaskStatus> = HashMap::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
                match cmd {
                    "url" => {
                        current_url = rest.trim().to_string();
                        handle.input(current_url.clone()).await?;
                    }
                    "submit" => submit_from_shell(handle, &current_url, rest).await,
                    "list" => {
                        for task in handle.snapshot().tasks {
                            PrettyLogger::task_line(&task);
                        }
                    }
                    "reload" => {
                        if let Err(e) = handle.reload().await {
                            log_error!("刷新失败: {}", e);
                        }
                    }
                    "quit" | "exit" => break,
                    "" => {}
                    other => log_warning!("未知命令: {}", other),
                }
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();

                if snapshot.preview != last_preview {
                    match &snapshot.preview {
                        PreviewState::Loading { url } => PrettyLogger::waiting(format!("正在获取预览: {}", url)),
                        PreviewState::Preview(info) => PrettyLogger::preview(info),
                        PreviewState::Error(message) => log_error!("{}", message),
                        PreviewState::Idle => debug!("预览已清空"),
                    }
                    last_preview = snapshot.preview.clone();
                }

                for task in &snapshot.tasks {
                    if last_status.get(&task.id) != Some(&task.status) {
                        last_status.insert(task.id.clone(), task.status);
                        PrettyLogger::task_line(task);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn submit_from_shell(handle: &TrackerHandle, url: &str, args: &str) {
    let mut parts = args.split_whitespace();
    let mode = match parts.next().map(str::parse::<DownloadMode>).transpose() {
        Ok(mode) => mode.unwrap_or_default(),
        Err(e) => {
            log_error!("{}", e);
            return;
        }
    };
    let quality = match parts.next().map(str::parse::<Quality>).transpose() {
        Ok(quality) => quality.unwrap_or_default(),
        Err(e) => {
            log_error!("{}", e);
            return;
        }
    };

    match handle.submit(url, mode, quality).await {
        Ok(id) => log_success!("任务已提交: {}", id),
        Err(e) => log_error!("提交失败: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = cli::Cli::parse();

    // 初始化日志
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = TrackerConfig::default()
        .with_base_url(args.server.clone())
        .with_poll_interval(Duration::from_millis(args.poll_interval_ms.max(1)))
        .with_request_timeout(Duration::from_secs(args.timeout_secs));
    debug!("配置: {:?}", config);

    let client = Arc::new(ServiceClient::new(&config.base_url, config.request_timeout)?);
    info!("下载服务: {}", client.base_url());

    match args.command {
        cli::Command::Preview { url } => {
            let handle = start_tracker(&config, &client);
            show_preview(&handle, &url).await?;
            handle.shutdown().await?;
        }
        cli::Command::Qualities { url } => {
            let qualities = client.available_qualities(&url).await?;
            log_info!("视频: {:?}", qualities.video_qualities);
            log_info!("音频 (kbps): {:?}", qualities.audio_qualities);
        }
        cli::Command::Submit {
            url,
            mode,
            quality,
            watch,
        } => {
            let handle = start_tracker(&config, &client);
            let id = handle.submit(&url, mode, quality).await?;
            log_success!("任务已提交: {}", id);
            if watch {
                watch_tasks(&handle, Some(id)).await?;
            }
            handle.shutdown().await?;
        }
        cli::Command::List => {
            let tasks = client.list_tasks().await?;
            if tasks.is_empty() {
                log_info!("暂无任务");
            }
            for task in &tasks {
                PrettyLogger::task_line(task);
                PrettyLogger::separator();
            }
        }
        cli::Command::Watch => {
            let handle = start_tracker(&config, &client);
            handle.reload().await?;
            watch_tasks(&handle, None).await?;
            handle.shutdown().await?;
        }
        cli::Command::Health => {
            let health = client.health().await?;
            log_success!("服务状态: {}", health.status);
            PrettyLogger::file_info("下载目录", &health.downloads_folder);
            log_info!(
                "进行中 {} / 总计 {}",
                health.active_downloads,
                health.total_downloads
            );
        }
        cli::Command::Clear => {
            let handle = start_tracker(&config, &client);
            let result = handle.clear_finished().await?;
            log_success!("{} (剩余 {})", result.message, result.remaining);
            handle.shutdown().await?;
        }
        cli::Command::Shell => {
            let handle = start_tracker(&config, &client);
            run_shell(&handle).await?;
            handle.shutdown().await?;
        }
    }

    Ok(())
}
