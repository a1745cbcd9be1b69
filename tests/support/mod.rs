#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use ytdl_tracker::common::api::error::ApiError;
use ytdl_tracker::common::api::service::{DownloadService, MetadataService};
use ytdl_tracker::common::models::{
    AvailableQualities, ClearResult, DownloadMode, HealthStatus, PreviewInfo, Quality,
    SubmitResponse, Task, TaskId, TaskStatus,
};
use ytdl_tracker::config::TrackerConfig;
use ytdl_tracker::tracker::{TrackerController, TrackerHandle};

pub fn created_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

pub fn task(id: &str, status: TaskStatus, progress: f64) -> Task {
    Task {
        id: id.to_string(),
        url: format!("https://www.youtube.com/watch?v={}", id),
        mode: DownloadMode::SingleVideo,
        quality: Quality::Best,
        status,
        progress,
        created_at: created_at(),
        playlist_title: None,
        video_count: None,
        current_file: None,
        download_path: None,
        error: None,
    }
}

pub fn preview_info(title: &str) -> PreviewInfo {
    PreviewInfo {
        title: title.to_string(),
        uploader: "uploader".to_string(),
        thumbnail: String::new(),
        is_playlist: false,
        video_count: 1,
        duration: Some(212.0),
        view_count: Some(1000),
        description: None,
    }
}

/// 每次状态查询按脚本推进一步
#[derive(Debug, Clone)]
pub enum Step {
    Downloading(f64),
    Completed(&'static str),
    Failed(&'static str),
    /// 本次查询返回错误，任务不变
    Error,
}

#[derive(Default)]
struct DownloadState {
    tasks: Vec<Task>,
    scripts: HashMap<TaskId, VecDeque<Step>>,
    delays: HashMap<TaskId, Duration>,
    call_delays: HashMap<TaskId, VecDeque<Duration>>,
    status_calls: HashMap<TaskId, usize>,
    submit_calls: usize,
    list_calls: usize,
    submit_error: Option<String>,
    list_error: bool,
}

/// 内存中的下载服务
#[derive(Default)]
pub struct FakeDownloads {
    state: Mutex<DownloadState>,
}

impl FakeDownloads {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Arc<Self> {
        let fake = Self::default();
        fake.state.lock().unwrap().tasks = tasks;
        Arc::new(fake)
    }

    pub fn script(&self, id: &str, steps: Vec<Step>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(id.to_string(), steps.into());
    }

    pub fn delay_status(&self, id: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(id.to_string(), delay);
    }

    /// 依次用于接下来几次查询的延迟，用完后回到 `delay_status` 的设置
    pub fn delay_calls(&self, id: &str, delays: Vec<Duration>) {
        self.state
            .lock()
            .unwrap()
            .call_delays
            .insert(id.to_string(), delays.into());
    }

    pub fn fail_submissions(&self, message: &str) {
        self.state.lock().unwrap().submit_error = Some(message.to_string());
    }

    pub fn fail_list(&self, fail: bool) {
        self.state.lock().unwrap().list_error = fail;
    }

    pub fn status_calls(&self, id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .status_calls
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    pub fn submit_calls(&self) -> usize {
        self.state.lock().unwrap().submit_calls
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    fn advance(&self, id: &str) -> Result<Task, ApiError> {
        let mut state = self.state.lock().unwrap();
        *state.status_calls.entry(id.to_string()).or_insert(0) += 1;

        let step = state.scripts.get_mut(id).and_then(|s| s.pop_front());
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;

        match step {
            Some(Step::Downloading(progress)) => {
                task.status = TaskStatus::Downloading;
                task.progress = progress;
                task.current_file = Some(format!("{}.part", id));
            }
            Some(Step::Completed(path)) => {
                task.status = TaskStatus::Completed;
                task.progress = 100.0;
                task.download_path = Some(path.to_string());
            }
            Some(Step::Failed(message)) => {
                task.status = TaskStatus::Failed;
                task.error = Some(message.to_string());
            }
            Some(Step::Error) => {
                return Err(ApiError::Service {
                    status: 500,
                    message: "backend unavailable".to_string(),
                });
            }
            None => {}
        }
        Ok(task.clone())
    }
}

#[async_trait]
impl DownloadService for FakeDownloads {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.list_error {
            return Err(ApiError::Service {
                status: 500,
                message: "list failed".to_string(),
            });
        }
        Ok(state.tasks.clone())
    }

    async fn get_status(&self, id: &str) -> Result<Task, ApiError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            let next = state.call_delays.get_mut(id).and_then(|d| d.pop_front());
            let fallback = state.delays.get(id).copied();
            next.or(fallback)
        };
        // 响应内容在请求到达服务端时确定，延迟只影响返回时间
        let result = self.advance(id);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn submit(
        &self,
        url: &str,
        mode: DownloadMode,
        quality: Quality,
    ) -> Result<SubmitResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.submit_calls += 1;
        if let Some(message) = &state.submit_error {
            return Err(ApiError::Service {
                status: 500,
                message: message.clone(),
            });
        }

        let id = format!("task-{}", state.submit_calls);
        let path = format!("/downloads/{}", id);
        state.tasks.push(Task {
            id: id.clone(),
            url: url.to_string(),
            mode,
            quality,
            status: TaskStatus::Starting,
            progress: 0.0,
            created_at: created_at(),
            playlist_title: None,
            video_count: None,
            current_file: None,
            download_path: Some(path.clone()),
            error: None,
        });
        Ok(SubmitResponse {
            task_id: id,
            message: "Download started".to_string(),
            download_path: Some(path),
        })
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(HealthStatus {
            status: "healthy".to_string(),
            downloads_folder: "/downloads".to_string(),
            active_downloads: state
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Downloading)
                .count(),
            total_downloads: state.tasks.len(),
        })
    }

    async fn clear_finished(&self) -> Result<ClearResult, ApiError> {
        let mut state = self.state.lock().unwrap();
        let before = state.tasks.len();
        state.tasks.retain(|t| !t.is_terminal());
        Ok(ClearResult {
            message: format!("Cleared {} downloads", before - state.tasks.len()),
            remaining: state.tasks.len(),
        })
    }
}

/// 内存中的元数据服务，可以为每个链接设置延迟
#[derive(Default)]
pub struct FakeMetadata {
    delays: Mutex<HashMap<String, Duration>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeMetadata {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataService for FakeMetadata {
    async fn resolve_preview(&self, url: &str) -> Result<PreviewInfo, ApiError> {
        self.calls.lock().unwrap().push(url.to_string());
        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().get(url).cloned();
        match failure {
            Some(message) => Err(ApiError::Service {
                status: 400,
                message,
            }),
            None => Ok(preview_info(&format!("title of {}", url))),
        }
    }

    async fn available_qualities(&self, _url: &str) -> Result<AvailableQualities, ApiError> {
        Ok(AvailableQualities {
            video_qualities: vec![1080, 720, 360],
            audio_qualities: vec![160, 128],
        })
    }
}

pub fn spawn_tracker(downloads: Arc<FakeDownloads>, metadata: Arc<FakeMetadata>) -> TrackerHandle {
    let downloads: Arc<dyn DownloadService> = downloads;
    let metadata: Arc<dyn MetadataService> = metadata;
    let (handle, _join) = TrackerController::spawn(TrackerConfig::default(), downloads, metadata);
    handle
}
