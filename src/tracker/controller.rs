use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::common::api::error::ApiError;
use crate::common::api::service::{DownloadService, MetadataService};
use crate::common::models::{
    AvailableQualities, ClearResult, DownloadMode, HealthStatus, PreviewInfo, Quality, Task,
    TaskId,
};
use crate::config::TrackerConfig;
use crate::preview::{self, Debouncer, PreviewFetcher, PreviewState, Settled, TriggerAction};

use super::error::{Result, TrackerError};
use super::poller::{PollResult, Poller};
use super::reconciler::Reconciler;
use super::submitter::JobSubmitter;

const COMMAND_BUFFER: usize = 64;

/// 对外发布的只读状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerSnapshot {
    /// 按首次出现顺序
    pub tasks: Vec<Task>,
    pub active: Vec<TaskId>,
    pub poll_failures: HashMap<TaskId, u32>,
    pub preview: PreviewState,
    pub tick: u64,
}

impl TrackerSnapshot {
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|a| a == id)
    }

    /// 所有任务都已进入终态
    pub fn all_settled(&self) -> bool {
        self.active.is_empty()
    }
}

type ReloadReply = oneshot::Sender<Result<()>>;

enum Command {
    Input(String),
    ClearPreview,
    Register { task: Task, reply: oneshot::Sender<()> },
    Reload { reply: Option<ReloadReply> },
    Shutdown,
}

enum Completion {
    Preview {
        token: u64,
        result: std::result::Result<PreviewInfo, String>,
    },
    Reloaded {
        token: u64,
        result: std::result::Result<Vec<Task>, ApiError>,
        reply: Option<ReloadReply>,
    },
    Polled(PollResult),
}

// -----------------------------------------------------------------------------------------------

/// 持有任务表、活跃集合与预览状态的唯一所有者。
///
/// 所有网络请求都以 future 的形式放进 `in_flight`，结果回到同一个循环里串行应用，
/// 因此不需要任何锁
pub struct TrackerController {
    config: TrackerConfig,
    downloads: Arc<dyn DownloadService>,
    metadata: Arc<dyn MetadataService>,
    reconciler: Reconciler,
    poller: Poller,
    preview: PreviewFetcher,
    debouncer: Debouncer<String>,
    settled_rx: mpsc::UnboundedReceiver<Settled<String>>,
    command_rx: mpsc::Receiver<Command>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
    snapshot_tx: watch::Sender<TrackerSnapshot>,
    shutdown: bool,
}

impl TrackerController {
    pub fn new(
        config: TrackerConfig,
        downloads: Arc<dyn DownloadService>,
        metadata: Arc<dyn MetadataService>,
    ) -> (Self, TrackerHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(TrackerSnapshot::default());

        let handle = TrackerHandle {
            command_tx,
            snapshot_rx,
            submitter: JobSubmitter::new(Arc::clone(&downloads)),
            downloads: Arc::clone(&downloads),
            metadata: Arc::clone(&metadata),
        };

        let controller = Self {
            debouncer: Debouncer::new(config.debounce, settled_tx),
            poller: Poller::new(config.stall_warning_after),
            config,
            downloads,
            metadata,
            reconciler: Reconciler::new(),
            preview: PreviewFetcher::new(),
            settled_rx,
            command_rx,
            in_flight: FuturesUnordered::new(),
            snapshot_tx,
            shutdown: false,
        };

        (controller, handle)
    }

    /// 创建并在后台运行
    pub fn spawn(
        config: TrackerConfig,
        downloads: Arc<dyn DownloadService>,
        metadata: Arc<dyn MetadataService>,
    ) -> (TrackerHandle, JoinHandle<()>) {
        let (controller, handle) = Self::new(config, downloads, metadata);
        let join = tokio::spawn(controller.run());
        (handle, join)
    }

    /// 主循环：命令、防抖事件、请求结果与轮询计时器
    pub async fn run(mut self) {
        info!(
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "任务跟踪器已启动"
        );

        // 启动时整体加载一次
        self.start_reload(None);

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => self.shutdown = true,
                },

                Some(settled) = self.settled_rx.recv() => {
                    self.on_settled(settled);
                }

                Some(done) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.on_completion(done);
                }

                _ = ticker.tick() => {
                    self.on_tick();
                }
            }

            if self.shutdown {
                break;
            }
            self.publish();
        }

        self.debouncer.cancel();
        info!("任务跟踪器已停止");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Input(value) => {
                self.debouncer.push(value);
            }
            Command::ClearPreview => {
                self.debouncer.cancel();
                self.preview.clear();
            }
            Command::Register { task, reply } => {
                let id = task.id.clone();
                if !self.reconciler.register_submitted(task) {
                    debug!(task_id = %id, "任务未加入活跃集合");
                }
                // 拉取服务端的完整记录
                self.start_reload(None);
                self.publish();
                let _ = reply.send(());
            }
            Command::Reload { reply } => self.start_reload(reply),
            Command::Shutdown => self.shutdown = true,
        }
    }

    fn on_settled(&mut self, settled: Settled<String>) {
        if !self.debouncer.accept(&settled) {
            return;
        }
        match preview::decide(&settled.value) {
            TriggerAction::Fetch(url) => self.start_preview(url),
            TriggerAction::Clear => self.preview.clear(),
        }
    }

    fn on_tick(&mut self) {
        let ids = self.reconciler.active().snapshot();
        for fut in self.poller.fan_out(&self.downloads, ids) {
            self.in_flight.push(fut.map(Completion::Polled).boxed());
        }
    }

    fn on_completion(&mut self, done: Completion) {
        match done {
            Completion::Preview { token, result } => {
                if let Err(message) = &result {
                    debug!(token, "预览查询失败: {}", message);
                }
                self.preview.complete(token, result);
            }
            Completion::Reloaded {
                token,
                result,
                reply,
            } => {
                let outcome = match result {
                    Ok(tasks) => {
                        self.reconciler.finish_reload(token, tasks);
                        self.poller.prune(&self.reconciler);
                        Ok(())
                    }
                    Err(e) => {
                        // 刷新失败时保留现有状态
                        error!("刷新任务列表失败: {}", e);
                        Err(TrackerError::Api(e))
                    }
                };
                if let Some(reply) = reply {
                    self.publish();
                    let _ = reply.send(outcome);
                }
            }
            Completion::Polled(poll) => {
                let id = poll.id.clone();
                if let Some(outcome) = self.poller.route(poll, &mut self.reconciler) {
                    debug!(task_id = %id, ?outcome, "状态已合并");
                }
                if !self.reconciler.active().contains(&id) {
                    self.poller.prune(&self.reconciler);
                }
            }
        }
    }

    fn start_preview(&mut self, url: String) {
        let token = self.preview.begin_fetch(&url);
        let metadata = Arc::clone(&self.metadata);
        debug!(token, %url, "查询链接预览");
        self.in_flight.push(
            async move {
                let result = metadata
                    .resolve_preview(&url)
                    .await
                    .map_err(|e| e.user_message());
                Completion::Preview { token, result }
            }
            .boxed(),
        );
    }

    fn start_reload(&mut self, reply: Option<ReloadReply>) {
        let token = self.reconciler.begin_reload();
        let downloads = Arc::clone(&self.downloads);
        self.in_flight.push(
            async move {
                let result = downloads.list_tasks().await;
                Completion::Reloaded {
                    token,
                    result,
                    reply,
                }
            }
            .boxed(),
        );
    }

    fn publish(&self) {
        let snapshot = TrackerSnapshot {
            tasks: self.reconciler.registry().to_vec(),
            active: self.reconciler.active().snapshot(),
            poll_failures: self.poller.failure_counts().clone(),
            preview: self.preview.state().clone(),
            tick: self.poller.current_tick(),
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

// -----------------------------------------------------------------------------------------------

/// 与控制器通信的句柄，可以随意克隆
#[derive(Clone)]
pub struct TrackerHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<TrackerSnapshot>,
    submitter: JobSubmitter,
    downloads: Arc<dyn DownloadService>,
    metadata: Arc<dyn MetadataService>,
}

impl TrackerHandle {
    async fn send(&self, cmd: Command) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| TrackerError::Shutdown)
    }

    /// 链接输入框的内容发生变化
    pub async fn input(&self, value: impl Into<String>) -> Result<()> {
        self.send(Command::Input(value.into())).await
    }

    /// 立即清空预览和错误
    pub async fn clear_preview(&self) -> Result<()> {
        self.send(Command::ClearPreview).await
    }

    /// 提交任务，成功后登记到任务表并触发一次完整刷新。
    /// 失败时不做任何修改，也不会自动重试
    pub async fn submit(&self, url: &str, mode: DownloadMode, quality: Quality) -> Result<TaskId> {
        let task = self.submitter.submit(url, mode, quality).await?;
        let id = task.id.clone();

        let (reply, done) = oneshot::channel();
        self.send(Command::Register { task, reply }).await?;
        done.await.map_err(|_| TrackerError::Shutdown)?;
        Ok(id)
    }

    /// 整体刷新任务表，等待刷新完成
    pub async fn reload(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Reload { reply: Some(reply) }).await?;
        done.await.map_err(|_| TrackerError::Shutdown)?
    }

    /// 让服务端清理已结束的任务，然后刷新
    pub async fn clear_finished(&self) -> Result<ClearResult> {
        let result = self.downloads.clear_finished().await?;
        info!("{}", result.message);
        if let Err(e) = self.reload().await {
            warn!("清理后刷新失败: {}", e);
        }
        Ok(result)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        Ok(self.downloads.health().await?)
    }

    pub async fn available_qualities(&self, url: &str) -> Result<AvailableQualities> {
        Ok(self.metadata.available_qualities(url).await?)
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot_rx.clone()
    }

    /// 等待直到快照满足条件
    pub async fn wait_until(
        &self,
        mut condition: impl FnMut(&TrackerSnapshot) -> bool,
    ) -> Result<TrackerSnapshot> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|s| condition(s))
            .await
            .map_err(|_| TrackerError::Shutdown)?
            .clone();
        Ok(snapshot)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }
}
