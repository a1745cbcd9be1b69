use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// 下载服务分配的任务ID，创建后不可变
pub type TaskId = String;

// -----------------------------------------------------------------------------------------------

/// 下载模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadMode {
    #[default]
    SingleVideo,
    SingleAudio,
    PlaylistVideo,
    PlaylistAudio,
    Subtitles,
}

impl DownloadMode {
    pub const ALL: [DownloadMode; 5] = [
        Self::SingleVideo,
        Self::SingleAudio,
        Self::PlaylistVideo,
        Self::PlaylistAudio,
        Self::Subtitles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleVideo => "single-video",
            Self::SingleAudio => "single-audio",
            Self::PlaylistVideo => "playlist-video",
            Self::PlaylistAudio => "playlist-audio",
            Self::Subtitles => "subtitles",
        }
    }

    /// 是否只输出音频
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::SingleAudio | Self::PlaylistAudio)
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, Self::PlaylistVideo | Self::PlaylistAudio)
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|m| m.as_str() == s.trim())
            .copied()
            .ok_or_else(|| format!("未知的下载模式: {}", s))
    }
}

// -----------------------------------------------------------------------------------------------

/// 清晰度 / 码率标签，`Best` 为默认值且总是显式发送给服务端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Quality {
    #[serde(rename = "2160p")]
    Q2160P,
    #[serde(rename = "1440p")]
    Q1440P,
    #[serde(rename = "1080p")]
    Q1080P,
    #[serde(rename = "720p")]
    Q720P,
    #[serde(rename = "480p")]
    Q480P,
    #[serde(rename = "360p")]
    Q360P,
    #[serde(rename = "320kbps")]
    K320,
    #[serde(rename = "256kbps")]
    K256,
    #[serde(rename = "192kbps")]
    K192,
    #[serde(rename = "128kbps")]
    K128,
    #[default]
    #[serde(rename = "best")]
    Best,
}

const VIDEO_QUALITIES: [Quality; 7] = [
    Quality::Q2160P,
    Quality::Q1440P,
    Quality::Q1080P,
    Quality::Q720P,
    Quality::Q480P,
    Quality::Q360P,
    Quality::Best,
];

const AUDIO_QUALITIES: [Quality; 5] = [
    Quality::K320,
    Quality::K256,
    Quality::K192,
    Quality::K128,
    Quality::Best,
];

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Q2160P => "2160p",
            Self::Q1440P => "1440p",
            Self::Q1080P => "1080p",
            Self::Q720P => "720p",
            Self::Q480P => "480p",
            Self::Q360P => "360p",
            Self::K320 => "320kbps",
            Self::K256 => "256kbps",
            Self::K192 => "192kbps",
            Self::K128 => "128kbps",
            Self::Best => "best",
        }
    }

    /// 某个下载模式可选的质量列表（字幕模式按视频处理）
    pub fn options_for(mode: DownloadMode) -> &'static [Quality] {
        if mode.is_audio() {
            &AUDIO_QUALITIES
        } else {
            &VIDEO_QUALITIES
        }
    }

    pub fn is_allowed_for(&self, mode: DownloadMode) -> bool {
        Self::options_for(mode).contains(self)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VIDEO_QUALITIES
            .iter()
            .chain(AUDIO_QUALITIES.iter())
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("未知的质量选项: {}", s))
    }
}

// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Starting,
    Downloading,
    Completed,
    Failed,
}

impl TaskStatus {
    /// 终态之后不会再有任何状态迁移
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Downloading => write!(f, "downloading"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 一个已提交的下载任务及其最新已知状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    // 服务端接受任意字符串，无法识别的标签按默认值处理
    #[serde(default, deserialize_with = "lenient_label")]
    pub mode: DownloadMode,
    #[serde(default, deserialize_with = "lenient_label")]
    pub quality: Quality,
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: f64,
    pub created_at: NaiveDateTime,

    // 以下字段由后续轮询按需填充
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// 提交成功后、首次刷新之前使用的占位记录
    pub fn provisional(
        id: TaskId,
        url: impl Into<String>,
        mode: DownloadMode,
        quality: Quality,
        download_path: Option<String>,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            mode,
            quality,
            status: TaskStatus::Starting,
            progress: 0.0,
            created_at: chrono::Local::now().naive_local(),
            playlist_title: None,
            video_count: None,
            current_file: None,
            download_path,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 进度限制在 [0, 100]
    pub fn clamped_progress(&self) -> f64 {
        if self.progress.is_nan() {
            0.0
        } else {
            self.progress.clamp(0.0, 100.0)
        }
    }
}

// -----------------------------------------------------------------------------------------------

/// 链接预览信息，仅对当前输入的链接有效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    // yt-dlp 对部分自动生成的播放列表给出 null
    #[serde(default, deserialize_with = "null_as_default")]
    pub uploader: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail: String,
    pub is_playlist: bool,
    #[serde(default = "default_video_count")]
    pub video_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(
        default,
        rename = "playlist_description",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

fn default_video_count() -> u32 {
    1
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_label<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(T::default());
    };
    Ok(raw.parse().unwrap_or_else(|_| {
        warn!(label = %raw, "无法识别的任务标签，按默认值处理");
        T::default()
    }))
}

// ---------------------------------------- 请求 / 响应 ----------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
    pub mode: DownloadMode,
    pub quality: Quality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub download_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailableQualities {
    #[serde(default)]
    pub video_qualities: Vec<u32>,
    #[serde(default)]
    pub audio_qualities: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub downloads_folder: String,
    #[serde(default)]
    pub active_downloads: usize,
    #[serde(default)]
    pub total_downloads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub remaining: usize,
}

/// 服务端统一的错误响应体 `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
