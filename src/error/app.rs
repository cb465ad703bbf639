//! 应用通用错误

use super::{DownloadError, PlaybackError, StorageError, TransportError};

/// 应用通用错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("JSON 序列化失败: {0}")]
    Serde(#[from] serde_json::Error),

    /// 持久化错误
    #[error("持久化错误: {0}")]
    Storage(#[from] StorageError),

    /// 播放错误
    #[error("播放错误: {0}")]
    Playback(#[from] PlaybackError),

    /// 音频设备或音频线程错误
    #[error("音频错误: {0}")]
    Transport(#[from] TransportError),

    /// 下载错误
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),

    /// 其他错误
    #[error("{0}")]
    Other(String),
}
