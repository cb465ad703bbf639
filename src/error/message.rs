//! 跨 Actor 边界的错误类型
//!
//! `PlaybackError` 等持有 `std::io::Error`/`reqwest::Error`，不能 Clone；
//! 发给 UI 的事件里只保留分类、可读信息和是否值得重试。

use std::fmt;

use super::{DownloadError, PlaybackError, StorageError, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageErrorKind {
    Playback,
    Transport,
    Download,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageError {
    pub kind: MessageErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<&PlaybackError> for MessageError {
    fn from(err: &PlaybackError) -> Self {
        let kind = match err {
            PlaybackError::NoStreamUrl { .. } => MessageErrorKind::Playback,
            PlaybackError::Transport(_) => MessageErrorKind::Transport,
        };
        Self {
            kind,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<PlaybackError> for MessageError {
    fn from(err: PlaybackError) -> Self {
        MessageError::from(&err)
    }
}

impl From<TransportError> for MessageError {
    fn from(err: TransportError) -> Self {
        Self {
            kind: MessageErrorKind::Transport,
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

impl From<DownloadError> for MessageError {
    fn from(err: DownloadError) -> Self {
        Self {
            kind: MessageErrorKind::Download,
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for MessageError {
    fn from(err: StorageError) -> Self {
        Self {
            kind: MessageErrorKind::Storage,
            retryable: err.is_retryable(),
            message: err.to_string(),
        }
    }
}
