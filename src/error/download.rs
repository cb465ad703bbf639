//! 下载相关错误

use reqwest::StatusCode;
use std::path::PathBuf;

/// 下载错误类型
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// 歌曲没有可下载的地址
    #[error("歌曲没有可下载的地址: {song_id}")]
    NoStreamUrl { song_id: String },

    /// 没有配置下载器（例如 HTTP 客户端创建失败）
    #[error("下载功能不可用")]
    Unavailable,

    /// HTTP 请求错误
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 状态码错误
    #[error("HTTP 状态码 {status}: {url}")]
    StatusCode { status: StatusCode, url: String },

    /// 文件读写失败
    #[error("文件操作失败({path}): {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::Http(_) => true,
            DownloadError::StatusCode { status, .. } => {
                *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
            }
            DownloadError::NoStreamUrl { .. }
            | DownloadError::Unavailable
            | DownloadError::File { .. } => false,
        }
    }
}
