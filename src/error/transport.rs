//! 音频传输层相关错误

use std::path::PathBuf;

/// 传输层错误类型
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 音频输出流创建失败
    #[error("创建音频输出流失败: {0}")]
    OutputStream(String),

    /// 拉取远程音频失败
    #[error("拉取音频失败({uri}): {message}")]
    Fetch { uri: String, message: String },

    /// 打开音频文件失败
    #[error("打开音频文件失败({path}): {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 解码音频失败
    #[error("解码音频失败({uri}): {message}")]
    Decode { uri: String, message: String },

    /// Seek 失败
    #[error("Seek 失败: {0}")]
    Seek(String),

    /// 当前没有已加载的音频
    #[error("没有已加载的音频")]
    NotLoaded,

    /// 传输线程已退出
    #[error("音频线程已退出")]
    WorkerGone,
}

impl TransportError {
    /// 判断是否是可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Fetch { .. } | TransportError::Seek(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::OutputStream("无法打开默认设备".to_string());
        assert_eq!(err.to_string(), "创建音频输出流失败: 无法打开默认设备");
    }

    #[test]
    fn test_is_retryable() {
        let fetch = TransportError::Fetch {
            uri: "https://cdn/a.mp4".to_string(),
            message: "timeout".to_string(),
        };
        assert!(fetch.is_retryable());
        assert!(!TransportError::NotLoaded.is_retryable());
        assert!(!TransportError::WorkerGone.is_retryable());
    }

    #[test]
    fn test_open_file_error_keeps_source() {
        use std::error::Error;
        let err = TransportError::OpenFile {
            path: PathBuf::from("/music/missing.mp4"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "文件未找到"),
        };
        assert!(err.to_string().contains("missing.mp4"));
        assert!(err.source().is_some());
    }
}
