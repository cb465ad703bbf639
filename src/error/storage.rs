//! 播放状态持久化相关错误

use std::path::PathBuf;

/// 持久化错误类型
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("JSON 序列化失败: {0}")]
    Serde(#[from] serde_json::Error),

    /// 版本不兼容
    #[error("版本不兼容: 预期 {expected}, 找到 {found}")]
    IncompatibleVersion { expected: u8, found: u8 },

    /// 状态目录不可用
    #[error("状态目录不可用: {0}")]
    DirUnavailable(PathBuf),
}

impl StorageError {
    /// 判断是否是可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}
