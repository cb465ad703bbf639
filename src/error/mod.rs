//! 统一错误处理模块
//!
//! 提供项目中所有模块的结构化错误类型，替代 String 错误。

mod app;
mod download;
mod message;
mod playback;
mod storage;
mod transport;

pub use app::AppError;
pub use download::DownloadError;
pub use message::{MessageError, MessageErrorKind};
pub use playback::PlaybackError;
pub use storage::StorageError;
pub use transport::TransportError;
