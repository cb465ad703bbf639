use async_trait::async_trait;
use tokio::sync::mpsc;

use super::messages::{LoadedStream, TransportStatus};
use crate::error::TransportError;

/// 单音频流传输层
///
/// 任意时刻最多持有一个已加载的资源；`load` 必须先释放旧资源。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn load(&mut self, uri: &str) -> Result<LoadedStream, TransportError>;
    async fn play(&mut self) -> Result<(), TransportError>;
    async fn pause(&mut self) -> Result<(), TransportError>;
    /// 暂停并回到开头，资源保持加载
    async fn stop(&mut self) -> Result<(), TransportError>;
    async fn seek_to(&mut self, position_ms: u64) -> Result<(), TransportError>;
    async fn set_rate(&mut self, rate: f32) -> Result<(), TransportError>;
    async fn unload(&mut self) -> Result<(), TransportError>;

    /// 状态通道只能取一次
    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<TransportStatus>>;
}

/// `file:///a/b.mp4` → `/a/b.mp4`；远程地址返回 None
pub fn local_path_from_uri(uri: &str) -> Option<&str> {
    if is_remote_uri(uri) {
        return None;
    }
    Some(uri.strip_prefix("file://").unwrap_or(uri))
}

pub fn is_remote_uri(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}
