use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::messages::{LoadedStream, TransportStatus};
use super::transport::Transport;
use crate::error::TransportError;

/// 传输层收到的调用，按顺序记录
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Load(String),
    Play,
    Pause,
    Stop,
    SeekTo(u64),
    SetRate(f32),
    Unload,
}

#[derive(Debug, Clone, Copy)]
struct NullStream {
    stream_id: u64,
    playing: bool,
    position_ms: u64,
    duration_ms: u64,
}

#[derive(Debug, Default)]
struct NullState {
    calls: Vec<TransportCall>,
    loaded_uri: Option<String>,
    stream: Option<NullStream>,
    next_stream_id: u64,
    fail_uris: Vec<String>,
    duration_ms: Option<u64>,
}

/// 不出声的传输层：`--no-audio` 模式和测试使用
///
/// 不会自己推进进度；需要时通过 [`NullTransportHandle`] 注入状态。
pub struct NullTransport {
    state: Arc<Mutex<NullState>>,
    tx_status: mpsc::UnboundedSender<TransportStatus>,
    rx_status: Option<mpsc::UnboundedReceiver<TransportStatus>>,
}

/// 从外部观察和驱动 [`NullTransport`]
#[derive(Clone)]
pub struct NullTransportHandle {
    state: Arc<Mutex<NullState>>,
    tx_status: mpsc::UnboundedSender<TransportStatus>,
}

fn lock(state: &Mutex<NullState>) -> MutexGuard<'_, NullState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NullTransport {
    pub fn new() -> Self {
        let (tx_status, rx_status) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(NullState {
                next_stream_id: 1,
                ..Default::default()
            })),
            tx_status,
            rx_status: Some(rx_status),
        }
    }

    pub fn handle(&self) -> NullTransportHandle {
        NullTransportHandle {
            state: Arc::clone(&self.state),
            tx_status: self.tx_status.clone(),
        }
    }

    fn with_stream(
        &self,
        call: TransportCall,
        f: impl FnOnce(&mut NullStream),
    ) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.calls.push(call);
        let stream = state.stream.as_mut().ok_or(TransportError::NotLoaded)?;
        f(stream);
        let status = TransportStatus {
            stream_id: stream.stream_id,
            is_playing: stream.playing,
            position_ms: stream.position_ms,
            duration_ms: stream.duration_ms,
            did_finish: false,
        };
        let _ = self.tx_status.send(status);
        Ok(())
    }
}

impl Default for NullTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for NullTransport {
    async fn load(&mut self, uri: &str) -> Result<LoadedStream, TransportError> {
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::Load(uri.to_owned()));
        state.stream = None;
        state.loaded_uri = None;
        if state.fail_uris.iter().any(|u| u == uri) {
            return Err(TransportError::Decode {
                uri: uri.to_owned(),
                message: "rejected by null transport".to_owned(),
            });
        }

        let stream_id = state.next_stream_id;
        state.next_stream_id += 1;
        let duration_ms = state.duration_ms;
        state.stream = Some(NullStream {
            stream_id,
            playing: false,
            position_ms: 0,
            duration_ms: duration_ms.unwrap_or(0),
        });
        state.loaded_uri = Some(uri.to_owned());
        tracing::debug!(stream_id, uri, "NullTransport: load");
        Ok(LoadedStream {
            stream_id,
            duration_ms,
        })
    }

    async fn play(&mut self) -> Result<(), TransportError> {
        self.with_stream(TransportCall::Play, |s| s.playing = true)
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.with_stream(TransportCall::Pause, |s| s.playing = false)
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        self.with_stream(TransportCall::Stop, |s| {
            s.playing = false;
            s.position_ms = 0;
        })
    }

    async fn seek_to(&mut self, position_ms: u64) -> Result<(), TransportError> {
        self.with_stream(TransportCall::SeekTo(position_ms), |s| {
            s.position_ms = position_ms;
        })
    }

    async fn set_rate(&mut self, rate: f32) -> Result<(), TransportError> {
        lock(&self.state).calls.push(TransportCall::SetRate(rate));
        Ok(())
    }

    async fn unload(&mut self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.calls.push(TransportCall::Unload);
        state.stream = None;
        state.loaded_uri = None;
        Ok(())
    }

    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<TransportStatus>> {
        self.rx_status.take()
    }
}

impl NullTransportHandle {
    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.state).calls.clone()
    }

    pub fn loaded_uri(&self) -> Option<String> {
        lock(&self.state).loaded_uri.clone()
    }

    pub fn current_stream_id(&self) -> Option<u64> {
        lock(&self.state).stream.map(|s| s.stream_id)
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).stream.is_some_and(|s| s.playing)
    }

    /// 之后加载这个地址都会失败
    pub fn fail_uri(&self, uri: &str) {
        lock(&self.state).fail_uris.push(uri.to_owned());
    }

    /// 之后加载的音频报告这个时长
    pub fn set_duration_ms(&self, duration_ms: Option<u64>) {
        lock(&self.state).duration_ms = duration_ms;
    }

    /// 推送一条进度
    pub fn tick(&self, position_ms: u64) {
        let mut state = lock(&self.state);
        let Some(stream) = state.stream.as_mut() else {
            return;
        };
        stream.position_ms = position_ms;
        let status = TransportStatus {
            stream_id: stream.stream_id,
            is_playing: stream.playing,
            position_ms,
            duration_ms: stream.duration_ms,
            did_finish: false,
        };
        let _ = self.tx_status.send(status);
    }

    /// 模拟当前音频自然播放结束
    pub fn finish(&self) {
        let mut state = lock(&self.state);
        let Some(stream) = state.stream.as_mut() else {
            return;
        };
        stream.playing = false;
        stream.position_ms = stream.duration_ms;
        let status = TransportStatus {
            stream_id: stream.stream_id,
            is_playing: false,
            position_ms: stream.duration_ms,
            duration_ms: stream.duration_ms,
            did_finish: true,
        };
        let _ = self.tx_status.send(status);
    }

    /// 直接推送任意状态（用于模拟过期事件）
    pub fn send_status(&self, status: TransportStatus) {
        let _ = self.tx_status.send(status);
    }
}
