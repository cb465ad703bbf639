use tokio::sync::oneshot;

use crate::error::TransportError;

/// 传输层推送的状态；每个 tick 或终止事件一条
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportStatus {
    /// 产生这条状态的音频流；已被替换的流发出的状态由控制器丢弃
    pub stream_id: u64,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    /// 自然播放结束（不是 stop/unload）
    pub did_finish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedStream {
    pub stream_id: u64,
    pub duration_ms: Option<u64>,
}

pub(super) type Reply<T> = oneshot::Sender<Result<T, TransportError>>;

#[derive(Debug)]
pub(super) enum TransportCommand {
    Load { uri: String, reply: Reply<LoadedStream> },
    Play { reply: Reply<()> },
    Pause { reply: Reply<()> },
    Stop { reply: Reply<()> },
    SeekToMs { ms: u64, reply: Reply<()> },
    SetRate { rate: f32, reply: Reply<()> },
    Unload { reply: Reply<()> },
}
