//! 播放控制相关错误

use super::TransportError;

/// `load_and_play` 及播放控制失败的原因
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// 歌曲没有任何可用的播放地址
    #[error("歌曲没有可用的播放地址: {song_id}")]
    NoStreamUrl { song_id: String },

    /// 传输层拒绝了加载或播放
    #[error("音频传输失败: {0}")]
    Transport(#[from] TransportError),
}

impl PlaybackError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PlaybackError::NoStreamUrl { .. } => false,
            PlaybackError::Transport(e) => e.is_retryable(),
        }
    }
}
