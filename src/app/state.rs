use serde::{Deserialize, Serialize};

use crate::domain::model::Song;

/// 到达队列边界时的行为
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// off → all → one → off
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "不循环",
            RepeatMode::All => "列表循环",
            RepeatMode::One => "单曲循环",
        }
    }
}

/// 传输层当前状态的镜像，只由控制器写入
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransportSnapshot {
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// 发给 UI 的只读快照
#[derive(Debug, Clone, Default)]
pub struct PlaybackSnapshot {
    pub current_song: Option<Song>,
    pub current_index: usize,
    pub queue: Vec<Song>,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub transport: TransportSnapshot,
    pub downloaded: Vec<Song>,
}

impl PlaybackSnapshot {
    pub fn progress_label(&self) -> String {
        format!(
            "{} / {}",
            format_ms(self.transport.position_ms),
            format_ms(self.transport.duration_ms)
        )
    }
}

/// 毫秒 → `m:ss`
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
