use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::stream::default_stream_qualities;
use crate::player_state::DEFAULT_RECENTLY_PLAYED_MAX;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSettings {
    // 播放器设置
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f32,
    #[serde(default = "default_recently_played_max")]
    pub recently_played_max: usize,

    // 网络设置
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_http_connect_timeout_secs")]
    pub http_connect_timeout_secs: u64,
    /// 音质优先级，从高到低
    #[serde(default = "default_stream_qualities")]
    pub stream_qualities: Vec<String>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            status_interval_ms: 250,
            playback_rate: 1.0,
            recently_played_max: DEFAULT_RECENTLY_PLAYED_MAX,

            http_timeout_secs: 30,
            http_connect_timeout_secs: 10,
            stream_qualities: default_stream_qualities(),
        }
    }
}

impl PlayerSettings {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(20))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http_connect_timeout_secs)
    }

    /// 非法倍速退回 1.0
    pub fn effective_playback_rate(&self) -> f32 {
        if self.playback_rate.is_finite() && self.playback_rate > 0.0 {
            self.playback_rate
        } else {
            1.0
        }
    }
}

// 默认值函数（用于 serde default）
fn default_status_interval_ms() -> u64 { 250 }
fn default_playback_rate() -> f32 { 1.0 }
fn default_recently_played_max() -> usize { DEFAULT_RECENTLY_PLAYED_MAX }
fn default_http_timeout_secs() -> u64 { 30 }
fn default_http_connect_timeout_secs() -> u64 { 10 }

pub fn load_settings(data_dir: &Path) -> PlayerSettings {
    let p = settings_path(data_dir);
    let Ok(bytes) = fs::read(&p) else {
        return PlayerSettings::default();
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        tracing::warn!(path = %p.display(), err = %e, "settings.json 解析失败，使用默认设置");
        PlayerSettings::default()
    })
}

pub fn save_settings(data_dir: &Path, s: &PlayerSettings) -> std::io::Result<()> {
    fs::create_dir_all(data_dir)?;
    let p = settings_path(data_dir);
    let tmp = p.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(s).unwrap_or_else(|_| b"{}".to_vec());
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, &p) {
        let _ = fs::remove_file(&p);
        fs::rename(&tmp, &p).map_err(|_| e)?;
    }
    Ok(())
}

/// 平台数据目录；拿不到时退回系统临时目录下的 `pocket-player`
pub fn default_data_dir() -> PathBuf {
    data_dir_or_temp(ProjectDirs::from("dev", "pocket-player", "pocket-player"))
}

fn data_dir_or_temp(dirs: Option<ProjectDirs>) -> PathBuf {
    dirs.map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("pocket-player"))
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}
