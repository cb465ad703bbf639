//! 播放地址选择

use super::model::Song;

/// 默认的音质优先级（从高到低）
pub const DEFAULT_STREAM_QUALITIES: [&str; 5] = ["320kbps", "160kbps", "96kbps", "48kbps", "12kbps"];

pub fn default_stream_qualities() -> Vec<String> {
    DEFAULT_STREAM_QUALITIES
        .iter()
        .map(|q| (*q).to_owned())
        .collect()
}

/// 按优先级挑选远程音频地址；没有命中任何档位时退回列表第一项
pub fn best_remote_url<'a>(song: &'a Song, qualities: &[String]) -> Option<&'a str> {
    if song.streams.is_empty() {
        return None;
    }
    qualities
        .iter()
        .find_map(|q| song.streams.iter().find(|v| &v.quality == q))
        .or_else(|| song.streams.first())
        .map(|v| v.url.as_str())
        .filter(|url| !url.is_empty())
}

/// 本地文件优先，其次是最高音质的远程地址
pub fn resolve_stream_uri<'a>(song: &'a Song, qualities: &[String]) -> Option<&'a str> {
    song.local_uri
        .as_deref()
        .filter(|uri| !uri.is_empty())
        .or_else(|| best_remote_url(song, qualities))
}
