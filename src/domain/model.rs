use serde::{Deserialize, Serialize};
use std::path::Path;

/// 封面或音频流的一个质量档位
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaVariant {
    pub quality: String,
    /// 目录服务有时返回 `link`，有时返回 `url`
    #[serde(alias = "link")]
    pub url: String,
}

impl MediaVariant {
    pub fn new(quality: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            url: url.into(),
        }
    }
}

/// 目录服务返回的歌曲；拿到后视为不可变值
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist_display_name: String,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub artwork: Vec<MediaVariant>,
    #[serde(default)]
    pub streams: Vec<MediaVariant>,
    /// 下载完成后的本地文件 URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_uri: Option<String>,
}

impl Song {
    pub fn display_title(&self) -> String {
        if self.artist_display_name.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist_display_name)
        }
    }

    pub fn is_downloaded(&self) -> bool {
        self.local_uri.is_some()
    }

    pub fn with_local_uri(mut self, uri: impl Into<String>) -> Self {
        self.local_uri = Some(uri.into());
        self
    }

    /// 本地音频文件：文件名作为 id 和标题
    pub fn from_local_file(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: stem.clone(),
            title: stem,
            local_uri: Some(format!("file://{}", path.display())),
            ..Default::default()
        }
    }

    pub fn artwork_url(&self, quality: &str) -> Option<&str> {
        self.artwork
            .iter()
            .find(|v| v.quality == quality)
            .or_else(|| self.artwork.first())
            .map(|v| v.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_local_file() {
        let song = Song::from_local_file(Path::new("/music/Blue Train.mp3"));
        assert_eq!(song.id, "Blue Train");
        assert_eq!(song.title, "Blue Train");
        assert_eq!(song.local_uri.as_deref(), Some("file:///music/Blue Train.mp3"));
        assert!(song.streams.is_empty());
    }

    #[test]
    fn test_song_accepts_link_alias() {
        let json = r#"{
            "id": "abc",
            "title": "Song",
            "artistDisplayName": "Artist",
            "durationSeconds": 200,
            "streams": [{"quality": "320kbps", "link": "https://cdn/a_320.mp4"}]
        }"#;
        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.streams[0].url, "https://cdn/a_320.mp4");
        assert!(song.artwork.is_empty());
        assert!(!song.is_downloaded());
    }

    #[test]
    fn test_display_title() {
        let mut song = Song {
            id: "1".to_owned(),
            title: "Track".to_owned(),
            ..Default::default()
        };
        assert_eq!(song.display_title(), "Track");
        song.artist_display_name = "Someone".to_owned();
        assert_eq!(song.display_title(), "Track - Someone");
    }

    #[test]
    fn test_artwork_url_falls_back_to_first() {
        let song = Song {
            id: "1".to_owned(),
            artwork: vec![
                MediaVariant::new("50x50", "small"),
                MediaVariant::new("500x500", "large"),
            ],
            ..Default::default()
        };
        assert_eq!(song.artwork_url("500x500"), Some("large"));
        assert_eq!(song.artwork_url("150x150"), Some("small"));
    }
}
