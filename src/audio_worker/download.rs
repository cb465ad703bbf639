//! 远程音频拉取与离线下载
//!
//! 下载文件固定为 `{data_dir}/downloads/{id}.mp4`（id 经转义）；先写 `.part` 再 rename，
//! 中途失败不会留下半截文件。

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::domain::model::Song;
use crate::domain::stream::best_remote_url;
use crate::error::DownloadError;

const DOWNLOADS_DIR: &str = "downloads";

pub fn build_http_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<reqwest::Client, DownloadError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()?;
    Ok(client)
}

/// 把 `url` 的响应体流式写入 `out_path`，返回写入字节数
pub async fn fetch_to_path(
    http: &reqwest::Client,
    url: &str,
    out_path: &Path,
) -> Result<u64, DownloadError> {
    let resp = http.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::StatusCode {
            status,
            url: url.to_owned(),
        });
    }

    let file_err = |source| DownloadError::File {
        path: out_path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::create(out_path).await.map_err(file_err)?;
    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        file.write_all(&bytes).await.map_err(file_err)?;
        written = written.saturating_add(bytes.len() as u64);
    }
    file.flush().await.map_err(file_err)?;
    Ok(written)
}

#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
    dir: PathBuf,
    qualities: Vec<String>,
}

impl Downloader {
    pub fn new(data_dir: &Path, http: reqwest::Client, qualities: Vec<String>) -> Self {
        Self {
            http,
            dir: data_dir.join(DOWNLOADS_DIR),
            qualities,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, song_id: &str) -> PathBuf {
        self.dir.join(format!("{}.mp4", file_stem(song_id)))
    }

    /// 下载到本地，返回 `file://` 形式的本地地址
    pub async fn download_song(&self, song: &Song) -> Result<String, DownloadError> {
        let Some(url) = best_remote_url(song, &self.qualities) else {
            return Err(DownloadError::NoStreamUrl {
                song_id: song.id.clone(),
            });
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DownloadError::File {
                path: self.dir.clone(),
                source,
            })?;

        let out_path = self.path_for(&song.id);
        let part_path = out_path.with_extension("mp4.part");
        tracing::info!(song_id = %song.id, url, path = %out_path.display(), "开始下载");

        let bytes = match fetch_to_path(&self.http, url, &part_path).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&part_path, &out_path)
            .await
            .map_err(|source| DownloadError::File {
                path: out_path.clone(),
                source,
            })?;

        tracing::info!(song_id = %song.id, bytes, "下载完成");
        Ok(format!("file://{}", out_path.display()))
    }

    /// 删除失败只记日志
    pub async fn delete_file(&self, local_uri: &str) {
        let path = local_uri.strip_prefix("file://").unwrap_or(local_uri);
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::info!(path, "已删除下载文件"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path, "下载文件已不存在");
            }
            Err(e) => tracing::warn!(path, err = %e, "删除下载文件失败"),
        }
    }
}

/// id 转成文件名：安全字符原样保留，其余字节写成 `%XX`
///
/// `%` 本身也会被转义，不同 id 不会映射到同一个文件。
fn file_stem(song_id: &str) -> String {
    let mut out = String::with_capacity(song_id.len());
    for b in song_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
