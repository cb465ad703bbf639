mod common;

use common::song;
use pocket_player::audio_worker::{Downloader, fetch_to_path};
use pocket_player::domain::model::{MediaVariant, Song};
use pocket_player::domain::stream::default_stream_qualities;
use pocket_player::error::DownloadError;
use std::fs;

fn song_at(server_url: &str, id: &str) -> Song {
    Song {
        streams: vec![
            MediaVariant::new("12kbps", format!("{server_url}/{id}_12.mp4")),
            MediaVariant::new("160kbps", format!("{server_url}/{id}_160.mp4")),
        ],
        ..song(id)
    }
}

#[tokio::test]
async fn download_song_writes_best_quality_to_downloads_dir() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/abc_160.mp4")
        .with_status(200)
        .with_body(b"fake-audio-bytes")
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = Downloader::new(dir.path(), reqwest::Client::new(), default_stream_qualities());
    let local_uri = downloader
        .download_song(&song_at(&server.url(), "abc"))
        .await
        .expect("download");

    mock.assert_async().await;
    let path = dir.path().join("downloads").join("abc.mp4");
    assert_eq!(local_uri, format!("file://{}", path.display()));
    assert_eq!(fs::read(&path).expect("read"), b"fake-audio-bytes");
    assert!(!dir.path().join("downloads").join("abc.mp4.part").exists());

    downloader.delete_file(&local_uri).await;
    assert!(!path.exists());
    // 再删一次只记日志
    downloader.delete_file(&local_uri).await;
}

#[tokio::test]
async fn download_http_error_leaves_no_file() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gone_160.mp4")
        .with_status(503)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = Downloader::new(dir.path(), reqwest::Client::new(), default_stream_qualities());
    let err = downloader
        .download_song(&song_at(&server.url(), "gone"))
        .await
        .expect_err("should fail");

    assert!(matches!(err, DownloadError::StatusCode { .. }));
    assert!(err.is_retryable());
    assert!(!downloader.path_for("gone").exists());
    assert!(!dir.path().join("downloads").join("gone.mp4.part").exists());
}

#[tokio::test]
async fn download_without_streams_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = Downloader::new(dir.path(), reqwest::Client::new(), default_stream_qualities());
    let bare = Song {
        id: "bare".to_owned(),
        ..Default::default()
    };
    let err = downloader.download_song(&bare).await.expect_err("no url");
    assert!(matches!(err, DownloadError::NoStreamUrl { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn fetch_to_path_counts_bytes() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/raw")
        .with_status(200)
        .with_body(vec![7u8; 4096])
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("raw.bin");
    let written = fetch_to_path(&reqwest::Client::new(), &format!("{}/raw", server.url()), &out)
        .await
        .expect("fetch");
    assert_eq!(written, 4096);
    assert_eq!(fs::metadata(&out).expect("meta").len(), 4096);
}

#[tokio::test]
async fn similar_ids_get_separate_files() {
    let mut server = mockito::Server::new_async().await;
    let dotted = server
        .mock("GET", "/a.b_160.mp4")
        .with_status(200)
        .with_body(b"dotted")
        .create_async()
        .await;
    let underscored = server
        .mock("GET", "/a_b_160.mp4")
        .with_status(200)
        .with_body(b"underscored")
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let downloader = Downloader::new(dir.path(), reqwest::Client::new(), default_stream_qualities());
    let dotted_uri = downloader
        .download_song(&song_at(&server.url(), "a.b"))
        .await
        .expect("download a.b");
    let underscored_uri = downloader
        .download_song(&song_at(&server.url(), "a_b"))
        .await
        .expect("download a_b");

    dotted.assert_async().await;
    underscored.assert_async().await;
    assert_ne!(dotted_uri, underscored_uri);
    assert_eq!(fs::read(downloader.path_for("a.b")).expect("read"), b"dotted");
    assert_eq!(fs::read(downloader.path_for("a_b")).expect("read"), b"underscored");

    downloader.delete_file(&dotted_uri).await;
    assert!(!downloader.path_for("a.b").exists());
    assert_eq!(fs::read(downloader.path_for("a_b")).expect("read"), b"underscored");
}
