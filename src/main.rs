mod cli;
mod console;

use clap::Parser;
use cli::{Cli, Command};
use pocket_player::domain::model::Song;
use pocket_player::error::AppError;
use pocket_player::logging;
use pocket_player::player_state::{FileStore, KeyValueStore, load_persisted_state, load_recently_played};
use pocket_player::settings::{default_data_dir, load_settings};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    let _log_guard = logging::init(
        &data_dir,
        logging::LogConfig {
            dir: cli.log_dir.clone(),
            filter: cli.log_filter.clone(),
        },
    );
    tracing::info!(data_dir = %data_dir.display(), no_audio = cli.no_audio, "pocket-player 启动");

    let settings = load_settings(&data_dir);
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&data_dir));

    match cli.command {
        Command::Play { paths, start } => {
            let songs = load_songs(&paths)?;
            if songs.is_empty() {
                return Err(AppError::Other("没有可播放的歌曲".to_owned()));
            }
            console::run(
                console::Startup::Queue {
                    songs,
                    start_index: start,
                },
                cli.no_audio,
                &data_dir,
                settings,
                storage,
            )
            .await
        }
        Command::Resume => {
            console::run(console::Startup::Resume, cli.no_audio, &data_dir, settings, storage).await
        }
        Command::Status => {
            let state = load_persisted_state(storage.as_ref());
            println!(
                "随机: {}  循环: {}  当前: {}",
                if state.shuffle { "开" } else { "关" },
                state.repeat.label(),
                state.current_index
            );
            for (i, song) in state.queue.iter().enumerate() {
                let marker = if i == state.current_index { ">" } else { " " };
                println!("{marker} {i:>3}. {}", song.display_title());
            }
            if !state.downloaded.is_empty() {
                println!("已下载 {} 首", state.downloaded.len());
            }
            Ok(())
        }
        Command::Recent => {
            for (i, song) in load_recently_played(storage.as_ref()).iter().enumerate() {
                println!("{:>3}. {}", i + 1, song.display_title());
            }
            Ok(())
        }
        Command::Clear => {
            storage.clear()?;
            tracing::info!("已清空播放状态");
            println!("已清空播放状态");
            Ok(())
        }
    }
}

/// `.json` 按歌曲列表解析，其他按本地音频文件处理
fn load_songs(paths: &[PathBuf]) -> Result<Vec<Song>, AppError> {
    let mut songs = Vec::new();
    for path in paths {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let bytes = std::fs::read(path)?;
            let list: Vec<Song> = serde_json::from_slice(&bytes)?;
            songs.extend(list);
        } else {
            let path = std::fs::canonicalize(path)?;
            songs.push(Song::from_local_file(&path));
        }
    }
    Ok(songs)
}
