//! 命令行交互：一行一个命令，驱动播放 Actor

use pocket_player::app::PlaybackSnapshot;
use pocket_player::audio_worker::{
    Downloader, NullTransport, RodioTransport, Transport, TransportConfig, build_http_client,
};
use pocket_player::core::{PlayerDeps, spawn_player_actor};
use pocket_player::domain::model::Song;
use pocket_player::error::AppError;
use pocket_player::messages::{PlayerCommand, PlayerEvent};
use pocket_player::player_state::{KeyValueStore, PersistHandle, spawn_persister};
use pocket_player::settings::PlayerSettings;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;

const SEEK_STEP_MS: u64 = 10_000;

const HELP: &str = "\
命令: [回车]/t 播放/暂停  n 下一首  p 上一首  x 停止  +/- 快进/快退
      j <序号> 跳转  rm <序号> 删除  mv <从> <到> 移动  c 清空队列
      s 随机  r 循环  rate <倍速>  d 下载当前  dd 删除当前下载
      i 状态  l 队列  recent 最近播放  q 退出";

pub enum Startup {
    Queue { songs: Vec<Song>, start_index: usize },
    Resume,
}

type Channels = (mpsc::Sender<PlayerCommand>, mpsc::Receiver<PlayerEvent>);

fn spawn_with<T: Transport + 'static>(
    transport: T,
    persist: PersistHandle,
    downloader: Option<Downloader>,
    settings: &PlayerSettings,
) -> Channels {
    spawn_player_actor(PlayerDeps {
        transport,
        persist,
        downloader,
        stream_qualities: settings.stream_qualities.clone(),
        playback_rate: settings.effective_playback_rate(),
    })
}

pub async fn run(
    startup: Startup,
    no_audio: bool,
    data_dir: &Path,
    settings: PlayerSettings,
    storage: Arc<dyn KeyValueStore>,
) -> Result<(), AppError> {
    let persist = spawn_persister(storage, settings.recently_played_max);
    let http = build_http_client(settings.http_timeout(), settings.http_connect_timeout())?;
    let downloader = Downloader::new(data_dir, http.clone(), settings.stream_qualities.clone());

    let (tx, mut rx) = if no_audio {
        tracing::info!("音频后端: Null");
        spawn_with(NullTransport::new(), persist, Some(downloader), &settings)
    } else {
        let config = TransportConfig {
            status_interval: settings.status_interval(),
            playback_rate: settings.effective_playback_rate(),
            http,
        };
        match RodioTransport::spawn(config) {
            Ok(transport) => spawn_with(transport, persist, Some(downloader), &settings),
            Err(e) => {
                tracing::error!(err = %e, "音频设备不可用，改用静音模式");
                eprintln!("音频设备不可用（{e}），改用静音模式");
                spawn_with(NullTransport::new(), persist, Some(downloader), &settings)
            }
        }
    };

    let startup_cmds = match startup {
        Startup::Queue { songs, start_index } => vec![
            PlayerCommand::Bootstrap,
            PlayerCommand::SetQueue { songs, start_index },
        ],
        Startup::Resume => vec![PlayerCommand::Bootstrap, PlayerCommand::TogglePause],
    };
    for cmd in startup_cmds {
        send(&tx, cmd).await?;
    }
    println!("{HELP}");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_closed = false;
    let mut last: Option<PlaybackSnapshot> = None;

    loop {
        select! {
            _ = tokio::signal::ctrl_c() => {
                send(&tx, PlayerCommand::Quit).await?;
            }
            line = stdin.next_line(), if !stdin_closed => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        "h" | "help" => println!("{HELP}"),
                        "i" => print_status(last.as_ref()),
                        "l" => print_queue(last.as_ref()),
                        input => match parse_input(input, last.as_ref()) {
                            Some(cmd) => send(&tx, cmd).await?,
                            None => println!("未知命令: {input}（h 查看帮助）"),
                        },
                    },
                    Ok(None) | Err(_) => {
                        stdin_closed = true;
                    }
                }
            }
            maybe_evt = rx.recv() => {
                let Some(evt) = maybe_evt else {
                    break;
                };
                match evt {
                    PlayerEvent::State(snapshot) => {
                        let prev_id = last
                            .as_ref()
                            .and_then(|s| s.current_song.as_ref())
                            .map(|s| s.id.clone());
                        let now = snapshot.current_song.as_ref();
                        if now.map(|s| &s.id) != prev_id.as_ref()
                            && let Some(song) = now
                        {
                            println!("▶ {}", song.display_title());
                        }
                        last = Some(*snapshot);
                    }
                    PlayerEvent::Error(e) => eprintln!("错误: {e}"),
                    PlayerEvent::Downloaded { song_id } => println!("下载完成: {song_id}"),
                    PlayerEvent::RecentlyPlayed(songs) => {
                        for (i, song) in songs.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, song.display_title());
                        }
                    }
                    PlayerEvent::Stopped => break,
                }
            }
        }
    }
    Ok(())
}

async fn send(tx: &mpsc::Sender<PlayerCommand>, cmd: PlayerCommand) -> Result<(), AppError> {
    tx.send(cmd)
        .await
        .map_err(|_| AppError::Other("播放 Actor 已退出".to_owned()))
}

fn print_status(snapshot: Option<&PlaybackSnapshot>) {
    let Some(s) = snapshot else {
        println!("（尚无状态）");
        return;
    };
    let title = s
        .current_song
        .as_ref()
        .map(Song::display_title)
        .unwrap_or_else(|| "-".to_owned());
    println!(
        "{} {}  {}  随机: {}  循环: {}",
        if s.transport.is_playing { "▶" } else { "⏸" },
        title,
        s.progress_label(),
        if s.shuffle { "开" } else { "关" },
        s.repeat.label()
    );
}

fn print_queue(snapshot: Option<&PlaybackSnapshot>) {
    let Some(s) = snapshot else {
        return;
    };
    for (i, song) in s.queue.iter().enumerate() {
        let marker = if i == s.current_index { ">" } else { " " };
        println!("{marker} {i:>3}. {}", song.display_title());
    }
}

fn parse_input(input: &str, last: Option<&PlaybackSnapshot>) -> Option<PlayerCommand> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let head = parts.first().copied().unwrap_or("");
    let arg = |i: usize| parts.get(i).and_then(|v| v.parse::<usize>().ok());

    let cmd = match head {
        "" | "t" => PlayerCommand::TogglePause,
        "n" => PlayerCommand::Next,
        "p" => PlayerCommand::Previous,
        "x" => PlayerCommand::Stop,
        "c" => PlayerCommand::ClearQueue,
        "s" => PlayerCommand::ToggleShuffle,
        "r" => PlayerCommand::ToggleRepeat,
        "q" => PlayerCommand::Quit,
        "recent" => PlayerCommand::LoadRecentlyPlayed,
        "j" => PlayerCommand::SkipTo { index: arg(1)? },
        "rm" => PlayerCommand::RemoveFromQueue { index: arg(1)? },
        "mv" => {
            let from_index = arg(1)?;
            let to_index = arg(2)?;
            PlayerCommand::ReorderQueue {
                from_index,
                to_index,
            }
        }
        "rate" => PlayerCommand::SetRate {
            rate: parts.get(1)?.parse().ok()?,
        },
        "+" | "-" => {
            let pos = last?.transport.position_ms;
            let ms = if head == "+" {
                pos.saturating_add(SEEK_STEP_MS)
            } else {
                pos.saturating_sub(SEEK_STEP_MS)
            };
            PlayerCommand::SeekToMs { ms }
        }
        "d" => PlayerCommand::DownloadSong {
            song: last?.current_song.clone()?,
        },
        "dd" => PlayerCommand::DeleteDownload {
            song_id: last?.current_song.as_ref()?.id.clone(),
        },
        _ => return None,
    };
    Some(cmd)
}
