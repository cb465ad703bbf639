use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;

use crate::app::PlaybackStore;
use crate::audio_worker::{Downloader, Transport, TransportStatus};
use crate::domain::model::Song;
use crate::error::{DownloadError, MessageError, PlaybackError};
use crate::messages::{PlayerCommand, PlayerEvent};
use crate::player_state::PersistHandle;

use super::controller::PlaybackController;

pub struct PlayerDeps<T: Transport> {
    pub transport: T,
    pub persist: PersistHandle,
    /// None 时下载命令直接报错
    pub downloader: Option<Downloader>,
    pub stream_qualities: Vec<String>,
    pub playback_rate: f32,
}

struct DownloadOutcome {
    song: Song,
    result: Result<String, DownloadError>,
}

struct PlayerActor<T: Transport> {
    store: PlaybackStore,
    controller: PlaybackController<T>,
    downloader: Option<Arc<Downloader>>,
    tx_evt: mpsc::Sender<PlayerEvent>,
    tx_download: mpsc::Sender<DownloadOutcome>,
}

pub fn spawn_player_actor<T: Transport + 'static>(
    deps: PlayerDeps<T>,
) -> (mpsc::Sender<PlayerCommand>, mpsc::Receiver<PlayerEvent>) {
    let (tx_cmd, mut rx_cmd) = mpsc::channel::<PlayerCommand>(64);
    let (tx_evt, rx_evt) = mpsc::channel::<PlayerEvent>(64);

    tokio::spawn(async move {
        let (tx_download, mut rx_download) = mpsc::channel::<DownloadOutcome>(16);
        let mut controller = PlaybackController::new(deps.transport, deps.stream_qualities)
            .with_playback_rate(deps.playback_rate);
        let mut rx_status = controller.subscribe().unwrap_or_else(|| {
            tracing::warn!("传输层状态通道已被占用，不会收到进度和结束事件");
            mpsc::unbounded_channel().1
        });
        let mut status_closed = false;

        let mut actor = PlayerActor {
            store: PlaybackStore::new(deps.persist),
            controller,
            downloader: deps.downloader.map(Arc::new),
            tx_evt,
            tx_download,
        };

        loop {
            select! {
                maybe_status = rx_status.recv(), if !status_closed => {
                    match maybe_status {
                        Some(status) => actor.handle_status(status).await,
                        None => {
                            tracing::warn!("传输层状态通道已关闭");
                            status_closed = true;
                        }
                    }
                }
                Some(outcome) = rx_download.recv() => {
                    actor.handle_download(outcome).await;
                }
                maybe_cmd = rx_cmd.recv() => {
                    let Some(cmd) = maybe_cmd else {
                        break;
                    };
                    if actor.handle_command(cmd).await {
                        break;
                    }
                }
            }
        }

        actor.shutdown().await;
    });

    (tx_cmd, rx_evt)
}

impl<T: Transport> PlayerActor<T> {
    async fn emit_state(&self) {
        let snapshot = Box::new(self.store.snapshot());
        let _ = self.tx_evt.send(PlayerEvent::State(snapshot)).await;
    }

    async fn emit_error(&self, err: MessageError) {
        let _ = self.tx_evt.send(PlayerEvent::Error(err)).await;
    }

    async fn report(&self, result: Result<(), PlaybackError>) {
        if let Err(e) = result {
            tracing::warn!(err = %e, retryable = e.is_retryable(), "播放控制失败");
            self.emit_error(MessageError::from(&e)).await;
        }
    }

    async fn handle_status(&mut self, status: TransportStatus) {
        let current = self.controller.stream_id() == Some(status.stream_id);
        let result = self
            .controller
            .handle_status(&mut self.store, status)
            .await;
        self.report(result).await;
        if current {
            self.emit_state().await;
        }
    }

    /// 播放 Store 当前指向的歌曲
    async fn play_current(&mut self) {
        let Some(song) = self.store.current_song().cloned() else {
            return;
        };
        let result = self.controller.load_and_play(&mut self.store, song).await;
        self.report(result).await;
    }

    /// 返回 true 表示退出
    async fn handle_command(&mut self, cmd: PlayerCommand) -> bool {
        tracing::debug!(?cmd, "收到播放命令");
        match cmd {
            PlayerCommand::Bootstrap => {
                self.store.initialize_from_storage();
            }
            PlayerCommand::SetQueue { songs, start_index } => {
                self.store.set_queue(songs, start_index);
                self.play_current().await;
            }
            PlayerCommand::AddToQueue { song } => {
                self.store.add_to_queue(song);
            }
            PlayerCommand::RemoveFromQueue { index } => {
                self.store.remove_from_queue(index);
            }
            PlayerCommand::ReorderQueue {
                from_index,
                to_index,
            } => {
                self.store.reorder_queue(from_index, to_index);
            }
            PlayerCommand::ClearQueue => {
                let result = self.controller.stop(&mut self.store).await;
                self.report(result).await;
                self.controller.unload(&mut self.store).await;
                self.store.clear_queue();
            }
            PlayerCommand::Next => {
                self.store.play_next();
                self.play_current().await;
            }
            PlayerCommand::Previous => {
                self.store.play_previous();
                self.play_current().await;
            }
            PlayerCommand::SkipTo { index } => {
                if index >= self.store.queue().len() {
                    tracing::debug!(index, len = self.store.queue().len(), "跳转越界，忽略");
                    return false;
                }
                self.store.skip_to_index(index);
                self.play_current().await;
            }
            PlayerCommand::PlaySong { song } => {
                let result = self.controller.load_and_play(&mut self.store, song).await;
                self.report(result).await;
            }
            PlayerCommand::TogglePause => {
                if self.store.is_playing() {
                    let result = self.controller.pause(&mut self.store).await;
                    self.report(result).await;
                } else if self.controller.is_loaded() {
                    let result = self.controller.play(&mut self.store).await;
                    self.report(result).await;
                } else {
                    // 启动恢复后还没有加载过音频
                    self.play_current().await;
                }
            }
            PlayerCommand::Play => {
                let result = self.controller.play(&mut self.store).await;
                self.report(result).await;
            }
            PlayerCommand::Pause => {
                let result = self.controller.pause(&mut self.store).await;
                self.report(result).await;
            }
            PlayerCommand::Stop => {
                let result = self.controller.stop(&mut self.store).await;
                self.report(result).await;
            }
            PlayerCommand::SeekToMs { ms } => {
                let result = self.controller.seek_to(ms).await;
                self.report(result).await;
            }
            PlayerCommand::SetRate { rate } => {
                if !rate.is_finite() || rate <= 0.0 {
                    tracing::warn!(rate, "忽略非法倍速");
                    return false;
                }
                let result = self.controller.set_rate(rate).await;
                self.report(result).await;
            }
            PlayerCommand::ToggleShuffle => {
                self.store.toggle_shuffle();
            }
            PlayerCommand::ToggleRepeat => {
                self.store.toggle_repeat();
            }
            PlayerCommand::DownloadSong { song } => {
                self.start_download(song).await;
                return false;
            }
            PlayerCommand::DeleteDownload { song_id } => {
                self.delete_download(&song_id);
            }
            PlayerCommand::LoadRecentlyPlayed => {
                // 先等排队中的写入落盘，否则读到的是旧列表
                let persist = self.store.persist().clone();
                let recent = tokio::task::spawn_blocking(move || {
                    persist.flush();
                    persist.recently_played()
                })
                .await
                .unwrap_or_default();
                let _ = self.tx_evt.send(PlayerEvent::RecentlyPlayed(recent)).await;
                return false;
            }
            PlayerCommand::ClearRecentlyPlayed => {
                self.store.persist().clear_recently_played();
                return false;
            }
            PlayerCommand::Quit => return true,
        }
        self.emit_state().await;
        false
    }

    async fn start_download(&mut self, song: Song) {
        let Some(downloader) = self.downloader.as_ref().map(Arc::clone) else {
            self.emit_error(MessageError::from(DownloadError::Unavailable))
                .await;
            return;
        };
        if self.store.downloaded_song(&song.id).is_some() {
            tracing::debug!(song_id = %song.id, "已下载，跳过");
            return;
        }

        let tx = self.tx_download.clone();
        tokio::spawn(async move {
            let result = downloader.download_song(&song).await;
            let _ = tx.send(DownloadOutcome { song, result }).await;
        });
    }

    async fn handle_download(&mut self, outcome: DownloadOutcome) {
        let DownloadOutcome { song, result } = outcome;
        match result {
            Ok(local_uri) => {
                let song_id = song.id.clone();
                self.store.add_downloaded_song(song.with_local_uri(local_uri));
                let _ = self.tx_evt.send(PlayerEvent::Downloaded { song_id }).await;
                self.emit_state().await;
            }
            Err(e) => {
                tracing::warn!(song_id = %song.id, err = %e, "下载失败");
                self.emit_error(MessageError::from(e)).await;
            }
        }
    }

    fn delete_download(&mut self, song_id: &str) {
        let local_uri = self
            .store
            .downloaded_song(song_id)
            .and_then(|s| s.local_uri.clone());
        self.store.remove_downloaded_song(song_id);

        if let (Some(uri), Some(downloader)) = (local_uri, self.downloader.as_ref()) {
            let downloader = Arc::clone(downloader);
            tokio::spawn(async move {
                downloader.delete_file(&uri).await;
            });
        }
    }

    async fn shutdown(mut self) {
        self.controller.unload(&mut self.store).await;
        let persist = self.store.persist().clone();
        if tokio::task::spawn_blocking(move || persist.flush())
            .await
            .is_err()
        {
            tracing::warn!("等待持久化刷盘失败");
        }
        tracing::info!("播放 Actor 退出");
        let _ = self.tx_evt.send(PlayerEvent::Stopped).await;
    }
}
