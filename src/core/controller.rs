//! 播放控制器：把 Store 的“当前歌曲”意图落到传输层
//!
//! 只有控制器会改 Store 里的播放中/进度/时长字段；
//! 传输层状态按 `stream_id` 过滤，已被替换的流发来的状态直接丢弃。

use crate::app::PlaybackStore;
use crate::audio_worker::{Transport, TransportStatus};
use crate::domain::model::Song;
use crate::domain::stream::resolve_stream_uri;
use crate::error::PlaybackError;

pub struct PlaybackController<T: Transport> {
    transport: T,
    qualities: Vec<String>,
    playback_rate: f32,
    /// 当前加载的流；None 表示没有资源
    stream_id: Option<u64>,
}

impl<T: Transport> PlaybackController<T> {
    pub fn new(transport: T, qualities: Vec<String>) -> Self {
        Self {
            transport,
            qualities,
            playback_rate: 1.0,
            stream_id: None,
        }
    }

    pub fn with_playback_rate(mut self, rate: f32) -> Self {
        self.playback_rate = rate;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_loaded(&self) -> bool {
        self.stream_id.is_some()
    }

    pub fn stream_id(&self) -> Option<u64> {
        self.stream_id
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    pub fn subscribe(&mut self) -> Option<tokio::sync::mpsc::UnboundedReceiver<TransportStatus>> {
        self.transport.subscribe()
    }

    /// 释放旧资源，加载 `song` 并开始播放
    ///
    /// 成功后 `song` 成为当前歌曲（可以不在队列里），并记入最近播放。
    /// 失败时播放中标记为 false，当前歌曲不变。
    pub async fn load_and_play(
        &mut self,
        store: &mut PlaybackStore,
        song: Song,
    ) -> Result<(), PlaybackError> {
        self.release().await;

        let result = self.start(store, &song).await;
        match &result {
            Ok(()) => {
                tracing::info!(song_id = %song.id, title = %song.title, "开始播放");
                store.persist().push_recently_played(&song);
                store.set_current_song(Some(song));
            }
            Err(e) => {
                tracing::warn!(song_id = %song.id, err = %e, "播放失败");
                self.release().await;
                store.set_is_playing(false);
            }
        }
        result
    }

    async fn start(&mut self, store: &mut PlaybackStore, song: &Song) -> Result<(), PlaybackError> {
        // 队列里的歌曲可能不带本地地址，离线列表里有就优先用
        let offline = store
            .downloaded_song(&song.id)
            .and_then(|s| s.local_uri.clone());
        let uri = match (&song.local_uri, offline) {
            (None, Some(local)) => local,
            _ => resolve_stream_uri(song, &self.qualities)
                .map(str::to_owned)
                .ok_or_else(|| PlaybackError::NoStreamUrl {
                    song_id: song.id.clone(),
                })?,
        };

        let loaded = self.transport.load(&uri).await?;
        self.stream_id = Some(loaded.stream_id);
        if (self.playback_rate - 1.0).abs() > f32::EPSILON {
            self.transport.set_rate(self.playback_rate).await?;
        }
        self.transport.play().await?;

        store.set_is_playing(true);
        store.set_position_ms(0);
        store.set_duration_ms(
            loaded
                .duration_ms
                .unwrap_or_else(|| u64::from(song.duration_seconds) * 1000),
        );
        Ok(())
    }

    async fn release(&mut self) {
        if self.stream_id.take().is_none() {
            return;
        }
        if let Err(e) = self.transport.unload().await {
            tracing::warn!(err = %e, "释放旧音频失败");
        }
    }

    /// 处理传输层推送的状态；自然结束时前进到下一首
    pub async fn handle_status(
        &mut self,
        store: &mut PlaybackStore,
        status: TransportStatus,
    ) -> Result<(), PlaybackError> {
        if self.stream_id != Some(status.stream_id) {
            tracing::trace!(
                stream_id = status.stream_id,
                current = ?self.stream_id,
                "丢弃过期的传输状态"
            );
            return Ok(());
        }

        store.set_is_playing(status.is_playing);
        store.set_position_ms(status.position_ms);
        if status.duration_ms > 0 {
            store.set_duration_ms(status.duration_ms);
        }
        if !status.did_finish {
            return Ok(());
        }

        let finished_id = store.current_song().map(|s| s.id.clone());
        store.play_next();
        let next = store.current_song().cloned();
        match next {
            Some(next) if Some(&next.id) != finished_id.as_ref() => {
                tracing::debug!(from = ?finished_id, to = %next.id, "播放结束，自动下一首");
                self.load_and_play(store, next).await
            }
            _ => {
                // 单曲循环或队列到头都会停在这里
                tracing::info!(song_id = ?finished_id, "播放结束");
                store.set_is_playing(false);
                Ok(())
            }
        }
    }

    pub async fn play(&mut self, store: &mut PlaybackStore) -> Result<(), PlaybackError> {
        if !self.is_loaded() {
            return Ok(());
        }
        self.transport.play().await?;
        store.set_is_playing(true);
        Ok(())
    }

    pub async fn pause(&mut self, store: &mut PlaybackStore) -> Result<(), PlaybackError> {
        if !self.is_loaded() {
            return Ok(());
        }
        self.transport.pause().await?;
        store.set_is_playing(false);
        Ok(())
    }

    /// 暂停并回到开头，资源保留
    pub async fn stop(&mut self, store: &mut PlaybackStore) -> Result<(), PlaybackError> {
        if !self.is_loaded() {
            return Ok(());
        }
        self.transport.stop().await?;
        store.set_is_playing(false);
        Ok(())
    }

    /// 进度以传输层随后推送的状态为准
    pub async fn seek_to(&mut self, position_ms: u64) -> Result<(), PlaybackError> {
        if !self.is_loaded() {
            return Ok(());
        }
        self.transport.seek_to(position_ms).await?;
        Ok(())
    }

    /// 倍速在之后加载的歌曲上也生效
    pub async fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
        self.playback_rate = rate;
        if self.is_loaded() {
            self.transport.set_rate(rate).await?;
        }
        Ok(())
    }

    pub async fn unload(&mut self, store: &mut PlaybackStore) {
        self.release().await;
        store.reset_transport();
    }
}
