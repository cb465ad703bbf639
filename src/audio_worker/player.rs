use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use super::messages::TransportStatus;
use crate::error::TransportError;

struct ActiveSink {
    sink: Arc<Sink>,
    end_cancel: Arc<AtomicBool>,
}

/// 当前加载的音频：本地文件或远程拉取到的临时文件
struct LoadedSource {
    path: PathBuf,
    uri: String,
    duration_ms: Option<u64>,
    /// 远程音频的临时文件，随 unload 一起删除
    _temp: Option<NamedTempFile>,
}

pub struct PlayerState {
    mixer: Mixer,
    #[allow(dead_code)]
    stream: OutputStream,
    current: Option<ActiveSink>,
    source: Option<LoadedSource>,
    stream_id: u64,
    /// seek 通过重建 sink 实现，新 sink 的 get_pos 从 0 开始
    seek_base_ms: u64,
    rate: f32,
}

impl PlayerState {
    pub fn new(mixer: Mixer, stream: OutputStream, rate: f32) -> Self {
        Self {
            mixer,
            stream,
            current: None,
            source: None,
            stream_id: 0,
            seek_base_ms: 0,
            rate,
        }
    }

    /// 还有音频在 sink 里（用于决定是否推送 tick）
    pub fn is_active(&self) -> bool {
        self.current.as_ref().is_some_and(|cur| !cur.sink.empty())
    }

    pub fn unload(&mut self) {
        self.stop_current();
        if let Some(source) = self.source.take() {
            tracing::debug!(stream_id = self.stream_id, uri = %source.uri, "释放音频");
        }
        self.seek_base_ms = 0;
    }

    fn stop_current(&mut self) {
        if let Some(cur) = self.current.take() {
            tracing::debug!(
                stream_id = self.stream_id,
                "Stopping current sink, signaling end check thread to cancel"
            );
            cur.end_cancel.store(true, Ordering::Relaxed);
            cur.sink.stop();
        }
    }

    /// 加载后处于暂停状态，由 `play` 开始播放
    pub fn load(
        &mut self,
        tx_status: &mpsc::UnboundedSender<TransportStatus>,
        uri: &str,
        path: PathBuf,
        temp: Option<NamedTempFile>,
    ) -> Result<(u64, Option<u64>), TransportError> {
        self.unload();
        let (sink, duration_ms) = build_sink_from_path(&self.mixer, &path, None, uri)?;
        sink.pause();
        sink.set_speed(self.rate);

        self.stream_id = self.stream_id.wrapping_add(1).max(1);
        self.source = Some(LoadedSource {
            path,
            uri: uri.to_owned(),
            duration_ms,
            _temp: temp,
        });
        self.attach_sink(tx_status, Arc::new(sink));
        tracing::debug!(stream_id = self.stream_id, uri, ?duration_ms, "音频已加载");
        Ok((self.stream_id, duration_ms))
    }

    pub fn play(&mut self) -> Result<(), TransportError> {
        let sink = self.current_sink().ok_or(TransportError::NotLoaded)?;
        sink.play();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TransportError> {
        let sink = self.current_sink().ok_or(TransportError::NotLoaded)?;
        sink.pause();
        Ok(())
    }

    /// 暂停并回到开头
    pub fn stop(
        &mut self,
        tx_status: &mpsc::UnboundedSender<TransportStatus>,
    ) -> Result<(), TransportError> {
        self.seek_to_ms(tx_status, 0, true)
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        if let Some(sink) = self.current_sink() {
            sink.set_speed(rate);
        }
    }

    pub fn seek_to_ms(
        &mut self,
        tx_status: &mpsc::UnboundedSender<TransportStatus>,
        position_ms: u64,
        force_pause: bool,
    ) -> Result<(), TransportError> {
        let Some(source) = self.source.as_ref() else {
            return Err(TransportError::NotLoaded);
        };
        let was_paused = self
            .current
            .as_ref()
            .is_none_or(|cur| cur.sink.is_paused());
        let path = source.path.clone();
        let uri = source.uri.clone();

        let seek = Duration::from_millis(position_ms);
        let (sink, _duration_ms) = build_sink_from_path(&self.mixer, &path, Some(seek), &uri)
            .map_err(|e| TransportError::Seek(e.to_string()))?;
        self.stop_current();

        sink.set_speed(self.rate);
        if was_paused || force_pause {
            sink.pause();
        } else {
            sink.play();
        }
        self.seek_base_ms = position_ms;
        self.attach_sink(tx_status, Arc::new(sink));
        Ok(())
    }

    pub fn status(&self) -> TransportStatus {
        let duration_ms = self
            .source
            .as_ref()
            .and_then(|s| s.duration_ms)
            .unwrap_or(0);
        let Some(cur) = self.current.as_ref() else {
            return TransportStatus {
                stream_id: self.stream_id,
                duration_ms,
                ..Default::default()
            };
        };
        let position_ms = self
            .seek_base_ms
            .saturating_add(cur.sink.get_pos().as_millis() as u64);
        TransportStatus {
            stream_id: self.stream_id,
            is_playing: !cur.sink.is_paused() && !cur.sink.empty(),
            position_ms,
            duration_ms,
            did_finish: false,
        }
    }

    fn current_sink(&self) -> Option<Arc<Sink>> {
        self.current.as_ref().map(|cur| Arc::clone(&cur.sink))
    }

    fn attach_sink(&mut self, tx_status: &mpsc::UnboundedSender<TransportStatus>, sink: Arc<Sink>) {
        let stream_id = self.stream_id;
        let duration_ms = self
            .source
            .as_ref()
            .and_then(|s| s.duration_ms)
            .unwrap_or(0);
        let tx_end = tx_status.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let sink_end = Arc::clone(&sink);
        let cancel_end = Arc::clone(&cancel);

        tracing::debug!(stream_id, "Spawning end check thread");
        let spawned = thread::Builder::new()
            .name(format!("audio-end-check-{stream_id}"))
            .spawn(move || {
                let start = std::time::Instant::now();
                sink_end.sleep_until_end();
                let elapsed = start.elapsed();

                if cancel_end.load(Ordering::Relaxed) {
                    tracing::debug!(
                        stream_id,
                        elapsed_ms = elapsed.as_millis(),
                        "End check thread was cancelled"
                    );
                    return;
                }
                tracing::debug!(
                    stream_id,
                    elapsed_ms = elapsed.as_millis(),
                    "End check thread exiting naturally"
                );
                let _ = tx_end.send(TransportStatus {
                    stream_id,
                    is_playing: false,
                    position_ms: duration_ms,
                    duration_ms,
                    did_finish: true,
                });
            });
        // 线程起不来时只是少了自动切歌，播放本身不受影响
        if let Err(e) = spawned {
            tracing::warn!(stream_id, err = %e, "无法启动播放结束检测线程");
        }

        self.current = Some(ActiveSink {
            sink,
            end_cancel: cancel,
        });
    }
}

fn build_sink_from_path(
    mixer: &Mixer,
    path: &Path,
    seek: Option<Duration>,
    uri: &str,
) -> Result<(Sink, Option<u64>), TransportError> {
    let file = File::open(path).map_err(|source| TransportError::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let decoder = Decoder::new(BufReader::new(file)).map_err(|e| TransportError::Decode {
        uri: uri.to_owned(),
        message: e.to_string(),
    })?;
    let duration_ms = decoder.total_duration().map(|d| d.as_millis() as u64);
    let source: Box<dyn Source + Send> = if let Some(seek) = seek {
        Box::new(decoder.skip_duration(seek))
    } else {
        Box::new(decoder)
    };

    let sink = Sink::connect_new(mixer);
    sink.append(source);
    Ok((sink, duration_ms))
}
