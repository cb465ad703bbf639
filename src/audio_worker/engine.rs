use async_trait::async_trait;
use rodio::OutputStreamBuilder;
use std::path::PathBuf;
use std::time::Duration;
use tokio::select;
use tokio::sync::{mpsc, oneshot};

use super::download::fetch_to_path;
use super::messages::{LoadedStream, Reply, TransportCommand, TransportStatus};
use super::player::PlayerState;
use super::transport::{Transport, is_remote_uri, local_path_from_uri};
use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub status_interval: Duration,
    pub playback_rate: f32,
    pub http: reqwest::Client,
}

struct AudioEngine {
    tx_status: mpsc::UnboundedSender<TransportStatus>,
    rx_cmd: mpsc::UnboundedReceiver<TransportCommand>,
    state: PlayerState,
    http: reqwest::Client,
    status_interval: Duration,
}

impl AudioEngine {
    async fn run(mut self) {
        let mut tick = tokio::time::interval(self.status_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            select! {
                _ = tick.tick(), if self.state.is_active() => {
                    self.emit_status();
                }
                maybe_cmd = self.rx_cmd.recv() => {
                    let Some(cmd) = maybe_cmd else {
                        break;
                    };
                    self.handle_command(cmd).await;
                }
            }
        }
        self.state.unload();
        tracing::info!("音频线程退出");
    }

    fn emit_status(&self) {
        let _ = self.tx_status.send(self.state.status());
    }

    async fn handle_command(&mut self, cmd: TransportCommand) {
        match cmd {
            TransportCommand::Load { uri, reply } => {
                let result = self.load(&uri).await;
                if let Err(e) = &result {
                    tracing::warn!(uri = %uri, err = %e, "加载音频失败");
                }
                let _ = reply.send(result);
            }
            TransportCommand::Play { reply } => {
                let result = self.state.play();
                self.reply_with_status(reply, result);
            }
            TransportCommand::Pause { reply } => {
                let result = self.state.pause();
                self.reply_with_status(reply, result);
            }
            TransportCommand::Stop { reply } => {
                let result = self.state.stop(&self.tx_status);
                self.reply_with_status(reply, result);
            }
            TransportCommand::SeekToMs { ms, reply } => {
                let result = self.state.seek_to_ms(&self.tx_status, ms, false);
                if let Err(e) = &result {
                    tracing::warn!(ms, err = %e, "Seek 失败");
                }
                self.reply_with_status(reply, result);
            }
            TransportCommand::SetRate { rate, reply } => {
                self.state.set_rate(rate);
                let _ = reply.send(Ok(()));
            }
            TransportCommand::Unload { reply } => {
                self.state.unload();
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn reply_with_status(&self, reply: Reply<()>, result: Result<(), TransportError>) {
        if result.is_ok() {
            self.emit_status();
        }
        let _ = reply.send(result);
    }

    async fn load(&mut self, uri: &str) -> Result<LoadedStream, TransportError> {
        // 拉取新资源之前先释放旧的
        self.state.unload();

        let (path, temp) = if is_remote_uri(uri) {
            let temp = tempfile::Builder::new()
                .prefix("pocket-player-")
                .suffix(".audio")
                .tempfile()
                .map_err(|e| TransportError::Fetch {
                    uri: uri.to_owned(),
                    message: e.to_string(),
                })?;
            let bytes = fetch_to_path(&self.http, uri, temp.path())
                .await
                .map_err(|e| TransportError::Fetch {
                    uri: uri.to_owned(),
                    message: e.to_string(),
                })?;
            tracing::debug!(uri, bytes, "远程音频已拉取");
            (temp.path().to_path_buf(), Some(temp))
        } else {
            let path = local_path_from_uri(uri).unwrap_or(uri);
            (PathBuf::from(path), None)
        };

        let (stream_id, duration_ms) = self.state.load(&self.tx_status, uri, path, temp)?;
        Ok(LoadedStream {
            stream_id,
            duration_ms,
        })
    }
}

/// rodio 输出设备上的传输层；音频在独立线程上运行
pub struct RodioTransport {
    tx_cmd: mpsc::UnboundedSender<TransportCommand>,
    rx_status: Option<mpsc::UnboundedReceiver<TransportStatus>>,
}

impl RodioTransport {
    /// 打开默认输出设备；失败时返回 `OutputStream` 错误
    pub fn spawn(config: TransportConfig) -> Result<Self, TransportError> {
        let (tx_cmd, rx_cmd) = mpsc::unbounded_channel();
        let (tx_status, rx_status) = mpsc::unbounded_channel();
        let (tx_ready, rx_ready) = std::sync::mpsc::sync_channel::<Result<(), TransportError>>(1);

        std::thread::Builder::new()
            .name("audio".to_owned())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = tx_ready.send(Err(TransportError::OutputStream(format!(
                            "初始化音频线程运行时失败: {e}"
                        ))));
                        return;
                    }
                };
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::error!(err = %e, "初始化音频输出失败");
                        let _ = tx_ready.send(Err(TransportError::OutputStream(e.to_string())));
                        return;
                    }
                };
                let mixer = stream.mixer().clone();
                let engine = AudioEngine {
                    tx_status,
                    rx_cmd,
                    state: PlayerState::new(mixer, stream, config.playback_rate),
                    http: config.http,
                    status_interval: config.status_interval,
                };
                let _ = tx_ready.send(Ok(()));
                tracing::info!("音频线程已启动");
                rt.block_on(engine.run());
            })
            .map_err(|e| TransportError::OutputStream(format!("无法启动音频线程: {e}")))?;

        rx_ready.recv().map_err(|_| TransportError::WorkerGone)??;
        Ok(Self {
            tx_cmd,
            rx_status: Some(rx_status),
        })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> TransportCommand,
    ) -> Result<T, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.tx_cmd
            .send(build(reply))
            .map_err(|_| TransportError::WorkerGone)?;
        rx.await.map_err(|_| TransportError::WorkerGone)?
    }
}

#[async_trait]
impl Transport for RodioTransport {
    async fn load(&mut self, uri: &str) -> Result<LoadedStream, TransportError> {
        let uri = uri.to_owned();
        self.request(|reply| TransportCommand::Load { uri, reply })
            .await
    }

    async fn play(&mut self) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::Play { reply }).await
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::Pause { reply }).await
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::Stop { reply }).await
    }

    async fn seek_to(&mut self, position_ms: u64) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::SeekToMs {
            ms: position_ms,
            reply,
        })
        .await
    }

    async fn set_rate(&mut self, rate: f32) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::SetRate { rate, reply })
            .await
    }

    async fn unload(&mut self) -> Result<(), TransportError> {
        self.request(|reply| TransportCommand::Unload { reply })
            .await
    }

    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<TransportStatus>> {
        self.rx_status.take()
    }
}
