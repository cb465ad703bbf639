//! 后台持久化线程
//!
//! 调用方只投递消息，不等待磁盘 IO；写失败只记日志。
//! 所有写入在同一线程上顺序执行，因此“最近播放”的读改写不会互相覆盖。

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use crate::app::RepeatMode;
use crate::domain::model::Song;
use crate::error::StorageError;

use super::store::{
    KeyValueStore, PersistedState, StorageKey, load_persisted_state, load_recently_played,
    push_recently_played, write_value,
};

#[derive(Debug)]
enum PersistCommand {
    Queue(Vec<Song>),
    CurrentIndex(usize),
    Shuffle(bool),
    Repeat(RepeatMode),
    Downloaded(Vec<Song>),
    PushRecent(Song),
    ClearRecent,
    Flush(mpsc::SyncSender<()>),
}

#[derive(Clone)]
pub struct PersistHandle {
    tx: Option<mpsc::Sender<PersistCommand>>,
    storage: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for PersistHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistHandle")
            .field("running", &self.tx.is_some())
            .finish()
    }
}

pub fn spawn_persister(storage: Arc<dyn KeyValueStore>, recent_max: usize) -> PersistHandle {
    let (tx, rx) = mpsc::channel::<PersistCommand>();
    let worker_storage = Arc::clone(&storage);

    let spawned = thread::Builder::new()
        .name("persister".to_owned())
        .spawn(move || {
            tracing::debug!("持久化线程已启动");
            while let Ok(cmd) = rx.recv() {
                run_command(worker_storage.as_ref(), cmd, recent_max);
            }
            tracing::debug!("持久化线程退出");
        });

    let tx = match spawned {
        Ok(_) => Some(tx),
        Err(e) => {
            tracing::error!(err = %e, "无法启动持久化线程，本次会话的状态不会保存");
            None
        }
    };

    PersistHandle { tx, storage }
}

fn run_command(storage: &dyn KeyValueStore, cmd: PersistCommand, recent_max: usize) {
    let (key, result) = match cmd {
        PersistCommand::Queue(songs) => (
            StorageKey::Queue,
            write_value(storage, StorageKey::Queue, &songs),
        ),
        PersistCommand::CurrentIndex(index) => (
            StorageKey::CurrentIndex,
            write_value(storage, StorageKey::CurrentIndex, &index),
        ),
        PersistCommand::Shuffle(on) => (
            StorageKey::Shuffle,
            write_value(storage, StorageKey::Shuffle, &on),
        ),
        PersistCommand::Repeat(mode) => (
            StorageKey::Repeat,
            write_value(storage, StorageKey::Repeat, &mode),
        ),
        PersistCommand::Downloaded(songs) => (
            StorageKey::DownloadedSongs,
            write_value(storage, StorageKey::DownloadedSongs, &songs),
        ),
        PersistCommand::PushRecent(song) => (
            StorageKey::RecentlyPlayed,
            push_recently_played(storage, &song, recent_max),
        ),
        PersistCommand::ClearRecent => (
            StorageKey::RecentlyPlayed,
            storage.remove(StorageKey::RecentlyPlayed),
        ),
        PersistCommand::Flush(done) => {
            let _ = done.send(());
            return;
        }
    };
    if let Err(e) = result {
        log_write_error(key, &e);
    }
}

fn log_write_error(key: StorageKey, err: &StorageError) {
    tracing::warn!(
        key = key.as_str(),
        retryable = err.is_retryable(),
        err = %err,
        "持久化写入失败"
    );
}

impl PersistHandle {
    fn send(&self, cmd: PersistCommand) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        if tx.send(cmd).is_err() {
            tracing::warn!("持久化线程已退出，写入被丢弃");
        }
    }

    pub fn save_queue(&self, songs: &[Song]) {
        self.send(PersistCommand::Queue(songs.to_vec()));
    }

    pub fn save_current_index(&self, index: usize) {
        self.send(PersistCommand::CurrentIndex(index));
    }

    pub fn save_shuffle(&self, on: bool) {
        self.send(PersistCommand::Shuffle(on));
    }

    pub fn save_repeat(&self, mode: RepeatMode) {
        self.send(PersistCommand::Repeat(mode));
    }

    pub fn save_downloaded(&self, songs: &[Song]) {
        self.send(PersistCommand::Downloaded(songs.to_vec()));
    }

    pub fn push_recently_played(&self, song: &Song) {
        self.send(PersistCommand::PushRecent(song.clone()));
    }

    pub fn clear_recently_played(&self) {
        self.send(PersistCommand::ClearRecent);
    }

    /// 阻塞直到此前投递的写入全部完成
    pub fn flush(&self) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        if tx.send(PersistCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// 同步读取（只在启动时调用一次）
    pub fn load_state(&self) -> PersistedState {
        load_persisted_state(self.storage.as_ref())
    }

    pub fn recently_played(&self) -> Vec<Song> {
        load_recently_played(self.storage.as_ref())
    }
}
