use crate::app::RepeatMode;
use crate::domain::model::Song;
use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CURRENT_VERSION: u8 = 1;
pub const DEFAULT_RECENTLY_PLAYED_MAX: usize = 20;
const STATE_DIR: &str = "state";

/// 持久化的键；每个键独立读写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Queue,
    CurrentIndex,
    Shuffle,
    Repeat,
    DownloadedSongs,
    RecentlyPlayed,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        StorageKey::Queue,
        StorageKey::CurrentIndex,
        StorageKey::Shuffle,
        StorageKey::Repeat,
        StorageKey::DownloadedSongs,
        StorageKey::RecentlyPlayed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Queue => "queue",
            StorageKey::CurrentIndex => "currentIndex",
            StorageKey::Shuffle => "shuffle",
            StorageKey::Repeat => "repeat",
            StorageKey::DownloadedSongs => "downloadedSongs",
            StorageKey::RecentlyPlayed => "recentlyPlayed",
        }
    }
}

/// 键值存储后端
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, key: StorageKey, bytes: &[u8]) -> Result<(), StorageError>;
    fn remove(&self, key: StorageKey) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError> {
        for key in StorageKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// 每个键一个 `{data_dir}/state/{key}.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join(STATE_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn put(&self, key: StorageKey, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|_| StorageError::DirUnavailable(self.dir.clone()))?;

        let path = self.path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes)?;

        // 原子性写入
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&path);
            if fs::rename(&tmp_path, &path).is_err() {
                let _ = fs::remove_file(&tmp_path);
                return Err(StorageError::Io(e));
            }
        }
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// 纯内存后端（测试用）
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<StorageKey, Vec<u8>>>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StorageKey, Vec<u8>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock().get(&key).cloned())
    }

    fn put(&self, key: StorageKey, bytes: &[u8]) -> Result<(), StorageError> {
        self.lock().insert(key, bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
        self.lock().remove(&key);
        Ok(())
    }
}

/// 落盘格式：带版本号和保存时间
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u8,
    saved_at_epoch_ms: i64,
    value: T,
}

pub fn write_value<T: Serialize>(
    store: &dyn KeyValueStore,
    key: StorageKey,
    value: &T,
) -> Result<(), StorageError> {
    let envelope = Envelope {
        version: CURRENT_VERSION,
        saved_at_epoch_ms: chrono::Utc::now().timestamp_millis(),
        value,
    };
    let bytes = serde_json::to_vec_pretty(&envelope)?;
    store.put(key, &bytes)
}

pub fn read_value<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: StorageKey,
) -> Result<Option<T>, StorageError> {
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;

    // 检查版本兼容性
    if envelope.version != CURRENT_VERSION {
        return Err(StorageError::IncompatibleVersion {
            expected: CURRENT_VERSION,
            found: envelope.version,
        });
    }
    Ok(Some(envelope.value))
}

/// 读失败时记日志并返回默认值
fn read_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: StorageKey) -> T {
    match read_value(store, key) {
        Ok(Some(v)) => v,
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key = key.as_str(), err = %e, "读取持久化状态失败，使用默认值");
            T::default()
        }
    }
}

/// 启动时一次性读取的播放状态
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    pub queue: Vec<Song>,
    pub current_index: usize,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub downloaded: Vec<Song>,
}

pub fn load_persisted_state(store: &dyn KeyValueStore) -> PersistedState {
    PersistedState {
        queue: read_or_default(store, StorageKey::Queue),
        current_index: read_or_default(store, StorageKey::CurrentIndex),
        shuffle: read_or_default(store, StorageKey::Shuffle),
        repeat: read_or_default(store, StorageKey::Repeat),
        downloaded: read_or_default(store, StorageKey::DownloadedSongs),
    }
}

pub fn load_recently_played(store: &dyn KeyValueStore) -> Vec<Song> {
    read_or_default(store, StorageKey::RecentlyPlayed)
}

/// 最近播放：去重、置顶、截断到 `max`
pub fn push_recently_played(
    store: &dyn KeyValueStore,
    song: &Song,
    max: usize,
) -> Result<(), StorageError> {
    let mut recent: Vec<Song> = read_value(store, StorageKey::RecentlyPlayed)
        .unwrap_or_else(|e| {
            tracing::warn!(err = %e, "最近播放记录损坏，重新开始记录");
            None
        })
        .unwrap_or_default();
    recent.retain(|s| s.id != song.id);
    recent.insert(0, song.clone());
    recent.truncate(max);
    write_value(store, StorageKey::RecentlyPlayed, &recent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_owned(),
            title: format!("Song {id}"),
            ..Default::default()
        }
    }

    #[test]
    fn test_storage_key_names() {
        assert_eq!(StorageKey::Queue.as_str(), "queue");
        assert_eq!(StorageKey::CurrentIndex.as_str(), "currentIndex");
        assert_eq!(StorageKey::DownloadedSongs.as_str(), "downloadedSongs");
        assert_eq!(StorageKey::RecentlyPlayed.as_str(), "recentlyPlayed");
    }

    #[test]
    fn test_memory_store_value_roundtrip() {
        let store = MemoryStore::default();
        write_value(&store, StorageKey::Repeat, &RepeatMode::All).unwrap();
        let back: Option<RepeatMode> = read_value(&store, StorageKey::Repeat).unwrap();
        assert_eq!(back, Some(RepeatMode::All));
        let missing: Option<bool> = read_value(&store, StorageKey::Shuffle).unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_incompatible_version_is_rejected() {
        let store = MemoryStore::default();
        store
            .put(
                StorageKey::CurrentIndex,
                br#"{"version": 99, "saved_at_epoch_ms": 0, "value": 3}"#,
            )
            .unwrap();
        match read_value::<usize>(&store, StorageKey::CurrentIndex) {
            Err(StorageError::IncompatibleVersion { expected, found }) => {
                assert_eq!(expected, CURRENT_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("Expected IncompatibleVersion, got {other:?}"),
        }
        // 加载时退回默认值
        assert_eq!(load_persisted_state(&store).current_index, 0);
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let store = MemoryStore::default();
        store.put(StorageKey::Queue, b"{not-json").unwrap();
        write_value(&store, StorageKey::Shuffle, &true).unwrap();
        let state = load_persisted_state(&store);
        assert!(state.queue.is_empty());
        assert!(state.shuffle);
    }

    #[test]
    fn test_push_recently_played_dedups_and_bounds() {
        let store = MemoryStore::default();
        for i in 0..25 {
            push_recently_played(&store, &song(&i.to_string()), 20).unwrap();
        }
        push_recently_played(&store, &song("10"), 20).unwrap();
        let recent = load_recently_played(&store);
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].id, "10");
        assert_eq!(recent.iter().filter(|s| s.id == "10").count(), 1);
        assert_eq!(recent[1].id, "24");
    }

    #[test]
    fn test_file_store_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get(StorageKey::Queue).unwrap(), None);

        write_value(&store, StorageKey::Queue, &vec![song("a")]).unwrap();
        assert!(store.dir().join("queue.json").exists());
        assert!(!store.dir().join("queue.json.tmp").exists());

        let queue: Option<Vec<Song>> = read_value(&store, StorageKey::Queue).unwrap();
        assert_eq!(queue.unwrap()[0].id, "a");

        store.clear().unwrap();
        assert_eq!(store.get(StorageKey::Queue).unwrap(), None);
    }
}
