use rand::Rng;

use crate::domain::model::Song;
use crate::player_state::PersistHandle;

use super::{PlayQueue, PlaybackSnapshot, RepeatMode, TransportSnapshot};

/// 播放状态的唯一持有者
///
/// 所有修改队列/模式的操作都是同步的内存状态转换，随后把受影响的部分
/// 交给持久化线程（不等待结果，写失败也不回滚）。
#[derive(Debug)]
pub struct PlaybackStore {
    queue: PlayQueue,
    transport: TransportSnapshot,
    downloaded: Vec<Song>,
    persist: PersistHandle,
}

impl PlaybackStore {
    pub fn new(persist: PersistHandle) -> Self {
        Self {
            queue: PlayQueue::new(),
            transport: TransportSnapshot::default(),
            downloaded: Vec::new(),
            persist,
        }
    }

    /// 启动时从持久化层恢复一次
    pub fn initialize_from_storage(&mut self) {
        let state = self.persist.load_state();
        tracing::info!(
            queue_len = state.queue.len(),
            current_index = state.current_index,
            shuffle = state.shuffle,
            repeat = state.repeat.as_str(),
            downloaded = state.downloaded.len(),
            "已恢复播放状态"
        );
        self.queue = PlayQueue::restore(
            state.queue,
            state.current_index,
            state.shuffle,
            state.repeat,
        );
        self.downloaded = state.downloaded;
    }

    pub fn persist(&self) -> &PersistHandle {
        &self.persist
    }

    pub fn queue(&self) -> &[Song] {
        self.queue.songs()
    }

    pub fn current_index(&self) -> usize {
        self.queue.current_index()
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.queue.current()
    }

    pub fn shuffle(&self) -> bool {
        self.queue.shuffle()
    }

    pub fn repeat(&self) -> RepeatMode {
        self.queue.repeat()
    }

    pub fn transport(&self) -> TransportSnapshot {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing
    }

    pub fn downloaded_songs(&self) -> &[Song] {
        &self.downloaded
    }

    pub fn downloaded_song(&self, id: &str) -> Option<&Song> {
        self.downloaded.iter().find(|s| s.id == id)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_song: self.queue.current().cloned(),
            current_index: self.queue.current_index(),
            queue: self.queue.songs().to_vec(),
            shuffle: self.queue.shuffle(),
            repeat: self.queue.repeat(),
            transport: self.transport,
            downloaded: self.downloaded.clone(),
        }
    }

    pub fn set_queue(&mut self, songs: Vec<Song>, start_index: usize) {
        self.queue.set_songs(songs, start_index);
        tracing::debug!(
            len = self.queue.len(),
            current_index = self.queue.current_index(),
            "设置播放队列"
        );
        self.persist_queue();
        self.persist_index();
    }

    pub fn add_to_queue(&mut self, song: Song) {
        self.queue.push(song);
        self.persist_queue();
    }

    pub fn remove_from_queue(&mut self, index: usize) {
        if !self.queue.remove(index) {
            tracing::debug!(index, len = self.queue.len(), "删除越界，忽略");
            return;
        }
        self.persist_queue();
        self.persist_index();
    }

    pub fn reorder_queue(&mut self, from_index: usize, to_index: usize) {
        if !self.queue.move_song(from_index, to_index) {
            tracing::debug!(from_index, to_index, len = self.queue.len(), "移动越界，忽略");
            return;
        }
        self.persist_queue();
        self.persist_index();
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.persist_queue();
        self.persist_index();
    }

    pub fn play_next(&mut self) {
        if self.queue.advance() {
            self.persist_index();
        }
    }

    pub fn play_previous(&mut self) {
        if self.queue.retreat() {
            self.persist_index();
        }
    }

    pub fn skip_to_index(&mut self, index: usize) {
        if self.queue.skip_to(index) {
            self.persist_index();
        } else {
            tracing::debug!(index, len = self.queue.len(), "跳转越界，忽略");
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.toggle_shuffle_with(&mut rand::thread_rng());
    }

    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let on = self.queue.toggle_shuffle_with(rng);
        tracing::debug!(shuffle = on, "切换随机播放");
        self.persist_queue();
        self.persist_index();
        self.persist.save_shuffle(on);
    }

    pub fn toggle_repeat(&mut self) {
        let mode = self.queue.toggle_repeat();
        tracing::debug!(repeat = mode.as_str(), "切换循环模式");
        self.persist.save_repeat(mode);
    }

    /// 按 id 去重
    pub fn add_downloaded_song(&mut self, song: Song) {
        if self.downloaded.iter().any(|s| s.id == song.id) {
            return;
        }
        self.downloaded.push(song);
        self.persist.save_downloaded(&self.downloaded);
    }

    pub fn remove_downloaded_song(&mut self, id: &str) {
        let before = self.downloaded.len();
        self.downloaded.retain(|s| s.id != id);
        if self.downloaded.len() != before {
            self.persist.save_downloaded(&self.downloaded);
        }
    }

    // 以下只由播放控制器调用

    pub fn set_current_song(&mut self, song: Option<Song>) {
        self.queue.set_current_song(song);
    }

    pub fn set_is_playing(&mut self, playing: bool) {
        self.transport.is_playing = playing;
    }

    pub fn set_position_ms(&mut self, position_ms: u64) {
        self.transport.position_ms = position_ms;
    }

    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.transport.duration_ms = duration_ms;
    }

    pub fn reset_transport(&mut self) {
        self.transport = TransportSnapshot::default();
    }

    fn persist_queue(&self) {
        self.persist.save_queue(self.queue.songs());
    }

    fn persist_index(&self) {
        self.persist.save_current_index(self.queue.current_index());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_state::{MemoryStore, spawn_persister};
    use std::sync::Arc;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_owned(),
            title: format!("Song {id}"),
            ..Default::default()
        }
    }

    fn new_store() -> PlaybackStore {
        let persist = spawn_persister(Arc::new(MemoryStore::default()), 20);
        PlaybackStore::new(persist)
    }

    #[test]
    fn test_set_queue_persists_queue_and_index() {
        let mut store = new_store();
        store.set_queue(vec![song("a"), song("b"), song("c")], 1);
        store.persist().flush();

        let state = store.persist().load_state();
        assert_eq!(state.queue.len(), 3);
        assert_eq!(state.current_index, 1);
        assert_eq!(store.current_song().map(|s| s.id.as_str()), Some("b"));
    }

    #[test]
    fn test_navigation_persists_index() {
        let mut store = new_store();
        store.set_queue(vec![song("a"), song("b"), song("c")], 0);
        store.play_next();
        store.play_next();
        store.play_previous();
        store.skip_to_index(9);
        store.persist().flush();
        assert_eq!(store.persist().load_state().current_index, 1);
    }

    #[test]
    fn test_modes_persist() {
        let mut store = new_store();
        store.set_queue(vec![song("a"), song("b")], 0);
        store.toggle_shuffle();
        store.toggle_repeat();
        store.toggle_repeat();
        store.persist().flush();

        let state = store.persist().load_state();
        assert!(state.shuffle);
        assert_eq!(state.repeat, RepeatMode::One);
        assert_eq!(state.queue[0].id, "a");
    }

    #[test]
    fn test_downloaded_set_semantics() {
        let mut store = new_store();
        store.add_downloaded_song(song("a").with_local_uri("file:///a.mp4"));
        store.add_downloaded_song(song("a").with_local_uri("file:///other.mp4"));
        store.add_downloaded_song(song("b").with_local_uri("file:///b.mp4"));
        assert_eq!(store.downloaded_songs().len(), 2);
        assert_eq!(
            store.downloaded_song("a").and_then(|s| s.local_uri.as_deref()),
            Some("file:///a.mp4")
        );

        store.remove_downloaded_song("a");
        store.remove_downloaded_song("missing");
        store.persist().flush();

        let state = store.persist().load_state();
        assert_eq!(state.downloaded.len(), 1);
        assert_eq!(state.downloaded[0].id, "b");
    }

    #[test]
    fn test_initialize_from_storage() {
        let mut first = new_store();
        first.set_queue(vec![song("a"), song("b"), song("c")], 2);
        first.toggle_repeat();
        first.add_downloaded_song(song("c").with_local_uri("file:///c.mp4"));
        first.persist().flush();

        let mut second = PlaybackStore::new(first.persist().clone());
        second.initialize_from_storage();
        assert_eq!(second.queue().len(), 3);
        assert_eq!(second.current_index(), 2);
        assert_eq!(second.current_song().map(|s| s.id.as_str()), Some("c"));
        assert_eq!(second.repeat(), RepeatMode::All);
        assert!(!second.shuffle());
        assert_eq!(second.downloaded_songs().len(), 1);
        assert!(!second.is_playing());
    }

    #[test]
    fn test_clear_queue() {
        let mut store = new_store();
        store.set_queue(vec![song("a"), song("b")], 1);
        store.clear_queue();
        store.persist().flush();
        assert!(store.queue().is_empty());
        assert!(store.current_song().is_none());
        assert_eq!(store.current_index(), 0);
        assert!(store.persist().load_state().queue.is_empty());
    }

    #[test]
    fn test_snapshot_reflects_transport() {
        let mut store = new_store();
        store.set_queue(vec![song("a")], 0);
        store.set_is_playing(true);
        store.set_position_ms(1_500);
        store.set_duration_ms(200_000);
        let snap = store.snapshot();
        assert!(snap.transport.is_playing);
        assert_eq!(snap.progress_label(), "0:01 / 3:20");
        assert_eq!(snap.current_song.map(|s| s.id), Some("a".to_owned()));

        store.reset_transport();
        assert_eq!(store.transport(), TransportSnapshot::default());
    }
}
