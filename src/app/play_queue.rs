use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::model::Song;

use super::RepeatMode;

/// 播放队列状态机（纯内存，不做持久化）
///
/// 约定：
/// - `current_song` 为 `Some` 时恒等于 `songs[current_index]`
///   （`load_and_play` 直接播放队列外歌曲时例外，见 [`PlayQueue::set_current_song`]）
/// - 队列为空时 `current_index == 0` 且 `current_song == None`；
///   判断“有没有当前歌曲”只能看 `current_song`
/// - `original_order` 在每次 `set_songs` 时捕获，`push` 同步追加，关闭随机时原样恢复
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    songs: Vec<Song>,
    original_order: Vec<Song>,
    current_index: usize,
    current_song: Option<Song>,
    shuffle: bool,
    repeat: RepeatMode,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用持久化数据恢复；越界的 index 视为“没有当前歌曲”
    pub fn restore(songs: Vec<Song>, index: usize, shuffle: bool, repeat: RepeatMode) -> Self {
        let current_song = songs.get(index).cloned();
        let current_index = if current_song.is_some() { index } else { 0 };
        Self {
            original_order: songs.clone(),
            songs,
            current_index,
            current_song,
            shuffle,
            repeat,
        }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn original_order(&self) -> &[Song] {
        &self.original_order
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&Song> {
        self.current_song.as_ref()
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// 替换队列；`start_index` 越界时退回 0
    pub fn set_songs(&mut self, songs: Vec<Song>, start_index: usize) {
        let start = if start_index < songs.len() {
            start_index
        } else {
            0
        };
        self.original_order = songs.clone();
        self.songs = songs;
        self.select(start);
    }

    /// 追加到末尾，不影响当前歌曲
    pub fn push(&mut self, song: Song) {
        self.original_order.push(song.clone());
        self.songs.push(song);
    }

    /// 删除 `index` 处的歌曲；越界返回 false
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.songs.len() {
            return false;
        }
        self.songs.remove(index);

        let new_len = self.songs.len();
        let mut cur = self.current_index;
        if index < cur {
            cur -= 1;
        } else if index == cur && new_len <= cur {
            cur = new_len.saturating_sub(1);
        }
        self.select(cur);
        true
    }

    /// 列表内移动：先移除 `from`，再插入到剩余序列的 `to`
    ///
    /// 当前歌曲按位置跟随移动，`current_index` 始终指向正在播放的那一项。
    pub fn move_song(&mut self, from: usize, to: usize) -> bool {
        let len = self.songs.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }
        let song = self.songs.remove(from);
        self.songs.insert(to, song);

        let cur = self.current_index;
        self.current_index = if cur == from {
            to
        } else if from < cur && to >= cur {
            cur - 1
        } else if from > cur && to <= cur {
            cur + 1
        } else {
            cur
        };
        true
    }

    pub fn clear(&mut self) {
        self.songs.clear();
        self.original_order.clear();
        self.current_index = 0;
        self.current_song = None;
    }

    /// 前进一首；队列为空返回 false
    ///
    /// - `RepeatMode::One`：停在当前
    /// - 到达末尾：`All` 回到 0，`Off` 停在最后一首
    pub fn advance(&mut self) -> bool {
        if self.songs.is_empty() {
            return false;
        }
        let cur = self.current_index;
        let next = match self.repeat {
            RepeatMode::One => cur,
            _ if cur + 1 < self.songs.len() => cur + 1,
            RepeatMode::All => 0,
            RepeatMode::Off => cur.min(self.songs.len() - 1),
        };
        self.select(next);
        true
    }

    /// 后退一首，0 处无条件回绕到末尾
    pub fn retreat(&mut self) -> bool {
        if self.songs.is_empty() {
            return false;
        }
        let prev = match self.current_index.checked_sub(1) {
            Some(p) if p < self.songs.len() => p,
            _ => self.songs.len() - 1,
        };
        self.select(prev);
        true
    }

    pub fn skip_to(&mut self, index: usize) -> bool {
        if index >= self.songs.len() {
            return false;
        }
        self.select(index);
        true
    }

    /// 切换随机模式，返回新的状态
    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.shuffle = !self.shuffle;
        if self.shuffle {
            let mut shuffled = self.songs.clone();
            let current_id = self.current_song.as_ref().map(|s| s.id.as_str());
            if let Some(pos) = current_id.and_then(|id| shuffled.iter().position(|s| s.id == id))
                && pos > 0
            {
                shuffled.swap(0, pos);
            }
            if shuffled.len() > 2 {
                shuffled[1..].shuffle(rng);
            }
            self.songs = shuffled;
            self.current_index = 0;
        } else {
            self.songs = self.original_order.clone();
            self.current_index = self
                .current_song
                .as_ref()
                .and_then(|cur| self.songs.iter().position(|s| s.id == cur.id))
                .unwrap_or(0);
        }
        self.shuffle
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.toggle_shuffle_with(&mut rand::thread_rng())
    }

    pub fn toggle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.next();
        self.repeat
    }

    /// 直接替换“当前歌曲”而不移动 index（播放队列外的歌曲）
    pub fn set_current_song(&mut self, song: Option<Song>) {
        self.current_song = song;
    }

    fn select(&mut self, index: usize) {
        self.current_song = self.songs.get(index).cloned();
        self.current_index = if self.current_song.is_some() { index } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_owned(),
            title: format!("Song {id}"),
            ..Default::default()
        }
    }

    fn songs(ids: &[&str]) -> Vec<Song> {
        ids.iter().map(|id| song(id)).collect()
    }

    fn ids(q: &PlayQueue) -> Vec<String> {
        q.songs().iter().map(|s| s.id.clone()).collect()
    }

    fn current_id(q: &PlayQueue) -> Option<&str> {
        q.current().map(|s| s.id.as_str())
    }

    #[test]
    fn test_set_songs_selects_start_index() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 2);
        assert_eq!(q.current_index(), 2);
        assert_eq!(current_id(&q), Some("c"));
    }

    #[test]
    fn test_set_songs_out_of_range_start_falls_back_to_zero() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b"]), 7);
        assert_eq!(q.current_index(), 0);
        assert_eq!(current_id(&q), Some("a"));
    }

    #[test]
    fn test_set_songs_empty() {
        let mut q = PlayQueue::new();
        q.set_songs(Vec::new(), 3);
        assert!(q.current().is_none());
        assert_eq!(q.current_index(), 0);
    }

    #[test]
    fn test_push_does_not_touch_current() {
        let mut q = PlayQueue::new();
        q.push(song("a"));
        assert_eq!(ids(&q), vec!["a"]);
        assert_eq!(q.current_index(), 0);
        assert!(q.current().is_none());
    }

    #[test]
    fn test_unshuffle_keeps_songs_added_after_set() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b"]), 0);
        q.toggle_shuffle_with(&mut rng);
        q.push(song("c"));
        assert!(q.skip_to(2));
        assert_eq!(current_id(&q), Some("c"));

        q.toggle_shuffle_with(&mut rng);
        assert_eq!(ids(&q), vec!["a", "b", "c"]);
        assert_eq!(q.current_index(), 2);
        assert_eq!(q.songs()[q.current_index()].id, "c");
        assert_eq!(current_id(&q), Some("c"));
    }

    #[test]
    fn test_unshuffle_after_clear_then_push() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 1);
        q.toggle_shuffle_with(&mut rng);
        q.clear();
        q.push(song("x"));
        q.push(song("y"));
        assert!(q.skip_to(1));

        q.toggle_shuffle_with(&mut rng);
        assert_eq!(ids(&q), vec!["x", "y"]);
        assert_eq!(q.songs()[q.current_index()].id, "y");
        assert_eq!(current_id(&q), Some("y"));
    }

    #[test]
    fn test_remove_before_current_shifts_left() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c", "d"]), 2);
        assert!(q.remove(0));
        assert_eq!(q.current_index(), 1);
        assert_eq!(current_id(&q), Some("c"));
    }

    #[test]
    fn test_remove_current_last_clamps() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 2);
        assert!(q.remove(2));
        assert_eq!(q.current_index(), 1);
        assert_eq!(current_id(&q), Some("b"));
    }

    #[test]
    fn test_remove_current_middle_moves_to_following_song() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 1);
        assert!(q.remove(1));
        assert_eq!(q.current_index(), 1);
        assert_eq!(current_id(&q), Some("c"));
    }

    #[test]
    fn test_remove_last_song_empties_current() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a"]), 0);
        assert!(q.remove(0));
        assert!(q.is_empty());
        assert!(q.current().is_none());
        assert_eq!(q.current_index(), 0);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b"]), 1);
        assert!(!q.remove(5));
        assert_eq!(ids(&q), vec!["a", "b"]);
        assert_eq!(current_id(&q), Some("b"));
    }

    #[test]
    fn test_move_song_list_semantics() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c", "d"]), 0);
        assert!(q.move_song(0, 2));
        assert_eq!(ids(&q), vec!["b", "c", "a", "d"]);
        assert!(q.move_song(3, 0));
        assert_eq!(ids(&q), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_move_song_keeps_current_pointing_at_playing_entry() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c", "d"]), 1);

        // 移动当前歌曲本身
        assert!(q.move_song(1, 3));
        assert_eq!(q.current_index(), 3);
        assert_eq!(q.songs()[q.current_index()].id, "b");

        // 从前面跨过当前歌曲
        assert!(q.move_song(0, 3));
        assert_eq!(q.songs()[q.current_index()].id, "b");

        // 从后面跨过当前歌曲
        assert!(q.move_song(3, 0));
        assert_eq!(q.songs()[q.current_index()].id, "b");
        assert_eq!(current_id(&q), Some("b"));
    }

    #[test]
    fn test_move_song_invalid_is_noop() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b"]), 0);
        assert!(!q.move_song(0, 2));
        assert!(!q.move_song(9, 0));
        assert_eq!(ids(&q), vec!["a", "b"]);
    }

    #[test]
    fn test_clear() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b"]), 1);
        q.clear();
        assert!(q.is_empty());
        assert!(q.original_order().is_empty());
        assert_eq!(q.current_index(), 0);
        assert!(q.current().is_none());
    }

    #[test]
    fn test_advance_repeat_off_stops_at_end() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 1);
        assert!(q.advance());
        assert_eq!(current_id(&q), Some("c"));
        assert!(q.advance());
        assert_eq!(current_id(&q), Some("c"));
        assert_eq!(q.current_index(), 2);
    }

    #[test]
    fn test_advance_repeat_all_wraps() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 2);
        q.toggle_repeat();
        assert_eq!(q.repeat(), RepeatMode::All);
        q.advance();
        assert_eq!(q.current_index(), 0);
        assert_eq!(current_id(&q), Some("a"));
    }

    #[test]
    fn test_advance_repeat_one_stays() {
        let mut q = PlayQueue::restore(songs(&["a", "b", "c"]), 0, false, RepeatMode::One);
        for _ in 0..3 {
            q.advance();
            assert_eq!(q.current_index(), 0);
        }
    }

    #[test]
    fn test_advance_empty_is_noop() {
        let mut q = PlayQueue::new();
        assert!(!q.advance());
        assert!(!q.retreat());
    }

    #[test]
    fn test_retreat_wraps_regardless_of_repeat() {
        for repeat in [RepeatMode::Off, RepeatMode::All, RepeatMode::One] {
            let mut q = PlayQueue::restore(songs(&["a", "b", "c"]), 0, false, repeat);
            q.retreat();
            assert_eq!(q.current_index(), 2, "repeat={repeat:?}");
            q.retreat();
            assert_eq!(q.current_index(), 1, "repeat={repeat:?}");
        }
    }

    #[test]
    fn test_skip_to() {
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c"]), 0);
        assert!(q.skip_to(2));
        assert_eq!(current_id(&q), Some("c"));
        assert!(!q.skip_to(3));
        assert_eq!(current_id(&q), Some("c"));
    }

    #[test]
    fn test_shuffle_keeps_current_first() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c", "d", "e", "f"]), 3);
        assert!(q.toggle_shuffle_with(&mut rng));
        assert_eq!(q.current_index(), 0);
        assert_eq!(q.songs()[0].id, "d");
        assert_eq!(current_id(&q), Some("d"));

        let mut sorted = ids(&q);
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_shuffle_round_trip_restores_original_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c", "d", "e"]), 2);
        q.toggle_shuffle_with(&mut rng);
        assert!(!q.toggle_shuffle_with(&mut rng));
        assert_eq!(ids(&q), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(q.current_index(), 2);
        assert_eq!(current_id(&q), Some("c"));
    }

    #[test]
    fn test_unshuffle_tracks_song_moved_during_shuffle() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut q = PlayQueue::new();
        q.set_songs(songs(&["a", "b", "c", "d"]), 0);
        q.toggle_shuffle_with(&mut rng);
        q.advance();
        let playing = current_id(&q).map(str::to_owned);
        q.toggle_shuffle_with(&mut rng);
        let expected = q
            .songs()
            .iter()
            .position(|s| Some(&s.id) == playing.as_ref());
        assert_eq!(Some(q.current_index()), expected);
    }

    #[test]
    fn test_shuffle_empty_queue_only_flips_flag() {
        let mut q = PlayQueue::new();
        assert!(q.toggle_shuffle());
        assert!(q.is_empty());
        assert_eq!(q.current_index(), 0);
        assert!(!q.toggle_shuffle());
    }

    #[test]
    fn test_restore_out_of_range_index() {
        let q = PlayQueue::restore(songs(&["a"]), 4, true, RepeatMode::All);
        assert!(q.current().is_none());
        assert_eq!(q.current_index(), 0);
        assert!(q.shuffle());
        assert_eq!(q.repeat(), RepeatMode::All);
    }
}
