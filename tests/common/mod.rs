#![allow(dead_code)]

use pocket_player::app::PlaybackStore;
use pocket_player::domain::model::{MediaVariant, Song};
use pocket_player::player_state::{MemoryStore, PersistHandle, spawn_persister};
use std::sync::Arc;

pub fn song(id: &str) -> Song {
    Song {
        id: id.to_owned(),
        title: format!("Song {id}"),
        artist_display_name: "Artist".to_owned(),
        duration_seconds: 180,
        streams: vec![
            MediaVariant::new("96kbps", format!("https://cdn.test/{id}_96.mp4")),
            MediaVariant::new("320kbps", format!("https://cdn.test/{id}_320.mp4")),
        ],
        ..Default::default()
    }
}

pub fn songs(ids: &[&str]) -> Vec<Song> {
    ids.iter().map(|id| song(id)).collect()
}

pub fn stream_url(id: &str) -> String {
    format!("https://cdn.test/{id}_320.mp4")
}

pub fn memory_persist() -> (Arc<MemoryStore>, PersistHandle) {
    let storage = Arc::new(MemoryStore::default());
    let handle = spawn_persister(storage.clone(), 20);
    (storage, handle)
}

pub fn new_store() -> PlaybackStore {
    PlaybackStore::new(memory_persist().1)
}

pub fn queue_ids(store: &PlaybackStore) -> Vec<String> {
    store.queue().iter().map(|s| s.id.clone()).collect()
}

pub fn current_id(store: &PlaybackStore) -> Option<String> {
    store.current_song().map(|s| s.id.clone())
}
