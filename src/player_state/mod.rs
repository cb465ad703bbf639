mod persister;
mod store;

pub use persister::{PersistHandle, spawn_persister};
pub use store::{
    CURRENT_VERSION, DEFAULT_RECENTLY_PLAYED_MAX, FileStore, KeyValueStore, MemoryStore,
    PersistedState, StorageKey, load_persisted_state, load_recently_played, read_value,
    write_value,
};
