mod play_queue;
pub mod state;
mod store;

pub use play_queue::PlayQueue;
pub use state::*;
pub use store::PlaybackStore;
