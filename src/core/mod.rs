mod actor;
mod controller;

pub use actor::{PlayerDeps, spawn_player_actor};
pub use controller::PlaybackController;
