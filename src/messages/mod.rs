pub mod player;

pub use player::{PlayerCommand, PlayerEvent};
