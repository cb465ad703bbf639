pub mod model;
pub mod stream;

pub use model::{MediaVariant, Song};
