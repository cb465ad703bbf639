pub mod store;

pub use store::{PlayerSettings, default_data_dir, load_settings, save_settings};
