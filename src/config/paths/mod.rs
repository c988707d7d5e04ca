//! Platform path resolution.

mod platform;

pub use platform::{
    default_store_path, global_config_path, preferences_dir, DEFAULT_FILE_NAME, HOME_ENV,
};
