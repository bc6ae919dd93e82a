//! Content loaders for reading session data from files.
//!
//! Settings come from TOML, mandates and crises from RON. Every loader
//! returns core types so callers never see the file formats.

pub mod catalog;
pub mod factory;
pub mod settings;

pub use catalog::{CrisisLoader, MandateLoader};
pub use factory::ContentFactory;
pub use settings::SettingsLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
