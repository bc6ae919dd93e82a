//! Content factory for loading session content from a data directory.

use std::path::{Path, PathBuf};

use alignment_core::{Catalog, Crisis, Mandate, SessionSettings};

use crate::loaders::{CrisisLoader, LoadResult, MandateLoader, SettingsLoader};

/// Content factory that loads all session content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── settings.toml
/// ├── mandates.ron
/// └── crises.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub const SETTINGS_FILE: &'static str = "settings.toml";
    pub const MANDATES_FILE: &'static str = "mandates.ron";
    pub const CRISES_FILE: &'static str = "crises.ron";

    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load default session settings from `settings.toml`.
    pub fn load_settings(&self) -> LoadResult<SessionSettings> {
        SettingsLoader::load(&self.data_dir.join(Self::SETTINGS_FILE))
    }

    /// Load mandates from `mandates.ron`.
    pub fn load_mandates(&self) -> LoadResult<Vec<Mandate>> {
        MandateLoader::load(&self.data_dir.join(Self::MANDATES_FILE))
    }

    /// Load crises from `crises.ron`.
    pub fn load_crises(&self) -> LoadResult<Vec<Crisis>> {
        CrisisLoader::load(&self.data_dir.join(Self::CRISES_FILE))
    }

    /// Load the full mandate and crisis catalog.
    pub fn load_catalog(&self) -> LoadResult<Catalog> {
        Ok(Catalog::new(self.load_mandates()?, self.load_crises()?))
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;

    fn shipped_data() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../data")
    }

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn shipped_data_matches_builtin_catalog() {
        let factory = ContentFactory::new(shipped_data());
        assert_eq!(factory.load_catalog().unwrap(), builtin_catalog());
    }

    #[test]
    fn shipped_settings_are_valid() {
        let settings = ContentFactory::new(shipped_data()).load_settings().unwrap();
        assert_eq!(settings, SessionSettings::default());
    }

    #[test]
    fn loads_from_a_custom_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.toml"), "max_players = 6\n").unwrap();
        std::fs::write(
            dir.path().join("mandates.ron"),
            r#"(mandates: [(kind: "OPEN_DOOR", name: "Open Door", effects: (public_voting_only: true))])"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("crises.ron"), "(crises: [])").unwrap();

        let factory = ContentFactory::new(dir.path());
        assert_eq!(factory.load_settings().unwrap().max_players, 6);
        let catalog = factory.load_catalog().unwrap();
        assert!(catalog.mandate("open_door").is_some());
        assert!(catalog.crises.is_empty());
    }

    #[test]
    fn missing_files_report_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentFactory::new(dir.path()).load_crises().unwrap_err();
        assert!(err.to_string().contains("crises.ron"));
    }
}
