//! Session settings loader.

use std::path::Path;

use alignment_core::SessionSettings;

use crate::loaders::{LoadResult, read_file};

/// Loader for per-session tunables from TOML.
///
/// Missing keys keep their defaults; the result is validated before it is
/// returned.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> LoadResult<SessionSettings> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> LoadResult<SessionSettings> {
        let settings: SessionSettings = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse settings TOML: {}", e))?;
        settings
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid session settings: {}", e))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn partial_files_keep_defaults() {
        let settings = SettingsLoader::parse(
            r#"
            max_players = 8
            seed = 42

            [phase_durations]
            discussion = 90.5
            "#,
        )
        .unwrap();

        assert_eq!(settings.max_players, 8);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.min_players, SessionSettings::DEFAULT_MIN_PLAYERS);
        assert_eq!(
            settings.phase_durations.discussion,
            Duration::from_secs_f64(90.5)
        );
        assert_eq!(settings.phase_durations.night, Duration::from_secs(30));
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let err = SettingsLoader::parse("min_players = 6\nmax_players = 4\n").unwrap_err();
        assert!(err.to_string().contains("Invalid session settings"));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(SettingsLoader::parse("max_players = \"many\"").is_err());
    }
}
