//! Layered settings for filesystem-backed workspace projects.
//!
//! Settings are merged from three sources, later ones winning:
//! a user-level `loupe.toml` in the platform config directory, then
//! `.loupe.toml` and `loupe.toml` in the project root.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
    #[error("failed to read or write a settings file")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize settings")]
    Serialize(#[from] toml::ser::Error),
}

/// Watcher tuning for a filesystem project.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WatchSettings {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: 250,
        }
    }
}

/// Settings controlling how a filesystem project discovers and tracks
/// artifacts under its root.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Folders (relative to the project root) whose contents are never
    /// registered.
    pub excluded_folders: Vec<Utf8PathBuf>,
    /// Include hidden files and directories during discovery.
    pub include_hidden: bool,
    /// Follow symbolic links during discovery.
    pub follow_links: bool,
    /// Honor `.gitignore`/`.ignore` rules during discovery.
    pub respect_ignore_files: bool,
    pub watch: WatchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            excluded_folders: Vec::new(),
            include_hidden: false,
            follow_links: false,
            respect_ignore_files: true,
            watch: WatchSettings::default(),
        }
    }
}

impl Settings {
    pub fn new(project_root: &Utf8Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("io.github", "loupe", "loupe")
            .map(|proj_dirs| proj_dirs.config_dir().join("loupe.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Utf8Path,
        user_config_path: Option<&std::path::Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(".loupe.toml").as_std_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("loupe.toml").as_std_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;
        tracing::debug!(
            root = %project_root,
            excluded = settings.excluded_folders.len(),
            "loaded project settings"
        );
        Ok(settings)
    }

    /// Persist the current exclusion list to `.loupe.toml` in the
    /// project root so the next discovery pass honors it.
    ///
    /// Only the exclusion list is written; the other fields keep coming
    /// from the layered sources.
    pub fn save_excluded_folders(&self, project_root: &Utf8Path) -> Result<(), ConfigError> {
        #[derive(Serialize)]
        struct Persisted<'a> {
            excluded_folders: &'a [Utf8PathBuf],
        }

        let body = toml::to_string(&Persisted {
            excluded_folders: &self.excluded_folders,
        })?;
        fs::write(project_root.join(".loupe.toml").as_std_path(), body)?;
        Ok(())
    }
}
