use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Theme;
use crate::error::ExplorerError;

pub const THEME_KEY: &str = "idpkg_theme_color";

#[derive(Debug, Default, Deserialize, Serialize)]
struct PreferencesFile {
    #[serde(rename = "idpkg_theme_color", default)]
    theme: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeResult {
    pub theme: Theme,
    pub path: String,
}

/// The stored UI theme. Lives in one small JSON file.
#[derive(Debug, Clone)]
pub struct Preferences {
    path: Utf8PathBuf,
}

impl Preferences {
    pub fn new() -> Result<Self, ExplorerError> {
        let path = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.config_dir()
                        .join("idp-explorer")
                        .join("preferences.json"),
                )
                .ok()
            })
            .ok_or_else(|| {
                ExplorerError::Filesystem("unable to resolve config directory".to_string())
            })?;
        Ok(Self { path })
    }

    pub fn new_with_path(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Stored theme; anything missing or unrecognised reads as the default.
    pub fn theme(&self) -> Theme {
        let Ok(content) = fs::read_to_string(self.path.as_std_path()) else {
            return Theme::default();
        };
        match serde_json::from_str::<PreferencesFile>(&content) {
            Ok(file) => file
                .theme
                .as_deref()
                .map(Theme::from_name)
                .unwrap_or_default(),
            Err(err) => {
                debug!(path = %self.path, "ignoring unreadable preferences: {err}");
                Theme::default()
            }
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), ExplorerError> {
        let file = PreferencesFile {
            theme: Some(theme.as_str().to_string()),
        };
        let content = serde_json::to_vec_pretty(&file)
            .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&self.path, &content)
    }
}

fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ExplorerError> {
    let parent = path
        .parent()
        .ok_or_else(|| ExplorerError::Filesystem("invalid preferences path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("idp-explorer-prefs")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ExplorerError::Filesystem(err.to_string()))?;
    Ok(())
}
