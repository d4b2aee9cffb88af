use crate::theme::Theme;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEFAULT_SETTINGS_PATH: &str = "~/.dice-chamber/settings.json";

/// Locally persisted preferences.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "characterName", default)]
    pub character_name: String,
    #[serde(default)]
    pub theme: Theme,
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Expands `~` and environment variables in `raw`.
    pub fn expanded(raw: &str) -> Result<Self> {
        let path = shellexpand::full(raw)
            .wrap_err_with(|| format!("Failed to expand settings path {raw}"))?;
        Ok(Self::new(path.into_owned()))
    }

    pub fn default_location() -> Result<Self> {
        Self::expanded(DEFAULT_SETTINGS_PATH)
    }

    /// A missing file reads as default settings.
    pub fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let data = fs::read(&self.path).wrap_err_with(|| {
            format!("Failed to read settings file {}", self.path.display())
        })?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Settings::default());
        }
        serde_json::from_slice(&data).wrap_err_with(|| {
            format!("Failed to parse settings file {}", self.path.display())
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let json =
            serde_json::to_vec_pretty(settings).wrap_err("Failed to serialize settings")?;
        fs::write(&self.path, json).wrap_err_with(|| {
            format!("Failed to write settings file {}", self.path.display())
        })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
