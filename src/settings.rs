//! User settings (`settings.json`): where the roadmap lives and how to reach Jira.
//!
//! Values given on the command line or through the environment take
//! precedence over the file; see [`Settings::apply_overrides`].

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};
use crate::jira::JiraCredentials;
use crate::storage::FileStore;

const DEFAULT_STORY_DELAY_MS: u64 = 200;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub jira: JiraSettings,
    /// Pause between story requests during an epic import.
    #[serde(default = "default_story_delay_ms")]
    pub story_delay_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<u64>,
}

fn default_story_delay_ms() -> u64 {
    DEFAULT_STORY_DELAY_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            jira: JiraSettings::default(),
            story_delay_ms: DEFAULT_STORY_DELAY_MS,
        }
    }
}

impl Settings {
    /// `<config dir>/roadmap-planner/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::metadata::PKG_NAME).join("settings.json"))
    }

    /// A missing file yields the defaults. A file that does not parse is an error.
    pub fn load(path: &Path) -> ServiceResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let settings = serde_json::from_str(&content).map_err(|e| {
                    ServiceError::FromString(format!("Invalid settings file {}: {e}", path.display()))
                })?;
                Ok(settings)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> ServiceResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = path.with_extension("json.tmp");
        let mut f = File::create(&temp)?;
        f.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, path)?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn apply_overrides(&mut self, data_dir: Option<PathBuf>, jira: JiraSettings) {
        if data_dir.is_some() {
            self.data_dir = data_dir;
        }
        self.jira.merge(jira);
    }

    pub fn data_dir(&self) -> ServiceResult<PathBuf> {
        self.data_dir
            .clone()
            .or_else(FileStore::default_dir)
            .ok_or_else(|| ServiceError::FromString("No data directory available; pass --data-dir".into()))
    }

    pub fn story_delay(&self) -> Duration {
        Duration::from_millis(self.story_delay_ms)
    }
}

impl JiraSettings {
    /// Takes every value that is set in `other`.
    pub fn merge(&mut self, other: JiraSettings) {
        if other.domain.is_some() {
            self.domain = other.domain;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.api_token.is_some() {
            self.api_token = other.api_token;
        }
        if other.board_id.is_some() {
            self.board_id = other.board_id;
        }
    }

    pub fn credentials(&self) -> ServiceResult<JiraCredentials> {
        Ok(JiraCredentials::new(
            required(&self.domain, "domain")?,
            required(&self.email, "email")?,
            required(&self.api_token, "apiToken")?,
        ))
    }

    pub fn board_id(&self) -> ServiceResult<u64> {
        self.board_id.ok_or(ServiceError::MissingJiraSetting("boardId"))
    }
}

fn required(value: &Option<String>, name: &'static str) -> ServiceResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ServiceError::MissingJiraSetting(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.story_delay(), Duration::from_millis(200));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.jira.domain = Some("acme.atlassian.net".into());
        settings.jira.board_id = Some(12);
        settings.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"boardId\": 12"));
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn garbage_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn overrides_win_and_missing_values_are_named() {
        let mut settings = Settings::default();
        settings.jira.domain = Some("file.atlassian.net".into());
        settings.jira.email = Some("file@example.com".into());
        settings.apply_overrides(
            Some(PathBuf::from("/tmp/roadmap")),
            JiraSettings {
                domain: Some("env.atlassian.net".into()),
                ..JiraSettings::default()
            },
        );
        assert_eq!(settings.data_dir().unwrap(), PathBuf::from("/tmp/roadmap"));
        assert_eq!(settings.jira.domain.as_deref(), Some("env.atlassian.net"));
        assert_eq!(settings.jira.email.as_deref(), Some("file@example.com"));
        assert!(matches!(
            settings.jira.credentials(),
            Err(ServiceError::MissingJiraSetting("apiToken"))
        ));
        assert!(matches!(
            settings.jira.board_id(),
            Err(ServiceError::MissingJiraSetting("boardId"))
        ));
    }
}
