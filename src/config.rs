//! Toolkit configuration (`rotina.toml`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

/// Config file name looked up in the working directory.
pub const CONFIG_FILE: &str = "rotina.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerSettings,
    #[serde(default)]
    pub speech: SpeechSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

/// Voice-listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerSettings {
    /// Phrase that starts the routine when heard. Matching is a
    /// case-insensitive substring test on the transcript.
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// Seconds of audio captured per listening iteration.
    #[serde(default = "default_phrase_secs")]
    pub phrase_secs: f32,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self { trigger: default_trigger(), phrase_secs: default_phrase_secs() }
    }
}

fn default_trigger() -> String {
    "bom dia".to_string()
}

fn default_phrase_secs() -> f32 {
    5.0
}

/// Speech-recognition settings.
///
/// The endpoint is any HTTP bridge that accepts a wav body and replies
/// with `{"transcript": "..."}`; the default points at a recognizer on
/// the local machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSettings {
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    /// Language tag sent with the request.
    #[serde(default = "default_language")]
    pub language: String,

    /// Environment variable holding the API key; sent as a bearer token
    /// when set and non-empty.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            endpoint: default_speech_endpoint(),
            language: default_language(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_speech_endpoint() -> String {
    "http://127.0.0.1:9123/transcribe".to_string()
}

fn default_language() -> String {
    "pt-BR".to_string()
}

fn default_api_key_env() -> String {
    "ROTINA_SPEECH_API_KEY".to_string()
}

/// Configurator server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_port() -> u16 {
    8765
}

/// File locations, resolved relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Credential store.
    #[serde(default = "default_store_file")]
    pub store_file: PathBuf,

    /// Folder with reference template images.
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,

    /// Routine manifest consumed by `rotina run`.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            store_file: default_store_file(),
            images_dir: default_images_dir(),
            manifest_file: default_manifest_file(),
        }
    }
}

fn default_store_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_manifest_file() -> PathBuf {
    PathBuf::from("routine.toml")
}

impl Config {
    /// Get the global config file path (~/.rotina/rotina.toml)
    pub fn global_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rotina")
            .join(CONFIG_FILE)
    }

    /// Load configuration: an explicit `--config` path wins, then
    /// `rotina.toml` in the working directory, then the global file.
    /// When none exists the defaults apply.
    pub fn load(explicit: Option<&Path>, work_dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let local = work_dir.join(CONFIG_FILE);
        if local.exists() {
            return Self::from_file(&local);
        }
        let global = Self::global_config_path();
        if global.exists() {
            return Self::from_file(&global);
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a file with atomic write and file locking.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        // Exclusive lock prevents concurrent writes from two processes;
        // temp file + rename keeps the config intact on crash.
        let lock_path = path.with_extension("toml.lock");
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;
        lock_file.lock_exclusive().with_context(|| "Failed to acquire config lock")?;

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        temp_file
            .write_all(content.as_bytes())
            .with_context(|| "Failed to write config content")?;
        temp_file.sync_all().with_context(|| "Failed to sync config file")?;

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename config file: {}", path.display()))?;

        Ok(())
    }

    /// Write a default `rotina.toml` into the working directory.
    pub fn init(work_dir: &Path, force: bool) -> Result<PathBuf> {
        let path = work_dir.join(CONFIG_FILE);
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        Self::default().save_to_file(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.listener.trigger, "bom dia");
        assert_eq!(parsed.speech.language, "pt-BR");
        assert_eq!(parsed.server.port, 8765);
        assert_eq!(parsed.paths.store_file, PathBuf::from(".env"));
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let parsed: Config = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.listener.trigger, "bom dia");
        assert!((parsed.listener.phrase_secs - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = Config::init(dir.path(), false).unwrap();
        assert!(path.exists());
        assert!(Config::init(dir.path(), false).is_err());
        assert!(Config::init(dir.path(), true).is_ok());
    }
}
