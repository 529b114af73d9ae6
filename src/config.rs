//! Settings: `atm.toml` (or an explicit file) plus environment overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::Amount;
use crate::controller::{PIN_LENGTH, Rules};
use crate::speech::{Backoff, DEFAULT_ENDPOINT, TtsOptions};
use crate::store::{AccountDefaults, DEFAULT_PIN, DEFAULT_STARTING_BALANCE};

pub const DEFAULT_CONFIG_FILE: &str = "atm.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    #[error("starting balance {0} must not be negative")]
    NegativeBalance(Amount),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store_path: PathBuf,
    pub account: AccountSettings,
    pub speech: SpeechSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/account.json"),
            account: AccountSettings::default(),
            speech: SpeechSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    pub pin: String,
    /// Balance of a freshly provisioned account, in rupees.
    pub starting_balance: Amount,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN.to_string(),
            starting_balance: DEFAULT_STARTING_BALANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub clip_dir: Option<PathBuf>,
    pub player: Option<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        let backoff = Backoff::default();
        Self {
            enabled: true,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_attempts: backoff.max_attempts,
            base_delay_ms: backoff.base.as_millis() as u64,
            clip_dir: None,
            player: None,
        }
    }
}

impl Settings {
    /// Override fields from environment variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("ATM_STORE_PATH") {
            self.store_path = PathBuf::from(v);
        }
        if let Some(v) = var("ATM_PIN") {
            self.account.pin = v;
        }
        if let Some(v) = var("GEMINI_API_KEY").filter(|v| !v.is_empty()) {
            self.speech.api_key = Some(v);
        }
        if let Some(v) = var("ATM_TTS_PLAYER") {
            self.speech.player = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pin = &self.account.pin;
        if pin.len() != PIN_LENGTH || !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidPin);
        }
        if self.account.starting_balance < Amount::ZERO {
            return Err(ConfigError::NegativeBalance(self.account.starting_balance));
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules::with_pin(self.account.pin.clone())
    }

    pub fn account_defaults(&self) -> AccountDefaults {
        AccountDefaults {
            starting_balance: self.account.starting_balance,
            pin: self.account.pin.clone(),
        }
    }

    /// TTS client options, or `None` when speech is disabled or has no API key.
    pub fn tts_options(&self) -> Option<TtsOptions> {
        if !self.speech.enabled {
            return None;
        }
        let api_key = self.speech.api_key.clone()?;
        Some(TtsOptions {
            endpoint: self.speech.endpoint.clone(),
            api_key,
            backoff: Backoff {
                base: Duration::from_millis(self.speech.base_delay_ms),
                max_attempts: self.speech.max_attempts,
            },
            clip_dir: self.speech.clip_dir.clone(),
            player: self.speech.player.clone(),
        })
    }
}

fn read_file(path: &Path) -> Result<Settings, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load settings.
///
/// An explicit `path` must exist. Without one, `atm.toml` in the working
/// directory is used if present, defaults otherwise. Environment overrides
/// are applied last.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(path) => read_file(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.exists() {
                read_file(default)?
            } else {
                Settings::default()
            }
        }
    };
    settings.apply_env(|key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.account.pin, "1234");
        assert_eq!(settings.account.starting_balance, Amount::from_rupees(5000));
        assert_eq!(settings.speech.max_attempts, 3);
        assert_eq!(settings.speech.base_delay_ms, 1000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_toml(
            r#"
store_path = "/tmp/atm.json"

[account]
starting_balance = 10000.0

[speech]
player = "aplay"
"#,
        );
        let settings = read_file(file.path()).unwrap();
        assert_eq!(settings.store_path, PathBuf::from("/tmp/atm.json"));
        assert_eq!(settings.account.starting_balance, Amount::from_rupees(10_000));
        assert_eq!(settings.account.pin, "1234");
        assert_eq!(settings.speech.player.as_deref(), Some("aplay"));
        assert!(settings.speech.enabled);
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let file = write_toml("store_path = [");
        assert!(matches!(
            read_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let result = load_settings(Some(Path::new("/nonexistent/atm.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ATM_PIN", "4321"),
            ("ATM_STORE_PATH", "/var/atm.json"),
            ("GEMINI_API_KEY", "secret"),
        ]);
        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.account.pin, "4321");
        assert_eq!(settings.store_path, PathBuf::from("/var/atm.json"));
        assert_eq!(settings.speech.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.rules().pin, "4321");
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|k| (k == "GEMINI_API_KEY").then(String::new));
        assert!(settings.speech.api_key.is_none());
        assert!(settings.tts_options().is_none());
    }

    #[test]
    fn bad_pin_is_rejected() {
        for pin in ["123", "12345", "12a4"] {
            let mut settings = Settings::default();
            settings.account.pin = pin.to_string();
            assert!(matches!(settings.validate(), Err(ConfigError::InvalidPin)));
        }
    }

    #[test]
    fn tts_options_follow_settings() {
        let mut settings = Settings::default();
        settings.speech.api_key = Some("key".to_string());
        settings.speech.base_delay_ms = 250;
        settings.speech.max_attempts = 5;

        let options = settings.tts_options().unwrap();
        assert_eq!(options.api_key, "key");
        assert_eq!(options.backoff.base, Duration::from_millis(250));
        assert_eq!(options.backoff.max_attempts, 5);

        settings.speech.enabled = false;
        assert!(settings.tts_options().is_none());
    }
}
