use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, File};
use std::path::Path;
use std::time::Duration;

use crate::clients::coc::DEFAULT_COC_BASE_URL;
use crate::clients::HttpClientConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub log_level: String,
    /// Where the terminal UI writes its log. Logging is off in the UI when unset.
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub coc_base_url: String,
    pub scoring_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub database_url: String,
    pub autosave_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub default_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "CWL Bonus".to_string(),
                log_level: "info".to_string(),
                log_file: None,
            },
            api: ApiSettings {
                coc_base_url: DEFAULT_COC_BASE_URL.to_string(),
                scoring_url: "https://cwl-server-backend.onrender.com/".to_string(),
                timeout_seconds: 30,
                max_retries: 3,
            },
            session: SessionSettings {
                database_url: "sqlite://cwl_session.db".to_string(),
                autosave_interval_seconds: 360, // 6 minutes
            },
            export: ExportSettings {
                default_path: "cwl_bonus_scores.csv".to_string(),
            },
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CWL_BONUS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?;

        s.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api.scoring_url.trim().is_empty() {
            return Err("Scoring URL must not be empty".to_string());
        }

        if self.api.timeout_seconds == 0 {
            return Err("API timeout must be at least one second".to_string());
        }

        if self.session.autosave_interval_seconds == 0 {
            return Err("Autosave interval must be at least one second".to_string());
        }

        Ok(())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.session.autosave_interval_seconds)
    }

    pub fn coc_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.api.coc_base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_seconds),
            max_retries: self.api.max_retries,
        }
    }

    pub fn scoring_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.api.scoring_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_seconds),
            max_retries: self.api.max_retries,
        }
    }
}
