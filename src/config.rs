use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::datetime::{DateLocale, TimestampFormat};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub schedule_path: PathBuf,
    pub date_format: String,
    pub date_locale: DateLocale,
    pub completed_status: String,
    pub delimiter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schedule_path: PathBuf::from("class_schedule.json"),
            date_format: "%d %B %Y %X".to_string(),
            date_locale: DateLocale::Fr,
            completed_status: "Terminée".to_string(),
            delimiter: ",".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.delimiter_byte()?;
        Ok(config)
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        TimestampFormat::new(&self.date_format, self.date_locale)
    }

    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(ConfigError::Delimiter(self.delimiter.clone())),
        }
    }
}
