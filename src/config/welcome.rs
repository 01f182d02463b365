//! Greeting configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;
use crate::welcome::{JoinDetection, WelcomeTemplate};

/// Subdirectory of the data dir owned by the welcome feature.
const WELCOME_DIR: &str = "welcome";

/// Name of the fallback image inside [`WELCOME_DIR`].
const DEFAULT_IMAGE: &str = "welcome.jpg";

/// Everything needed to compose a greeting. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeConfig {
    pub template: WelcomeTemplate,
    /// Local path or http(s) URL, consulted before the default image.
    pub image_path: Option<String>,
    pub default_image_path: PathBuf,
    pub detection: JoinDetection,
}

/// Shape of the optional `WELCOME_CONFIG_FILE`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WelcomeFile {
    welcome_text: Option<String>,
    image_path: Option<String>,
    system_sender_id: Option<String>,
    join_phrases: Option<Vec<String>>,
}

impl WelcomeConfig {
    /// Config with defaults rooted at `data_dir`.
    pub fn with_defaults(data_dir: &Path) -> Self {
        Self {
            template: WelcomeTemplate::default(),
            image_path: None,
            default_image_path: default_image_path(data_dir),
            detection: JoinDetection::default(),
        }
    }

    /// Load from `WELCOME_CONFIG_FILE` if set, else from `WELCOME_*` variables.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), data_dir)
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        data_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let file = match lookup("WELCOME_CONFIG_FILE").filter(|s| !s.trim().is_empty()) {
            Some(path) => read_file(Path::new(&path))?,
            None => WelcomeFile {
                welcome_text: lookup("WELCOME_TEXT"),
                image_path: lookup("WELCOME_IMAGE_PATH"),
                system_sender_id: lookup("SYSTEM_SENDER_ID"),
                join_phrases: lookup("JOIN_PHRASES").map(|raw| {
                    raw.split('|')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                }),
            },
        };

        let mut config = Self::with_defaults(data_dir);

        if let Some(text) = file.welcome_text {
            config.template = WelcomeTemplate::new(text);
        }
        config.image_path = file
            .image_path
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(sender) = file.system_sender_id.filter(|s| !s.trim().is_empty()) {
            config.detection.system_sender_id = sender.trim().to_string();
        }
        if let Some(phrases) = file.join_phrases {
            if phrases.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "join_phrases",
                    message: "at least one phrase is required".to_string(),
                });
            }
            config.detection.join_phrases = phrases;
        }

        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<WelcomeFile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn default_image_path(data_dir: &Path) -> PathBuf {
    data_dir.join(WELCOME_DIR).join(DEFAULT_IMAGE)
}

/// Create the welcome image directory under `data_dir` if absent.
pub fn ensure_data_dir(data_dir: &Path) -> Result<PathBuf, ConfigError> {
    let dir = data_dir.join(WELCOME_DIR);
    fs::create_dir_all(&dir).map_err(|source| ConfigError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
