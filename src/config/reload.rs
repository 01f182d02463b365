//! Hot reload of the welcome configuration.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use super::{ConfigError, SharedConfig, WelcomeConfig};

/// Re-read `.env` and the welcome settings, then swap them in.
///
/// On failure the previous configuration stays active.
pub fn reload(shared: &SharedConfig, data_dir: &Path) -> Result<(), ConfigError> {
    dotenvy::dotenv_override().ok();
    reload_from(|key| env::var(key).ok(), shared, data_dir)
}

/// Build the next config from `lookup` and swap it in only if it is valid.
pub(crate) fn reload_from(
    lookup: impl Fn(&str) -> Option<String>,
    shared: &SharedConfig,
    data_dir: &Path,
) -> Result<(), ConfigError> {
    let next = WelcomeConfig::from_lookup(lookup, data_dir)?;
    shared.replace(next);
    Ok(())
}

/// Reload on every SIGHUP until the process exits.
#[cfg(unix)]
pub fn spawn_sighup_reload(shared: SharedConfig, data_dir: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangups = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                error!("Cannot listen for SIGHUP, hot reload disabled: {}", e);
                return;
            }
        };

        while hangups.recv().await.is_some() {
            match reload(&shared, &data_dir) {
                Ok(()) => info!(
                    "Welcome configuration reloaded (template: {})",
                    shared.snapshot().template
                ),
                Err(e) => error!("Welcome configuration reload failed, keeping previous: {}", e),
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_sighup_reload(_shared: SharedConfig, _data_dir: PathBuf) {
    info!("Hot reload via SIGHUP is only available on unix");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::vars;
    use std::fs;

    #[test]
    fn test_failed_reload_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedConfig::new(WelcomeConfig::with_defaults(dir.path()));
        let before = shared.snapshot();

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ \"welcome_text\": ").unwrap();
        let broken = broken.to_string_lossy().to_string();

        let err = reload_from(
            vars(&[("WELCOME_CONFIG_FILE", broken.as_str())]),
            &shared,
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert_eq!(*shared.snapshot(), *before);
    }

    #[test]
    fn test_successful_reload_swaps() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedConfig::new(WelcomeConfig::with_defaults(dir.path()));

        let file = dir.path().join("welcome.json");
        fs::write(&file, r#"{ "welcome_text": "Hello {at}" }"#).unwrap();
        let file = file.to_string_lossy().to_string();

        reload_from(
            vars(&[("WELCOME_CONFIG_FILE", file.as_str())]),
            &shared,
            dir.path(),
        )
        .unwrap();
        assert_eq!(shared.snapshot().template.as_str(), "Hello {at}");
    }
}
