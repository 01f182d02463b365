//! Welcome image resolution.
//!
//! Precedence: configured local file, then the default file in the data
//! directory, then the configured value as a remote URL. The filesystem is
//! probed on every call so an operator can drop a new image in at any time.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Where the attached image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    LocalFile(PathBuf),
    RemoteUrl(Url),
}

/// Image could not be used. Never fatal for the greeting.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image {path} cannot be read: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("image url {url} is malformed: {reason}")]
    MalformedUrl { url: String, reason: String },
}

/// Result of a single filesystem probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Missing,
    Readable,
    Unreadable(String),
}

/// Minimal filesystem capability needed by the resolver.
pub trait FileProbe: Send + Sync {
    fn probe(&self, path: &Path) -> FileState;
}

/// Probes the real filesystem: one metadata call and one open, no retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileProbe for LocalFs {
    fn probe(&self, path: &Path) -> FileState {
        match path.metadata() {
            Ok(meta) if meta.is_file() => match File::open(path) {
                Ok(_) => FileState::Readable,
                Err(e) => FileState::Unreadable(e.to_string()),
            },
            Ok(_) => FileState::Missing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => FileState::Missing,
            Err(e) => FileState::Unreadable(e.to_string()),
        }
    }
}

/// Stands in for the filesystem when probing is not possible in time.
#[derive(Debug, Clone)]
pub struct UnavailableFs {
    pub reason: String,
}

impl FileProbe for UnavailableFs {
    fn probe(&self, _path: &Path) -> FileState {
        FileState::Unreadable(self.reason.clone())
    }
}

/// Resolve the image to attach, if any.
///
/// `Ok(None)` means nothing is configured or present; the caller decides
/// how loudly to report it.
pub fn resolve_media(
    configured: Option<&str>,
    default_path: &Path,
    probe: &dyn FileProbe,
) -> Result<Option<MediaSource>, MediaError> {
    let configured = configured.map(str::trim).filter(|s| !s.is_empty());

    if let Some(path) = configured {
        if let Some(found) = local_file(Path::new(path), probe)? {
            return Ok(Some(found));
        }
    }

    // An unreadable default image still lets a configured URL through.
    let default_err = match local_file(default_path, probe) {
        Ok(Some(found)) => return Ok(Some(found)),
        Ok(None) => None,
        Err(e) => Some(e),
    };

    match configured {
        Some(raw) if is_remote(raw) => match Url::parse(raw) {
            Ok(url) => Ok(Some(MediaSource::RemoteUrl(url))),
            Err(e) => Err(default_err.unwrap_or_else(|| MediaError::MalformedUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            })),
        },
        _ => default_err.map_or(Ok(None), Err),
    }
}

fn local_file(path: &Path, probe: &dyn FileProbe) -> Result<Option<MediaSource>, MediaError> {
    match probe.probe(path) {
        FileState::Readable => Ok(Some(MediaSource::LocalFile(path.to_path_buf()))),
        FileState::Missing => Ok(None),
        FileState::Unreadable(reason) => Err(MediaError::Unreadable {
            path: path.to_path_buf(),
            reason,
        }),
    }
}

fn is_remote(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    /// In-memory probe keyed by path.
    #[derive(Default)]
    struct FakeFs(HashMap<PathBuf, FileState>);

    impl FakeFs {
        fn with(mut self, path: &str, state: FileState) -> Self {
            self.0.insert(PathBuf::from(path), state);
            self
        }
    }

    impl FileProbe for FakeFs {
        fn probe(&self, path: &Path) -> FileState {
            self.0.get(path).cloned().unwrap_or(FileState::Missing)
        }
    }

    const DEFAULT: &str = "/data/welcome/welcome.jpg";

    #[test]
    fn test_configured_file_wins() {
        let fs = FakeFs::default()
            .with("/img/a.png", FileState::Readable)
            .with(DEFAULT, FileState::Readable);
        let media = resolve_media(Some("/img/a.png"), Path::new(DEFAULT), &fs).unwrap();
        assert_eq!(media, Some(MediaSource::LocalFile("/img/a.png".into())));
    }

    #[test]
    fn test_default_file_when_configured_missing() {
        let fs = FakeFs::default().with(DEFAULT, FileState::Readable);
        let media = resolve_media(Some("/img/gone.png"), Path::new(DEFAULT), &fs).unwrap();
        assert_eq!(media, Some(MediaSource::LocalFile(DEFAULT.into())));
    }

    #[test]
    fn test_default_beats_remote_url() {
        let fs = FakeFs::default().with(DEFAULT, FileState::Readable);
        let media =
            resolve_media(Some("https://example.com/w.jpg"), Path::new(DEFAULT), &fs).unwrap();
        assert_eq!(media, Some(MediaSource::LocalFile(DEFAULT.into())));
    }

    #[test]
    fn test_remote_url_when_no_files() {
        let media = resolve_media(
            Some("https://example.com/w.jpg"),
            Path::new(DEFAULT),
            &FakeFs::default(),
        )
        .unwrap();
        let url = Url::parse("https://example.com/w.jpg").unwrap();
        assert_eq!(media, Some(MediaSource::RemoteUrl(url)));
    }

    #[test]
    fn test_nothing_available() {
        let fs = FakeFs::default();
        assert_eq!(resolve_media(None, Path::new(DEFAULT), &fs).unwrap(), None);
        assert_eq!(resolve_media(Some("  "), Path::new(DEFAULT), &fs).unwrap(), None);
        assert_eq!(
            resolve_media(Some("ftp://example.com/w.jpg"), Path::new(DEFAULT), &fs).unwrap(),
            None
        );
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let fs = FakeFs::default().with("/img/a.png", FileState::Unreadable("denied".into()));
        let err = resolve_media(Some("/img/a.png"), Path::new(DEFAULT), &fs).unwrap_err();
        assert!(matches!(err, MediaError::Unreadable { .. }));
    }

    #[test]
    fn test_unreadable_default_falls_through_to_url() {
        let fs = FakeFs::default().with(DEFAULT, FileState::Unreadable("EACCES".into()));
        let media =
            resolve_media(Some("https://example.com/w.jpg"), Path::new(DEFAULT), &fs).unwrap();
        let url = Url::parse("https://example.com/w.jpg").unwrap();
        assert_eq!(media, Some(MediaSource::RemoteUrl(url)));
    }

    #[test]
    fn test_unreadable_default_without_url_is_error() {
        let fs = FakeFs::default().with(DEFAULT, FileState::Unreadable("EACCES".into()));
        let err = resolve_media(None, Path::new(DEFAULT), &fs).unwrap_err();
        assert!(matches!(err, MediaError::Unreadable { ref path, .. } if path == Path::new(DEFAULT)));

        let err = resolve_media(Some("http://"), Path::new(DEFAULT), &fs).unwrap_err();
        assert!(matches!(err, MediaError::Unreadable { .. }));
    }

    #[test]
    fn test_malformed_url_is_error() {
        let err = resolve_media(Some("http://"), Path::new(DEFAULT), &FakeFs::default())
            .unwrap_err();
        assert!(matches!(err, MediaError::MalformedUrl { .. }));
    }

    #[test]
    fn test_unavailable_fs_reports_unreadable() {
        let fs = UnavailableFs {
            reason: "timed out".into(),
        };
        let err = resolve_media(None, Path::new(DEFAULT), &fs).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_local_fs_probe() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("welcome.jpg");

        assert_eq!(LocalFs.probe(&image), FileState::Missing);
        assert_eq!(LocalFs.probe(dir.path()), FileState::Missing);

        let mut file = File::create(&image).unwrap();
        file.write_all(b"\xff\xd8\xff").unwrap();
        assert_eq!(LocalFs.probe(&image), FileState::Readable);
    }

    #[test]
    fn test_reprobes_on_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let default = dir.path().join("welcome.jpg");

        assert_eq!(resolve_media(None, &default, &LocalFs).unwrap(), None);

        File::create(&default).unwrap();
        assert_eq!(
            resolve_media(None, &default, &LocalFs).unwrap(),
            Some(MediaSource::LocalFile(default.clone()))
        );
    }
}
