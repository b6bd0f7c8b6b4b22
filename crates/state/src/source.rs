use std::fmt;
use std::path::{Path, PathBuf};

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaLocator {
    File(PathBuf),
    Url(String),
}

impl MediaLocator {
    /// Parses a host-supplied `src` string. Anything with an `http://` or
    /// `https://` scheme is a URL, `file://` is stripped, the rest is a path.
    pub fn parse(src: &str) -> Self {
        let trimmed = src.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else if let Some(rest) = trimmed.strip_prefix("file://") {
            Self::File(PathBuf::from(rest))
        } else {
            Self::File(PathBuf::from(trimmed))
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Url(_) => None,
        }
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

/// A playable resource handed over by the host. `revision` is bumped when
/// the bytes behind the locator change, which counts as a source change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub id: SourceId,
    pub locator: MediaLocator,
    pub revision: u32,
}

impl MediaSource {
    pub fn new(src: &str) -> Self {
        Self {
            id: SourceId::new(),
            locator: MediaLocator::parse(src),
            revision: 0,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            id: SourceId::new(),
            locator: MediaLocator::File(path.into()),
            revision: 0,
        }
    }

    pub fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn display_name(&self) -> String {
        match &self.locator {
            MediaLocator::File(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string()),
            MediaLocator::Url(u) => u
                .rsplit('/')
                .find(|s| !s.is_empty())
                .unwrap_or(u.as_str())
                .to_string(),
        }
    }
}
