use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a progress row, fixed when the request is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    slot: SlotId,
    folder: PathBuf,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, slot: SlotId, folder: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            slot,
            folder: folder.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

/// What the remote source handed back for a URL.
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    pub title: String,
    pub download_url: String,
    pub extension: String,
    /// Size announced by the source, if any. Falls back to Content-Length.
    pub filesize: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    Resolving,
    Downloading,
    Skipped,
    Completed,
}

/// Messages a download worker sends to the UI consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    Progress { slot: SlotId, percent: u8 },
    NameResolved { slot: SlotId, name: String },
    /// An empty `name` means there is nothing to add to the library.
    Finished { slot: SlotId, name: String },
}
