use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::AppError;

/// Names of the audio files sitting in the output folder.
#[derive(Debug, Clone)]
pub struct Library {
    folder: PathBuf,
    extension: String,
    entries: Vec<String>,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn list_stems(folder: &Path, extension: &str) -> io::Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() || !has_extension(&path, extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

impl Library {
    /// Creates the folder when missing, otherwise lists what is already there.
    pub fn open(
        folder: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Result<Self, AppError> {
        let folder = folder.into();
        let extension = extension.into();

        let entries = if folder.exists() {
            list_stems(&folder, &extension)?
        } else {
            std::fs::create_dir_all(&folder)?;
            Vec::new()
        };
        info!(folder = %folder.display(), count = entries.len(), "library loaded");

        Ok(Self {
            folder,
            extension,
            entries,
        })
    }

    /// A library with nothing listed, for when the folder cannot be read.
    pub fn empty(folder: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            extension: extension.into(),
            entries: Vec::new(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.folder.join(format!("{name}.{}", self.extension))
    }

    pub fn add(&mut self, name: String) {
        if !name.is_empty() && !self.entries.contains(&name) {
            self.entries.push(name);
        }
    }

    /// Drops the entry from the list, then tries to delete its file.
    /// A failed delete is only logged.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry == name) else {
            return false;
        };
        self.entries.remove(index);

        let path = self.path_of(name);
        match std::fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "deleted"),
            Err(e) => warn!(path = %path.display(), "delete failed: {e}"),
        }
        true
    }

    /// Forgets entries that were moved elsewhere.
    pub fn forget(&mut self, names: &[String]) {
        self.entries.retain(|entry| !names.contains(entry));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub moved: Vec<String>,
    /// (file name, error message)
    pub failed: Vec<(String, String)>,
}

async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        // Removable drives are usually another filesystem; rename cannot cross it.
        Err(_) => {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}

/// Moves every `*.<extension>` in `folder` onto `drive`.
pub async fn transfer_all(folder: PathBuf, extension: String, drive: PathBuf) -> TransferReport {
    let mut report = TransferReport::default();

    if !tokio::fs::try_exists(&drive).await.unwrap_or(false) {
        warn!(drive = %drive.display(), "drive path does not exist, nothing moved");
        return report;
    }

    let mut dir = match tokio::fs::read_dir(&folder).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!(folder = %folder.display(), "cannot read output folder: {e}");
            return report;
        }
    };

    loop {
        let entry = match dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(folder = %folder.display(), "listing interrupted: {e}");
                break;
            }
        };
        let path = entry.path();
        if !has_extension(&path, &extension) {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let shown = file_name.to_string_lossy().into_owned();

        match move_file(&path, &drive.join(file_name)).await {
            Ok(()) => {
                info!(file = %shown, drive = %drive.display(), "moved to drive");
                if let Some(stem) = path.file_stem() {
                    report.moved.push(stem.to_string_lossy().into_owned());
                }
            }
            Err(e) => {
                warn!(file = %shown, "move failed: {e}");
                report.failed.push((shown, e.to_string()));
            }
        }
    }

    report.moved.sort();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("output_mp3");

        let library = Library::open(&folder, "mp3").unwrap();

        assert!(folder.is_dir());
        assert!(library.entries().is_empty());
    }

    #[test]
    fn test_open_lists_matching_stems() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b song.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("a song.MP3"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let library = Library::open(dir.path(), "mp3").unwrap();

        assert_eq!(library.entries(), ["a song", "b song"]);
    }

    #[test]
    fn test_add_ignores_empty_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path(), "mp3").unwrap();

        library.add("Song A".to_string());
        library.add(String::new());
        library.add("Song A".to_string());

        assert_eq!(library.entries(), ["Song A"]);
    }

    #[test]
    fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Song A.mp3"), b"x").unwrap();
        let mut library = Library::open(dir.path(), "mp3").unwrap();

        assert!(library.remove("Song A"));
        assert!(library.entries().is_empty());
        assert!(!dir.path().join("Song A.mp3").exists());
    }

    #[test]
    fn test_remove_drops_entry_even_when_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path(), "mp3").unwrap();
        library.add("Ghost".to_string());

        assert!(library.remove("Ghost"));
        assert!(library.entries().is_empty());
        assert!(!library.remove("Ghost"));
    }

    #[tokio::test]
    async fn test_transfer_moves_matching_files() {
        let out = tempfile::tempdir().unwrap();
        let drive = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("Song A.mp3"), b"a").unwrap();
        std::fs::write(out.path().join("Song B.mp3"), b"b").unwrap();
        std::fs::write(out.path().join("cover.jpg"), b"c").unwrap();

        let report = transfer_all(
            out.path().to_path_buf(),
            "mp3".to_string(),
            drive.path().to_path_buf(),
        )
        .await;

        assert_eq!(report.moved, vec!["Song A".to_string(), "Song B".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(std::fs::read(drive.path().join("Song A.mp3")).unwrap(), b"a");
        assert!(!out.path().join("Song A.mp3").exists());
        assert!(out.path().join("cover.jpg").exists());
    }

    #[tokio::test]
    async fn test_transfer_to_missing_drive_moves_nothing() {
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("Song A.mp3"), b"a").unwrap();

        let report = transfer_all(
            out.path().to_path_buf(),
            "mp3".to_string(),
            out.path().join("no-such-drive"),
        )
        .await;

        assert_eq!(report, TransferReport::default());
        assert!(out.path().join("Song A.mp3").exists());
    }

    #[test]
    fn test_forget_moved_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut library = Library::open(dir.path(), "mp3").unwrap();
        library.add("Song A".to_string());
        library.add("Song B".to_string());

        library.forget(&["Song A".to_string()]);

        assert_eq!(library.entries(), ["Song B"]);
    }
}
