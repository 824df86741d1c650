use std::path::{Path, PathBuf};

use futures::channel::mpsc::UnboundedSender;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::domain::{AppError, AudioSource, DownloadEvent, DownloadRequest, SlotId, TaskPhase};
use crate::utils::sanitize_title;

/// How a task ended.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Saved(PathBuf),
    Skipped,
    Failed(AppError),
}

/// Sending half of the event channel, tagged with the task's slot.
#[derive(Clone)]
pub struct EventSink {
    slot: SlotId,
    tx: UnboundedSender<DownloadEvent>,
}

impl EventSink {
    pub fn new(slot: SlotId, tx: UnboundedSender<DownloadEvent>) -> Self {
        Self { slot, tx }
    }

    fn send(&self, event: DownloadEvent) {
        // Receiver gone means the UI has shut down; nothing left to notify.
        if self.tx.unbounded_send(event).is_err() {
            debug!(slot = %self.slot, "event receiver dropped");
        }
    }

    fn progress(&self, percent: u8) {
        self.send(DownloadEvent::Progress {
            slot: self.slot,
            percent,
        });
    }

    fn name_resolved(&self, name: &str) {
        self.send(DownloadEvent::NameResolved {
            slot: self.slot,
            name: name.to_string(),
        });
    }

    fn finished(&self, name: String) {
        self.send(DownloadEvent::Finished {
            slot: self.slot,
            name,
        });
    }
}

fn percent_of(downloaded: u64, total: u64) -> u8 {
    let pct = (u128::from(downloaded) * 100 / u128::from(total)).min(100);
    pct as u8
}

/// Bytes land here first; the target only appears once complete.
fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// One user-triggered download, from URL to file on disk.
pub struct DownloadTask {
    request: DownloadRequest,
    phase: TaskPhase,
    /// Last percentage sent, `None` until the first progress event.
    progress: Option<u8>,
    name: String,
    partial: Option<PathBuf>,
}

impl DownloadTask {
    pub fn new(request: DownloadRequest) -> Self {
        Self {
            request,
            phase: TaskPhase::Pending,
            progress: None,
            name: String::new(),
            partial: None,
        }
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    /// Runs the task to its terminal state. Never fails: errors are logged
    /// and reported as an empty completion name.
    pub async fn run(&mut self, source: &dyn AudioSource, events: &EventSink) -> TaskOutcome {
        let outcome = match self.fetch(source, events).await {
            Ok(Some(path)) => {
                info!(slot = %self.request.slot(), path = %path.display(), "audio saved");
                TaskOutcome::Saved(path)
            }
            Ok(None) => TaskOutcome::Skipped,
            Err(e) => {
                error!(
                    slot = %self.request.slot(),
                    url = self.request.url(),
                    "download failed: {e}"
                );
                self.discard_partial().await;
                TaskOutcome::Failed(e)
            }
        };

        self.finish(&outcome, events);
        outcome
    }

    async fn fetch(
        &mut self,
        source: &dyn AudioSource,
        events: &EventSink,
    ) -> Result<Option<PathBuf>, AppError> {
        self.phase = TaskPhase::Resolving;
        let stream = source.resolve(self.request.url()).await?;

        let name = sanitize_title(&stream.title);
        if name.is_empty() {
            return Err(AppError::EmptyTitle);
        }
        let target = self
            .request
            .folder()
            .join(format!("{name}.{}", stream.extension));

        if tokio::fs::try_exists(&target).await? {
            info!(path = %target.display(), "already downloaded, skipping");
            self.phase = TaskPhase::Skipped;
            return Ok(None);
        }

        events.name_resolved(&name);
        self.name = name;
        self.phase = TaskPhase::Downloading;

        tokio::fs::create_dir_all(self.request.folder()).await?;
        let mut body = source.open(&stream).await?;
        let total = stream.filesize.or(body.total).filter(|&size| size > 0);
        if total.is_none() {
            debug!(slot = %self.request.slot(), "size unknown, progress withheld");
        }

        let part = part_path(&target);
        // A leftover from a session that stopped mid-download.
        match tokio::fs::remove_file(&part).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part)
            .await?;
        self.partial = Some(part.clone());

        let mut downloaded: u64 = 0;
        while let Some(chunk) = body.chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total {
                let pct = percent_of(downloaded, total);
                if self.progress != Some(pct) {
                    self.progress = Some(pct);
                    events.progress(pct);
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&part, &target).await?;
        self.partial = None;

        Ok(Some(target))
    }

    async fn discard_partial(&mut self) {
        if let Some(path) = self.partial.take() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), "failed to remove partial file: {e}");
            }
        }
    }

    /// Terminal cleanup, exactly once per task.
    fn finish(&mut self, outcome: &TaskOutcome, events: &EventSink) {
        if !self.name.is_empty() && self.progress.is_none() {
            self.progress = Some(100);
            events.progress(100);
        }

        let name = match outcome {
            TaskOutcome::Saved(_) => std::mem::take(&mut self.name),
            TaskOutcome::Skipped | TaskOutcome::Failed(_) => String::new(),
        };
        events.finished(name);
        self.phase = TaskPhase::Completed;
    }
}
