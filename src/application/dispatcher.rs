use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::download_task::{DownloadTask, EventSink, TaskOutcome};
use crate::domain::{AudioSource, DownloadEvent, DownloadRequest, SlotId};

pub type EventReceiver = UnboundedReceiver<DownloadEvent>;

/// Runs download tasks on a bounded pool and funnels their events into one channel.
pub struct Dispatcher {
    runtime: Handle,
    source: Arc<dyn AudioSource>,
    permits: Arc<Semaphore>,
    events: UnboundedSender<DownloadEvent>,
    next_slot: AtomicUsize,
}

impl Dispatcher {
    pub fn new(
        runtime: Handle,
        source: Arc<dyn AudioSource>,
        pool_size: usize,
    ) -> (Self, EventReceiver) {
        let (events, receiver) = unbounded();
        let dispatcher = Self {
            runtime,
            source,
            permits: Arc::new(Semaphore::new(pool_size.max(1))),
            events,
            next_slot: AtomicUsize::new(0),
        };
        (dispatcher, receiver)
    }

    pub fn allocate_slot(&self) -> SlotId {
        SlotId(self.next_slot.fetch_add(1, Ordering::Relaxed))
    }

    /// Builds a request with a fresh slot and submits it.
    pub fn request(&self, url: impl Into<String>, folder: impl Into<PathBuf>) -> SlotId {
        let slot = self.allocate_slot();
        self.submit(DownloadRequest::new(url, slot, folder));
        slot
    }

    /// Queues the request. Results arrive only through the event channel.
    pub fn submit(&self, request: DownloadRequest) {
        let slot = request.slot();
        info!(%slot, url = request.url(), "download queued");

        let permits = Arc::clone(&self.permits);
        let source = Arc::clone(&self.source);
        let sink = EventSink::new(slot, self.events.clone());

        self.runtime.spawn(async move {
            // Closed only if the semaphore is dropped, which never happens while tasks hold it.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let mut task = DownloadTask::new(request);
            match task.run(source.as_ref(), &sink).await {
                TaskOutcome::Saved(path) => debug!(%slot, path = %path.display(), "task done"),
                TaskOutcome::Skipped => debug!(%slot, "task skipped"),
                TaskOutcome::Failed(e) => debug!(%slot, "task failed: {e}"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::download_task::tests::FakeSource;
    use futures::StreamExt;

    async fn collect_until_finished(rx: &mut EventReceiver, count: usize) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        let mut finished = 0;
        while finished < count {
            let event = rx.next().await.unwrap();
            if matches!(event, DownloadEvent::Finished { .. }) {
                finished += 1;
            }
            events.push(event);
        }
        events
    }

    #[test]
    fn test_slots_are_sequential() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let source = Arc::new(FakeSource::new("Song A", vec![]));
        let (dispatcher, _rx) = Dispatcher::new(runtime.handle().clone(), source, 2);

        assert_eq!(dispatcher.allocate_slot(), SlotId(0));
        assert_eq!(dispatcher.allocate_slot(), SlotId(1));
        assert_eq!(dispatcher.allocate_slot(), SlotId(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_delivers_events_for_slot() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new("Song A", vec![vec![1; 16]]));
        let (dispatcher, mut rx) = Dispatcher::new(Handle::current(), source, 1);

        let slot = dispatcher.request("https://youtu.be/Rs6j23OMwMs", dir.path());
        let events = collect_until_finished(&mut rx, 1).await;

        assert!(events.iter().all(|e| matches!(
            e,
            DownloadEvent::Progress { slot: s, .. }
                | DownloadEvent::NameResolved { slot: s, .. }
                | DownloadEvent::Finished { slot: s, .. } if *s == slot
        )));
        assert_eq!(
            events.last(),
            Some(&DownloadEvent::Finished {
                slot,
                name: "Song A".to_string()
            })
        );
        assert!(dir.path().join("Song A.mp3").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_duplicate_requests_download_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new("Song A", vec![vec![1; 16]]));
        // One worker serialises the two tasks, so the second sees the file.
        let (dispatcher, mut rx) = Dispatcher::new(Handle::current(), source, 1);

        dispatcher.request("https://youtu.be/Rs6j23OMwMs", dir.path());
        dispatcher.request("https://youtu.be/Rs6j23OMwMs", dir.path());
        let events = collect_until_finished(&mut rx, 2).await;

        let names: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::Finished { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names.iter().filter(|n| n.is_empty()).count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "Song A").count(), 1);
    }
}
