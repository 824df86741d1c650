use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use super::dispatcher::{Dispatcher, EventReceiver};
use crate::api::ConverterClient;
use crate::config::AppConfig;
use crate::domain::{AppError, AudioSource, SlotId};

/// Everything the application needs for its whole lifetime, built once at start.
#[derive(Clone)]
pub struct AppContext {
    config: Arc<AppConfig>,
    runtime: Arc<Runtime>,
    dispatcher: Arc<Dispatcher>,
    events: Arc<Mutex<Option<EventReceiver>>>,
}

impl AppContext {
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        let source = Arc::new(ConverterClient::new(config.converter.clone()));
        Self::with_source(config, source)
    }

    pub fn with_source(config: AppConfig, source: Arc<dyn AudioSource>) -> Result<Self, AppError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("download-worker")
            .enable_all()
            .build()?;

        let (dispatcher, receiver) =
            Dispatcher::new(runtime.handle().clone(), source, config.pool_size);
        info!(pool_size = config.pool_size, "download pool ready");

        Ok(Self {
            config: Arc::new(config),
            runtime: Arc::new(runtime),
            dispatcher: Arc::new(dispatcher),
            events: Arc::new(Mutex::new(Some(receiver))),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Hands out the event receiver. Only the first caller gets it.
    pub fn take_events(&self) -> Option<EventReceiver> {
        self.events.lock().ok().and_then(|mut slot| slot.take())
    }

    pub fn request_download(&self, url: &str, folder: &Path) -> SlotId {
        self.dispatcher.request(url, folder)
    }

    /// Stops the worker runtime. In-flight downloads are abandoned.
    pub fn shutdown(self) {
        let Self { runtime, dispatcher, .. } = self;
        drop(dispatcher);
        match Arc::try_unwrap(runtime) {
            Ok(runtime) => {
                runtime.shutdown_timeout(Duration::from_secs(1));
                info!("download pool stopped");
            }
            Err(_) => warn!("runtime still shared at shutdown, leaving it to drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::download_task::tests::FakeSource;
    use crate::domain::DownloadEvent;
    use futures::StreamExt;

    const URL: &str = "https://youtu.be/Rs6j23OMwMs";

    fn context_with(source: FakeSource) -> AppContext {
        let config = AppConfig {
            pool_size: 2,
            ..AppConfig::default()
        };
        AppContext::with_source(config, Arc::new(source)).unwrap()
    }

    /// Blocks until an event matching `want` arrives.
    fn wait_for(
        events: &mut EventReceiver,
        want: impl Fn(&DownloadEvent) -> bool,
    ) -> Option<DownloadEvent> {
        futures::executor::block_on(async {
            while let Some(event) = events.next().await {
                if want(&event) {
                    return Some(event);
                }
            }
            None
        })
    }

    fn finished_name(events: &mut EventReceiver) -> Option<String> {
        match wait_for(events, |e| matches!(e, DownloadEvent::Finished { .. })) {
            Some(DownloadEvent::Finished { name, .. }) => Some(name),
            _ => None,
        }
    }

    #[test]
    fn test_events_taken_once() {
        let context = context_with(FakeSource::new("Song A", vec![]));

        assert!(context.take_events().is_some());
        assert!(context.clone().take_events().is_none());
        context.shutdown();
    }

    #[test]
    fn test_download_through_context() {
        let dir = tempfile::tempdir().unwrap();
        let context = context_with(FakeSource::new("Song A", vec![vec![5; 32]]));
        let mut events = context.take_events().unwrap();

        let slot = context.request_download(URL, dir.path());
        let finished = wait_for(&mut events, |e| matches!(e, DownloadEvent::Finished { .. }));

        assert_eq!(
            finished,
            Some(DownloadEvent::Finished {
                slot,
                name: "Song A".to_string()
            })
        );
        assert!(dir.path().join("Song A.mp3").exists());
        context.shutdown();
    }

    #[test]
    fn test_shutdown_mid_download_allows_retry() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Song A.mp3");

        let mut stalled = FakeSource::new("Song A", vec![vec![1; 100]]);
        stalled.announced_size = Some(1000);
        stalled.stall_after = Some(1);
        let context = context_with(stalled);
        let mut events = context.take_events().unwrap();

        context.request_download(URL, dir.path());
        let progress = wait_for(&mut events, |e| matches!(e, DownloadEvent::Progress { .. }));
        assert!(matches!(
            progress,
            Some(DownloadEvent::Progress { percent: 10, .. })
        ));
        context.shutdown();

        assert!(!target.exists());

        let context = context_with(FakeSource::new("Song A", vec![vec![2; 500], vec![3; 500]]));
        let mut events = context.take_events().unwrap();

        context.request_download(URL, dir.path());

        assert_eq!(finished_name(&mut events), Some("Song A".to_string()));
        assert_eq!(std::fs::metadata(&target).unwrap().len(), 1000);
        assert!(!dir.path().join("Song A.mp3.part").exists());
        context.shutdown();
    }
}
