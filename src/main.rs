mod api;
mod app;
mod application;
mod config;
mod domain;
mod ui;
mod utils;

use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::application::AppContext;
use crate::config::AppConfig;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let context = match AppConfig::from_env().and_then(AppContext::start) {
        Ok(context) => context,
        Err(e) => {
            error!("failed to start: {e}");
            std::process::exit(1);
        }
    };

    let boot = context.clone();
    let result = iced::application(
        move || app::DownloadApp::new(boot.clone()),
        app::update,
        app::view,
    )
    .title("Pendrive MP3 Downloader")
    .run();

    context.shutdown();
    result
}
