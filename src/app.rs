use std::path::PathBuf;

use iced::Task;
use tracing::{info, warn};

use crate::application::drive::{self, RemovableDrive};
use crate::application::library::transfer_all;
use crate::application::{AppContext, Library, ProgressBoard, TransferReport};
use crate::domain::DownloadEvent;
use crate::ui::{DownloadMessage, DownloadView};

pub struct DownloadApp {
    context: AppContext,
    view: DownloadView,
    board: ProgressBoard,
    library: Library,
    drive: Option<RemovableDrive>,
}

impl DownloadApp {
    /// Builds the UI state and starts listening to download events.
    pub fn new(context: AppContext) -> (Self, Task<Message>) {
        let config = context.config();
        let library = open_library(config.output_folder.clone(), config.extension());
        let drive = drive::detect(&config.drive_roots);

        let listen = match context.take_events() {
            Some(events) => Task::run(events, Message::Download),
            None => {
                warn!("download events already claimed, progress will not be shown");
                Task::none()
            }
        };

        let app = Self {
            context,
            view: DownloadView::default(),
            board: ProgressBoard::new(),
            library,
            drive,
        };
        (app, listen)
    }
}

fn open_library(folder: PathBuf, extension: &str) -> Library {
    match Library::open(folder.clone(), extension) {
        Ok(library) => library,
        Err(e) => {
            warn!(folder = %folder.display(), "cannot open library: {e}");
            Library::empty(folder, extension)
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    /// Event from one of the download workers
    Download(DownloadEvent),
    /// Folder picked in the dialog, `None` when cancelled
    FolderChosen(Option<PathBuf>),
    TransferFinished(TransferReport),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(&ui_msg);

            match ui_msg {
                DownloadMessage::DownloadPressed => {
                    let url = app.view.source_url.trim().to_string();
                    if !url.is_empty() {
                        let slot = app.context.request_download(&url, app.library.folder());
                        app.view.status_message = format!("Queued download {slot}");
                        app.view.source_url.clear();
                    }
                }
                DownloadMessage::DeletePressed => {
                    if let Some(name) = app.view.selected.take() {
                        app.library.remove(&name);
                        app.view.status_message = format!("Removed {name}");
                    }
                }
                DownloadMessage::TransferPressed => {
                    if let Some(drive) = &app.drive {
                        app.view.status_message = format!("Moving songs to {}...", drive.label);
                        return Task::perform(
                            transfer_all(
                                app.library.folder().to_path_buf(),
                                app.library.extension().to_string(),
                                drive.path.clone(),
                            ),
                            Message::TransferFinished,
                        );
                    }
                }
                DownloadMessage::DriveProbePressed => {
                    app.drive = drive::detect(&app.context.config().drive_roots);
                }
                DownloadMessage::ChooseFolderPressed => {
                    let start = app.library.folder().to_path_buf();
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(&start)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::FolderChosen,
                    );
                }
                DownloadMessage::UrlChanged(_) | DownloadMessage::EntrySelected(_) => {}
            }
        }
        Message::Download(event) => {
            if let Some(name) = app.board.apply(event) {
                app.view.status_message = format!("Downloaded {name}");
                app.library.add(name);
            }
        }
        Message::FolderChosen(Some(folder)) => {
            info!(folder = %folder.display(), "output folder changed");
            let extension = app.library.extension().to_string();
            app.library = open_library(folder, &extension);
            app.view.selected = None;
        }
        Message::FolderChosen(None) => {}
        Message::TransferFinished(report) => {
            app.library.forget(&report.moved);
            app.view.selected = None;
            app.view.status_message = format!(
                "Moved {} song(s), {} failed",
                report.moved.len(),
                report.failed.len()
            );
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view
        .view(&app.board, &app.library, app.drive.as_ref())
        .map(Message::UiMessage)
}
