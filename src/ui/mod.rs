use iced::{
    widget::{button, column, progress_bar, row, scrollable, text, text_input, Space},
    Element, Length,
};

use crate::application::drive::RemovableDrive;
use crate::application::{Library, ProgressBoard};

/// Main view state
pub struct DownloadView {
    pub source_url: String,
    pub selected: Option<String>,
    pub status_message: String,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            selected: None,
            status_message: "Paste a YouTube link to download its audio".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    DownloadPressed,
    EntrySelected(String),
    DeletePressed,
    TransferPressed,
    DriveProbePressed,
    ChooseFolderPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: &DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.source_url = url.clone();
            }
            DownloadMessage::EntrySelected(name) => {
                if self.selected.as_ref() == Some(name) {
                    self.selected = None;
                } else {
                    self.selected = Some(name.clone());
                }
            }
            // Handled by the app
            _ => {}
        }
    }

    pub fn view<'a>(
        &'a self,
        board: &'a ProgressBoard,
        library: &'a Library,
        drive: Option<&'a RemovableDrive>,
    ) -> Element<'a, DownloadMessage> {
        let toolbar = row![
            text_input("Paste a YouTube link...", &self.source_url)
                .on_input(DownloadMessage::UrlChanged)
                .on_submit(DownloadMessage::DownloadPressed)
                .padding(10),
            button("Download")
                .on_press(DownloadMessage::DownloadPressed)
                .padding([10, 20]),
            button("Transfer")
                .on_press_maybe(drive.map(|_| DownloadMessage::TransferPressed))
                .padding([10, 20]),
        ]
        .spacing(10);

        let downloads = column(board.slots().map(|slot| {
            column![
                text(slot.name.as_deref().unwrap_or("...")).size(14),
                progress_bar(0.0..=100.0, f32::from(slot.percent)),
            ]
            .spacing(4)
            .into()
        }))
        .spacing(8);

        let songs = column(library.entries().iter().map(|name| {
            let label = if self.selected.as_ref() == Some(name) {
                format!("> {name}")
            } else {
                name.clone()
            };
            button(text(label).size(14))
                .on_press(DownloadMessage::EntrySelected(name.clone()))
                .width(Length::Fill)
                .into()
        }))
        .spacing(4);

        let drive_label = match drive {
            Some(drive) => format!("{} ({})", drive.label, drive.path.display()),
            None => "No removable drive".to_string(),
        };

        column![
            text("MP3 Downloader").size(32),
            toolbar,
            text(&self.status_message).size(14),
            Space::new().height(Length::Fixed(10.0)),
            text(if board.is_empty() {
                "Downloads".to_string()
            } else {
                format!("Downloads ({})", board.len())
            })
            .size(18),
            scrollable(downloads).height(Length::FillPortion(1)),
            button(text(drive_label)).on_press(DownloadMessage::DriveProbePressed),
            text(format!("Downloaded songs in {}", library.folder().display())).size(18),
            scrollable(songs).height(Length::FillPortion(1)),
            row![
                button("Delete").on_press_maybe(
                    self.selected
                        .as_ref()
                        .map(|_| DownloadMessage::DeletePressed)
                ),
                button("Choose folder").on_press(DownloadMessage::ChooseFolderPressed),
            ]
            .spacing(10),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}
