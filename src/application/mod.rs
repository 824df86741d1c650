pub mod context;
pub mod dispatcher;
pub mod download_task;
pub mod drive;
pub mod library;
pub mod progress_board;

pub use context::AppContext;
pub use library::{Library, TransferReport};
pub use progress_board::ProgressBoard;
