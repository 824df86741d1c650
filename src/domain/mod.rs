pub mod error;
pub mod model;
pub mod source;

pub use error::AppError;
pub use model::{DownloadEvent, DownloadRequest, ResolvedStream, SlotId, TaskPhase};
pub use source::{AudioBody, AudioSource};
