use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use super::{AppError, ResolvedStream};

/// Body of an opened audio stream.
pub struct AudioBody {
    /// Content-Length reported by the server, if any.
    pub total: Option<u64>,
    pub chunks: BoxStream<'static, Result<Bytes, AppError>>,
}

/// Anything that can turn a page URL into downloadable audio.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedStream, AppError>;

    async fn open(&self, stream: &ResolvedStream) -> Result<AudioBody, AppError>;
}
