use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::models::{ConvertResponse, ConverterConfig, InitResponse};
use crate::domain::{AppError, AudioBody, AudioSource, ResolvedStream};
use crate::utils::{extract_video_id, get_timestamp};

const MAX_REDIRECTS: usize = 3;
const MAX_TOKEN_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Download URL not found")]
    NoDownloadUrl,

    #[error("Failed to extract auth data from page")]
    AuthExtractionError,

    #[error("Too many convert redirects")]
    TooManyRedirects,
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Query parameter that signs the init call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    param: String,
    token: String,
}

impl Signature {
    /// Finds the `JSON.parse('...')` bootstrap inside the origin page.
    fn from_page(html: &str) -> Option<Self> {
        let re = Regex::new(r"JSON\.parse\('([^']+)'\)").ok()?;
        let caps = re.captures(html)?;
        let bootstrap: Value = serde_json::from_str(&caps[1]).ok()?;
        Self::from_bootstrap(&bootstrap)
    }

    /// Layout: `[codes, reversed, offsets, _, _, _, param_char]`.
    /// Each token char is `codes[i] - offsets[len - 1 - i]`.
    fn from_bootstrap(bootstrap: &Value) -> Option<Self> {
        let codes = bootstrap.get(0)?.as_array()?;
        let reversed = bootstrap.get(1).and_then(Value::as_i64).unwrap_or(0) != 0;
        let offsets = bootstrap.get(2)?.as_array()?;

        let decoded = codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let offset = offsets.get(offsets.len().checked_sub(i + 1)?)?.as_i64()?;
                let byte = u8::try_from(code.as_i64()? - offset).ok()?;
                Some(char::from(byte))
            })
            .collect::<Option<Vec<char>>>()?;

        let token: String = if reversed {
            decoded.into_iter().rev().take(MAX_TOKEN_LEN).collect()
        } else {
            decoded.into_iter().take(MAX_TOKEN_LEN).collect()
        };

        let param = bootstrap
            .get(6)
            .and_then(Value::as_u64)
            .and_then(|n| u8::try_from(n).ok())
            .map(|b| char::from(b).to_string())
            .unwrap_or_else(|| "u".to_string());

        Some(Self { param, token })
    }
}

fn with_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// Client for the converter service that turns a video into an mp3 link.
#[derive(Clone)]
pub struct ConverterClient {
    http: Client,
    config: ConverterConfig,
}

impl ConverterClient {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let origin = self.config.origin.trim_end_matches('/');
        self.http
            .get(url)
            .header("Origin", origin)
            .header("Referer", format!("{origin}/"))
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str, step: &str) -> Result<T> {
        let response = self
            .get(url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ApiError::ApiError(format!("{step} request failed: {e}")))?;

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {e}")))
    }

    /// Signs a session against the origin page and returns the convert URL.
    pub async fn init(&self) -> Result<String> {
        let html = self
            .http
            .get(&self.config.origin)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let signature = Signature::from_page(&html).ok_or(ApiError::AuthExtractionError)?;

        let mut url = Url::parse(&format!(
            "{}/init",
            self.config.api_base.trim_end_matches('/')
        ))
        .map_err(|e| ApiError::InvalidResponse(format!("Bad API base: {e}")))?;
        url.query_pairs_mut()
            .append_pair(&signature.param, &signature.token)
            .append_pair("t", &get_timestamp().to_string());

        let json: InitResponse = self.fetch_json(url.as_str(), "Init").await?;
        if json.error != "0" {
            return Err(ApiError::ApiError(json.error));
        }

        Ok(json.convert_url)
    }

    /// Requests the conversion and follows redirect hops to the final answer.
    pub async fn convert(&self, convert_url: &str, video_id: &str) -> Result<ConvertResponse> {
        let url = with_query(
            convert_url,
            &format!(
                "v={video_id}&f={}&t={}",
                self.config.extension,
                get_timestamp()
            ),
        );
        let mut response: ConvertResponse = self.fetch_json(&url, "Convert").await?;
        let mut hops = 0;

        loop {
            if response.error != 0 {
                return Err(ApiError::ApiError(format!("Error code: {}", response.error)));
            }
            if response.redirect != 1 || response.redirect_url.is_empty() {
                return Ok(response);
            }

            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(ApiError::TooManyRedirects);
            }
            debug!(hop = hops, "following convert redirect");
            let next = with_query(&response.redirect_url, &format!("t={}", get_timestamp()));
            response = self.fetch_json(&next, "Redirect").await?;
        }
    }
}

#[async_trait]
impl AudioSource for ConverterClient {
    async fn resolve(&self, url: &str) -> std::result::Result<ResolvedStream, AppError> {
        let video_id = extract_video_id(url).ok_or(AppError::InvalidInput)?;
        debug!(%video_id, "resolving audio stream");

        let convert_url = self.init().await?;
        let converted = self.convert(&convert_url, &video_id).await?;
        if converted.download_url.is_empty() {
            return Err(ApiError::NoDownloadUrl.into());
        }

        let title = if converted.title.trim().is_empty() {
            video_id
        } else {
            converted.title
        };

        Ok(ResolvedStream {
            title,
            download_url: converted.download_url,
            extension: self.config.extension.clone(),
            filesize: None,
        })
    }

    async fn open(&self, stream: &ResolvedStream) -> std::result::Result<AudioBody, AppError> {
        let response = self
            .get(&stream.download_url)
            .send()
            .await
            .map_err(ApiError::from)?
            .error_for_status()
            .map_err(|e| ApiError::ApiError(format!("Download request failed: {e}")))?;

        let total = response.content_length();
        let chunks = response
            .bytes_stream()
            .map_err(|e| AppError::from(ApiError::RequestError(e)))
            .boxed();

        Ok(AudioBody { total, chunks })
    }
}
