use serde::{Deserialize, Serialize};

/// Response from the /init endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InitResponse {
    #[serde(rename = "convertURL")]
    pub convert_url: String,
    pub error: String,
}

/// Response from the convert endpoint and its redirects
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertResponse {
    pub error: i32,
    #[serde(rename = "downloadURL", default)]
    pub download_url: String,
    #[serde(rename = "redirectURL", default)]
    pub redirect_url: String,
    #[serde(default)]
    pub redirect: i32,
    #[serde(default)]
    pub title: String,
}

/// Where the converter lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Page carrying the signing bootstrap; also sent as Origin/Referer.
    pub origin: String,
    pub api_base: String,
    /// Extension of the produced files, without the dot.
    pub extension: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            origin: "https://v1.y2mate.nu".to_string(),
            api_base: "https://eta.etacloud.org/api/v1".to_string(),
            extension: "mp3".to_string(),
        }
    }
}
