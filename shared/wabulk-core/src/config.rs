//! Application configuration read from the environment

use crate::error::{Result, WabulkError};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the backend that wraps the messaging provider.
    pub api_base_url: String,
    /// Bearer token attached to every backend request. Issued by the
    /// external session provider; consumed read-only here.
    pub access_token: Option<String>,
    /// Provider token forwarded verbatim inside sender payloads.
    pub whatsapp_token: Option<String>,
    /// Image host endpoint and API key. Both must be present for uploads.
    pub image_upload_url: Option<String>,
    pub image_upload_key: Option<String>,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_base_url: env::var("WABULK_API_URL")
                .map_err(|_| WabulkError::Config("WABULK_API_URL is not set".to_string()))?
                .trim_end_matches('/')
                .to_string(),
            access_token: env::var("WABULK_ACCESS_TOKEN").ok(),
            whatsapp_token: env::var("WHATSAPP_TOKEN").ok(),
            image_upload_url: env::var("WABULK_IMAGE_UPLOAD_URL").ok(),
            image_upload_key: env::var("WABULK_IMAGE_UPLOAD_KEY").ok(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// True when both the upload endpoint and key are configured.
    pub fn image_upload_configured(&self) -> bool {
        self.image_upload_url.is_some() && self.image_upload_key.is_some()
    }
}
