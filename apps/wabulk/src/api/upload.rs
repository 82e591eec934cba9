//! Image-host upload client
//!
//! Attachments are not streamed through the backend; images go to an
//! external host first and only the resulting URL travels in the send
//! payload.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use wabulk_core::{AppConfig, Result, WabulkError};

pub struct ImageUploader {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    data: Option<UploadData>,
    #[serde(default)]
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: String,
}

impl ImageUploader {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match (&config.image_upload_url, &config.image_upload_key) {
            (Some(endpoint), Some(api_key)) => Ok(Self {
                http: reqwest::Client::new(),
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
            }),
            _ => Err(WabulkError::Config(
                "Image upload configuration is missing".to_string(),
            )),
        }
    }

    /// Upload raw image bytes and return the hosted URL.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| WabulkError::Network(e.to_string()))?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| WabulkError::Parse(e.to_string()))?;

        resolve_upload(body)
    }
}

fn resolve_upload(body: UploadResponse) -> Result<String> {
    if body.success {
        return body
            .data
            .map(|data| data.url)
            .ok_or_else(|| WabulkError::Upload("Upload response carried no URL".to_string()));
    }
    let message = body
        .error
        .map(|error| error.message)
        .unwrap_or_else(|| "Unknown error".to_string());
    Err(WabulkError::Upload(message))
}
