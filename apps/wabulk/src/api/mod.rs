//! Backend API surface: wire payloads, the HTTP client, response
//! normalization, and the image-host uploader.

pub mod client;
pub mod response;
pub mod upload;
pub mod wire;

use async_trait::async_trait;
use wabulk_core::Result;

pub use client::SenderClient;
pub use response::{normalize, DeliveryRecord, ProviderError, SenderResponse};
pub use upload::ImageUploader;
pub use wire::OutboundRequest;

/// Seam between the dispatcher and the HTTP layer, so dispatch logic can be
/// exercised against a recording transport in tests.
#[async_trait]
pub trait SenderTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<SenderResponse>;
}
