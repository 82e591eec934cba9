//! Authenticated HTTP client for the backend
//!
//! Thin request/response wrapping only: bearer-token attachment and error
//! message extraction. Scheduling, retries and delivery all happen behind
//! these endpoints.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::warn;

use wabulk_core::{AppConfig, Result, WabulkError};

use super::response::SenderResponse;
use super::wire::OutboundRequest;
use super::SenderTransport;
use crate::model::{Contact, HistoryMessage, ScheduledMessage};

pub struct SenderClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl SenderClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => {
                warn!(path, "no authentication token configured");
                builder
            }
        }
    }

    async fn execute(&self, builder: RequestBuilder, fallback: &str) -> Result<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| WabulkError::Network(e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status == StatusCode::UNAUTHORIZED {
            return Err(WabulkError::Auth(extract_error_message(&body, "Authentication failed")));
        }
        if !status.is_success() {
            return Err(WabulkError::Backend(extract_error_message(&body, fallback)));
        }
        Ok(body)
    }

    /// Fetch the full remote contact list.
    pub async fn get_contacts(&self) -> Result<Vec<Contact>> {
        let body = self
            .execute(self.request(Method::GET, "/api/user/contacts"), "Failed to fetch contacts")
            .await?;
        serde_json::from_value(body).map_err(|e| WabulkError::Parse(e.to_string()))
    }

    /// Replace the full remote contact list. There is no partial update:
    /// every mutation submits the complete desired set.
    pub async fn register_contacts(&self, contacts: &[Contact]) -> Result<()> {
        self.execute(
            self.request(Method::POST, "/api/user/register-contact")
                .json(&json!({ "contacts": contacts })),
            "Failed to add contacts",
        )
        .await?;
        Ok(())
    }

    pub async fn user_history(&self) -> Result<Vec<HistoryMessage>> {
        let body = self
            .execute(self.request(Method::GET, "/api/user/history"), "Failed to fetch user history")
            .await?;
        serde_json::from_value(body).map_err(|e| WabulkError::Parse(e.to_string()))
    }

    pub async fn contact_history(&self, contact: &str) -> Result<Vec<HistoryMessage>> {
        let body = self
            .execute(
                self.request(Method::GET, "/api/user/contact-history")
                    .query(&[("contact", contact)]),
                "Failed to fetch contact history",
            )
            .await?;
        serde_json::from_value(body).map_err(|e| WabulkError::Parse(e.to_string()))
    }

    pub async fn scheduled_messages(&self) -> Result<Vec<ScheduledMessage>> {
        let body = self
            .execute(
                self.request(Method::GET, "/api/user/scheduled-messages"),
                "Failed to fetch scheduled messages",
            )
            .await?;
        serde_json::from_value(body).map_err(|e| WabulkError::Parse(e.to_string()))
    }

    pub async fn update_scheduled_message(&self, id: &str, due_date_utc: &str) -> Result<()> {
        self.execute(
            self.request(Method::POST, "/api/user/update-scheduled-messages")
                .json(&json!({ "id": id, "dueDateUTC": due_date_utc })),
            "Failed to update scheduled message",
        )
        .await?;
        Ok(())
    }

    /// The cancel endpoint takes the raw id as a JSON-quoted string body,
    /// not an object.
    pub async fn cancel_scheduled_message(&self, id: &str) -> Result<()> {
        self.execute(
            self.request(Method::POST, "/api/user/cancel-scheduled-message")
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(cancel_body(id)),
            "Failed to cancel scheduled message",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SenderTransport for SenderClient {
    async fn send(&self, request: &OutboundRequest) -> Result<SenderResponse> {
        let body = self
            .execute(
                self.request(Method::POST, request.endpoint()).json(request),
                "Failed to send message",
            )
            .await?;
        serde_json::from_value(body).map_err(|e| WabulkError::Parse(e.to_string()))
    }
}

/// The backend reports failures in several fields; take the best available
/// and fall back to a generic message.
fn extract_error_message(body: &Value, fallback: &str) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn cancel_body(id: &str) -> String {
    Value::String(id.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_body_is_the_quoted_id() {
        assert_eq!(cancel_body("42"), "\"42\"");
        assert_eq!(cancel_body("abc-7"), "\"abc-7\"");
    }

    #[test]
    fn error_extraction_prefers_message_then_error_then_fallback() {
        let both = json!({ "message": "primary", "error": "secondary" });
        assert_eq!(extract_error_message(&both, "fallback"), "primary");

        let only_error = json!({ "error": "secondary" });
        assert_eq!(extract_error_message(&only_error, "fallback"), "secondary");

        let neither = json!({ "status": 500 });
        assert_eq!(extract_error_message(&neither, "fallback"), "fallback");

        assert_eq!(extract_error_message(&Value::Null, "fallback"), "fallback");
    }
}
