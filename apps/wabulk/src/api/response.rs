//! Normalization of the backend's response shapes
//!
//! Different sender endpoints answer inconsistently: either a list of
//! per-recipient results with the provider's JSON embedded as a string, or
//! one aggregate object. Both collapse into `DeliveryRecord`s here so the
//! rest of the workflow sees a single shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Raw response as decoded at the HTTP boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SenderResponse {
    PerRecipient(Vec<RecipientResult>),
    Aggregate(AggregateResult),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    pub recipient: String,
    pub is_success: bool,
    /// Provider payload, embedded as a JSON string.
    #[serde(default)]
    pub response_content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Uniform per-recipient outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub recipient: Option<String>,
    pub is_success: bool,
    pub message_id: Option<String>,
    pub error: Option<ProviderError>,
    /// Whatever the backend attached, kept verbatim for the log details.
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<i64>,
}

/// One record per recipient for the list shape, exactly one record for the
/// aggregate shape.
pub fn normalize(response: SenderResponse) -> Vec<DeliveryRecord> {
    match response {
        SenderResponse::PerRecipient(results) => {
            results.into_iter().map(normalize_recipient).collect()
        }
        SenderResponse::Aggregate(result) => vec![DeliveryRecord {
            recipient: None,
            is_success: result.success,
            message_id: None,
            error: None,
            details: json!({ "success": result.success, "error": result.error }),
        }],
    }
}

fn normalize_recipient(result: RecipientResult) -> DeliveryRecord {
    // Malformed embedded JSON degrades to an empty payload rather than
    // failing the whole response.
    let payload: Value = serde_json::from_str(&result.response_content)
        .unwrap_or_else(|_| Value::Object(Default::default()));

    let message_id = payload
        .get("messages")
        .and_then(|messages| messages.get(0))
        .and_then(|message| message.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let error = payload
        .get("error")
        .and_then(|error| serde_json::from_value::<ProviderError>(error.clone()).ok());

    DeliveryRecord {
        recipient: Some(result.recipient),
        is_success: result.is_success,
        message_id,
        error,
        details: payload,
    }
}
