//! Domain model for the bulk-messaging workflow

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A message recipient. The phone number is the uniqueness key and must
/// carry an E.164 country-code prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub phone_number: String,
    pub name: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
        }
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.phone_number)
    }
}

/// Client-generated attachment identifier: millisecond timestamp plus a
/// random suffix, unique enough for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub u64);

impl AttachmentId {
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis() as u64;
        Self(millis * 1000 + rand::thread_rng().gen_range(0..1000))
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentKind {
    Image,
    Document,
}

/// A file attached to a composition. `url` is filled in once the file has
/// been handed to the image host; until then the attachment cannot go on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, kind: AttachmentKind) -> Self {
        Self {
            id: AttachmentId::generate(),
            name: name.into(),
            kind,
            caption: String::new(),
            url: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// An attachment is dispatchable only once its hosted URL is known.
    pub fn is_dispatchable(&self) -> bool {
        self.url.is_some()
    }
}

/// One entry of the backend's send history. Field spelling follows the
/// backend wire format (`isSuccessfull` included).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    pub id: i64,
    pub phone_number: String,
    /// Raw JSON of the original provider request.
    pub request_body: String,
    pub is_successfull: bool,
    pub is_scheduled: bool,
}

/// A message the backend is holding for later delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMessage {
    pub id: String,
    #[serde(rename = "dueDateUTC")]
    pub due_date_utc: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub request_body: Option<String>,
}
