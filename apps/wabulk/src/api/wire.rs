//! Outbound payloads for the sender backend
//!
//! The envelope fields ride along on every sender request; the body field
//! (`text`, `image`, `document`, `template`) decides the route.

use serde::Serialize;

use crate::model::Attachment;

/// Common fields carried by every sender request. `scheduled_time_in_utc`
/// serializes as an explicit `null` for immediate sends, which is what the
/// backend expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEnvelope {
    pub to: Vec<String>,
    pub access_token: String,
    pub delay_between_messages_in_ms: u64,
    pub scheduled_time_in_utc: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBody {
    pub preview_url: bool,
    pub body: String,
}

impl TextBody {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            preview_url: false,
            body: body.into(),
        }
    }
}

/// Image and document bodies share one shape.
#[derive(Debug, Clone, Serialize)]
pub struct MediaBody {
    pub link: String,
    pub caption: String,
    pub filename: String,
}

impl MediaBody {
    /// Callers must only pass dispatchable attachments; a missing URL
    /// degrades to an empty link rather than a panic.
    pub fn from_attachment(attachment: &Attachment) -> Self {
        Self {
            link: attachment.url.clone().unwrap_or_default(),
            caption: attachment.caption.clone(),
            filename: attachment.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextRequest {
    #[serde(flatten)]
    pub envelope: SendEnvelope,
    pub text: TextBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    #[serde(flatten)]
    pub envelope: SendEnvelope,
    pub image: MediaBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRequest {
    #[serde(flatten)]
    pub envelope: SendEnvelope,
    pub document: MediaBody,
}

/// Turbo mode: the text and every selected attachment in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct TurboRequest {
    #[serde(flatten)]
    pub envelope: SendEnvelope,
    pub text: TextBody,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateRequest {
    #[serde(flatten)]
    pub envelope: SendEnvelope,
    pub template: Template,
}

#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub name: String,
    pub language: TemplateLanguage,
    pub components: TemplateComponents,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateLanguage {
    pub policy: String,
    pub code: String,
}

impl TemplateLanguage {
    /// The provider only supports deterministic language resolution.
    pub fn deterministic(code: impl Into<String>) -> Self {
        Self {
            policy: "deterministic".to_string(),
            code: code.into(),
        }
    }
}

/// A single body component; the provider takes an object here, not a list.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateComponents {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Vec<TemplateParameter>,
}

impl TemplateComponents {
    pub fn body(parameters: Vec<TemplateParameter>) -> Self {
        Self {
            kind: "body".to_string(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateParameter {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TemplateParameter {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: value.into(),
        }
    }
}

/// One outbound send request, ready for the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundRequest {
    Text(TextRequest),
    Image(ImageRequest),
    Document(DocumentRequest),
    Turbo(TurboRequest),
    Template(TemplateRequest),
}

impl OutboundRequest {
    /// Backend route for this payload. The capitalized Image segment
    /// matches the deployed backend.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Text(_) | Self::Turbo(_) => "/api/whatsapp/sender/text",
            Self::Image(_) => "/api/whatsapp/sender/Image",
            Self::Document(_) => "/api/whatsapp/sender/document",
            Self::Template(_) => "/api/whatsapp/sender/template",
        }
    }

    /// Short label used in log entries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Document(_) => "document",
            Self::Turbo(_) => "turbo",
            Self::Template(_) => "template",
        }
    }

    pub fn envelope(&self) -> &SendEnvelope {
        match self {
            Self::Text(r) => &r.envelope,
            Self::Image(r) => &r.envelope,
            Self::Document(r) => &r.envelope,
            Self::Turbo(r) => &r.envelope,
            Self::Template(r) => &r.envelope,
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.envelope().to
    }
}
