//! Placeholder expansion for composed message bodies
//!
//! Bodies may carry `{{name}}`, `{{number}}`, `{{timeNow}}`, `{{sentTime}}`
//! and `{{randomTag}}` markers. Expansion is a global replace; unknown
//! markers pass through untouched so a typo never breaks a send.

use chrono::{DateTime, Local, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::model::Contact;

const NAME: &str = "{{name}}";
const NUMBER: &str = "{{number}}";
const TIME_NOW: &str = "{{timeNow}}";
const SENT_TIME: &str = "{{sentTime}}";
const RANDOM_TAG: &str = "{{randomTag}}";

const TAG_LEN: usize = 6;

/// Ambient values available to placeholder expansion.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub now: DateTime<Utc>,
    /// Scheduled delivery time, or `now` for immediate sends.
    pub send_time: DateTime<Utc>,
}

impl RenderContext {
    pub fn immediate() -> Self {
        let now = Utc::now();
        Self {
            now,
            send_time: now,
        }
    }

    pub fn scheduled(at: DateTime<Utc>) -> Self {
        Self {
            now: Utc::now(),
            send_time: at,
        }
    }
}

/// Expand every marker for one recipient. The random tag is regenerated on
/// each call, so two recipients never share one.
pub fn render(template: &str, contact: &Contact, ctx: &RenderContext) -> String {
    render_shared(
        &template
            .replace(NAME, &contact.name)
            .replace(NUMBER, &contact.phone_number),
        ctx,
    )
}

/// Expand only the markers that do not depend on the recipient. This is
/// what goes on the wire: one text request covers every recipient, so
/// per-recipient markers ride through for the recipient-aware backend.
pub fn render_shared(template: &str, ctx: &RenderContext) -> String {
    let mut out = template
        .replace(TIME_NOW, &format_local(ctx.now))
        .replace(SENT_TIME, &format_local(ctx.send_time));
    while out.contains(RANDOM_TAG) {
        out = out.replacen(RANDOM_TAG, &random_tag(), 1);
    }
    out
}

/// Per-recipient renderings for the preview surface.
pub fn preview(template: &str, recipients: &[Contact], ctx: &RenderContext) -> Vec<(String, String)> {
    recipients
        .iter()
        .map(|contact| (contact.phone_number.clone(), render(template, contact, ctx)))
        .collect()
}

/// Short alphanumeric token, fresh per call.
pub fn random_tag() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TAG_LEN)
        .map(char::from)
        .collect()
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact::new("Ada Lovelace", "+4411223344")
    }

    #[test]
    fn name_and_number_render_exactly() {
        let rendered = render("{{name}} {{number}}", &contact(), &RenderContext::immediate());
        assert_eq!(rendered, "Ada Lovelace +4411223344");
    }

    #[test]
    fn replacement_is_global_not_first_match() {
        let rendered = render(
            "{{name}}, yes you, {{name}}",
            &contact(),
            &RenderContext::immediate(),
        );
        assert_eq!(rendered, "Ada Lovelace, yes you, Ada Lovelace");
    }

    #[test]
    fn unknown_markers_pass_through() {
        let rendered = render("hi {{nickname}}", &contact(), &RenderContext::immediate());
        assert_eq!(rendered, "hi {{nickname}}");
    }

    #[test]
    fn random_tag_is_fresh_per_call() {
        let a = render("{{randomTag}}", &contact(), &RenderContext::immediate());
        let b = render("{{randomTag}}", &contact(), &RenderContext::immediate());
        assert_eq!(a.len(), TAG_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn repeated_random_tags_differ_within_one_body() {
        let rendered = render_shared("{{randomTag}} {{randomTag}}", &RenderContext::immediate());
        let mut parts = rendered.split(' ');
        let (a, b) = (parts.next().unwrap(), parts.next().unwrap());
        assert_eq!(a.len(), TAG_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn sent_time_uses_the_scheduled_instant() {
        let at = Utc::now() + chrono::Duration::hours(2);
        let ctx = RenderContext::scheduled(at);
        let rendered = render("{{sentTime}}", &contact(), &ctx);
        assert_eq!(rendered, at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string());
    }

    #[test]
    fn preview_handles_an_empty_recipient_list() {
        assert!(preview("hello", &[], &RenderContext::immediate()).is_empty());
    }
}
