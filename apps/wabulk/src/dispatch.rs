//! Dispatch planning and execution for one "Send" action
//!
//! A send is converted into an explicit ordered plan of steps, then the
//! steps run strictly in sequence: the text step first, each selected
//! attachment after it. A failed recipient in the text step aborts the
//! rest; attachment failures only affect their own step. Turbo mode
//! collapses everything into a single request.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use tokio::sync::Mutex;

use wabulk_core::{Result, WabulkError};

use crate::api::wire::{
    DocumentRequest, ImageRequest, SendEnvelope, Template, TemplateRequest, TextBody, TextRequest,
    TurboRequest,
};
use crate::api::{normalize, DeliveryRecord, OutboundRequest, SenderTransport};
use crate::log::{LogKind, SendingLog};
use crate::model::{Attachment, AttachmentId, AttachmentKind, Contact};
use crate::ordering::order_recipients;
use crate::settings::SettingsStore;
use crate::template::{self, RenderContext};

/// Everything the user has entered but not yet sent. Preserved unchanged on
/// any failure so a retry is one click away; cleared after a successful
/// dispatch.
#[derive(Debug, Clone, Default)]
pub struct ComposeState {
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub selected_attachments: Vec<AttachmentId>,
    pub turbo_mode: bool,
    /// Raw user input; `Some` means the send is scheduled. Parsed and
    /// validated when the plan is built.
    pub scheduled_time: Option<String>,
}

/// One outbound request in a plan.
#[derive(Debug, Clone)]
pub enum SendStep {
    /// Text for every recipient. Any recipient failure aborts the plan.
    Text { body: String },
    /// One attachment; failures do not stop later attachments.
    Attachment { attachment: Attachment },
    /// Turbo mode: text plus every selected attachment in one request.
    Combined {
        body: String,
        attachments: Vec<Attachment>,
    },
}

impl SendStep {
    fn aborts_on_failure(&self) -> bool {
        !matches!(self, Self::Attachment { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SendPlan {
    pub steps: Vec<SendStep>,
    pub recipients: Vec<Contact>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Selected attachments without a hosted URL yet; reported, not sent.
    pub skipped_pending: Vec<Attachment>,
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub requests_attempted: usize,
    pub records: Vec<DeliveryRecord>,
    /// True when the text step failed and the attachment steps were skipped.
    pub aborted: bool,
    /// True when the compose state was cleared after success.
    pub cleared: bool,
}

/// Validate a compose state and turn it into an ordered plan. Pure: no
/// network, no logging, so every rejection happens before a request exists.
pub fn build_plan(
    state: &ComposeState,
    recipients: &[Contact],
    now: DateTime<Utc>,
) -> Result<SendPlan> {
    let message = state.message.trim();
    let selected: Vec<Attachment> = state
        .attachments
        .iter()
        .filter(|attachment| state.selected_attachments.contains(&attachment.id))
        .cloned()
        .collect();

    if state.turbo_mode && message.is_empty() {
        return Err(WabulkError::Validation(
            "Please enter a message when turbo mode is enabled".to_string(),
        ));
    }
    if !state.turbo_mode && message.is_empty() && selected.is_empty() {
        return Err(WabulkError::Validation(
            "Please add a message or select attachments to send".to_string(),
        ));
    }
    if recipients.is_empty() {
        return Err(WabulkError::Validation(
            "Please select at least one contact".to_string(),
        ));
    }

    let scheduled_at = state
        .scheduled_time
        .as_deref()
        .map(|raw| parse_schedule(raw, now))
        .transpose()?;

    let (dispatchable, skipped_pending): (Vec<_>, Vec<_>) =
        selected.into_iter().partition(Attachment::is_dispatchable);

    let mut steps = Vec::new();
    if state.turbo_mode {
        steps.push(SendStep::Combined {
            body: state.message.clone(),
            attachments: dispatchable,
        });
    } else {
        if !message.is_empty() {
            steps.push(SendStep::Text {
                body: state.message.clone(),
            });
        }
        steps.extend(
            dispatchable
                .into_iter()
                .map(|attachment| SendStep::Attachment { attachment }),
        );
    }

    if steps.is_empty() {
        return Err(WabulkError::Validation(
            "Selected attachments are still uploading".to_string(),
        ));
    }

    Ok(SendPlan {
        steps,
        recipients: recipients.to_vec(),
        scheduled_at,
        skipped_pending,
    })
}

fn parse_schedule(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let parsed = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
    {
        // Bare datetimes are taken as local wall-clock time.
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| WabulkError::Validation("Invalid scheduled time format".to_string()))?
            .with_timezone(&Utc)
    } else {
        return Err(WabulkError::Validation(
            "Invalid scheduled time format".to_string(),
        ));
    };

    if parsed < now {
        return Err(WabulkError::Validation(
            "Scheduled time must not be in the past".to_string(),
        ));
    }
    Ok(parsed)
}

pub struct Dispatcher {
    transport: Arc<dyn SenderTransport>,
    log: Arc<SendingLog>,
    settings: Arc<SettingsStore>,
    /// Provider token forwarded verbatim in every sender payload.
    provider_token: String,
    /// Single-slot guard: one dispatch per session at a time, so a double
    /// click cannot launch overlapping duplicate sends.
    in_flight: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn SenderTransport>,
        log: Arc<SendingLog>,
        settings: Arc<SettingsStore>,
        provider_token: String,
    ) -> Self {
        Self {
            transport,
            log,
            settings,
            provider_token,
            in_flight: Mutex::new(()),
        }
    }

    /// Execute one "Send" action. Steps run in order, awaiting each response
    /// before the next request goes out.
    pub async fn dispatch(
        &self,
        state: &mut ComposeState,
        recipients: &[Contact],
    ) -> Result<DispatchReport> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| WabulkError::SendInProgress)?;

        let plan = build_plan(state, recipients, Utc::now())?;

        for skipped in &plan.skipped_pending {
            self.log.add(
                format!("Skipping {}: no hosted URL yet", skipped.name),
                LogKind::Warning,
                None,
            );
        }

        let scheduled_wire = plan
            .scheduled_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true));
        let ctx = match plan.scheduled_at {
            Some(at) => RenderContext::scheduled(at),
            None => RenderContext::immediate(),
        };
        let numbers: Vec<String> = plan
            .recipients
            .iter()
            .map(|contact| contact.phone_number.clone())
            .collect();

        self.log.add(
            format!(
                "Dispatching {} request(s) to {} recipient(s)",
                plan.steps.len(),
                numbers.len()
            ),
            LogKind::Info,
            None,
        );

        let mut report = DispatchReport::default();
        for step in &plan.steps {
            // Settings are read per request, not snapshotted at plan time.
            let settings = self.settings.current();
            let envelope = SendEnvelope {
                to: order_recipients(&numbers, settings.randomize_order),
                access_token: self.provider_token.clone(),
                delay_between_messages_in_ms: settings.time_gap_secs * 1000,
                scheduled_time_in_utc: scheduled_wire.clone(),
            };
            let request = build_request(step, envelope, &ctx);
            report.requests_attempted += 1;

            match self.transport.send(&request).await {
                Ok(response) => {
                    let records = normalize(response);
                    let any_failed =
                        self.log_outcomes(&request, &records, scheduled_wire.is_some());
                    report.records.extend(records);
                    if any_failed && step.aborts_on_failure() {
                        report.aborted = true;
                        self.log.add(
                            "Aborting remaining sends after text delivery failure",
                            LogKind::Warning,
                            None,
                        );
                        break;
                    }
                }
                Err(err) => {
                    self.log.add(
                        format!("Failed to send {} request", request.label()),
                        LogKind::Error,
                        Some(err.to_string()),
                    );
                    if step.aborts_on_failure() {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        let any_success = report.records.iter().any(|record| record.is_success);
        if !report.aborted && any_success {
            state.message.clear();
            state.attachments.clear();
            state.selected_attachments.clear();
            state.scheduled_time = None;
            report.cleared = true;
        }
        Ok(report)
    }

    /// Templates are a separate, simpler path: one request, one log entry
    /// either way, no splitting and no attachment handling.
    pub async fn dispatch_template(
        &self,
        recipients: &[Contact],
        template: Template,
    ) -> Result<Vec<DeliveryRecord>> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| WabulkError::SendInProgress)?;

        if recipients.is_empty() {
            return Err(WabulkError::Validation(
                "Please select at least one contact".to_string(),
            ));
        }
        if template.name.trim().is_empty() {
            return Err(WabulkError::Validation(
                "Template name is required".to_string(),
            ));
        }

        let envelope = SendEnvelope {
            to: recipients
                .iter()
                .map(|contact| contact.phone_number.clone())
                .collect(),
            access_token: self.provider_token.clone(),
            delay_between_messages_in_ms: 0,
            scheduled_time_in_utc: None,
        };
        let request = OutboundRequest::Template(TemplateRequest { envelope, template });

        match self.transport.send(&request).await {
            Ok(response) => {
                let records = normalize(response);
                if records.iter().all(|record| record.is_success) {
                    self.log.add("Template sent", LogKind::Success, None);
                } else {
                    let details = records
                        .iter()
                        .find(|record| !record.is_success)
                        .map(failure_details);
                    self.log.add("Failed to send template", LogKind::Error, details);
                }
                Ok(records)
            }
            Err(err) => {
                self.log
                    .add("Failed to send template", LogKind::Error, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// One log entry per recipient outcome; returns whether anything failed.
    fn log_outcomes(
        &self,
        request: &OutboundRequest,
        records: &[DeliveryRecord],
        scheduled: bool,
    ) -> bool {
        let mut any_failed = false;
        for record in records {
            let target = record.recipient.as_deref().unwrap_or("all recipients");
            if record.is_success {
                let message = if scheduled {
                    format!("Message scheduled for {target}")
                } else {
                    format!("Message sent to {target}")
                };
                let details = record.message_id.as_ref().map(|id| format!("message id {id}"));
                self.log.add(message, LogKind::Success, details);
            } else {
                any_failed = true;
                self.log.add(
                    format!("Failed to send {} to {target}", request.label()),
                    LogKind::Error,
                    Some(failure_details(record)),
                );
            }
        }
        any_failed
    }
}

fn failure_details(record: &DeliveryRecord) -> String {
    record
        .error
        .as_ref()
        .map(|error| error.message.clone())
        .unwrap_or_else(|| record.details.to_string())
}

fn build_request(step: &SendStep, envelope: SendEnvelope, ctx: &RenderContext) -> OutboundRequest {
    match step {
        SendStep::Text { body } => OutboundRequest::Text(TextRequest {
            envelope,
            text: TextBody::new(template::render_shared(body, ctx)),
        }),
        SendStep::Attachment { attachment } => {
            let media = crate::api::wire::MediaBody::from_attachment(attachment);
            match attachment.kind {
                AttachmentKind::Image => {
                    OutboundRequest::Image(ImageRequest { envelope, image: media })
                }
                AttachmentKind::Document => {
                    OutboundRequest::Document(DocumentRequest { envelope, document: media })
                }
            }
        }
        SendStep::Combined { body, attachments } => OutboundRequest::Turbo(TurboRequest {
            envelope,
            text: TextBody::new(template::render_shared(body, ctx)),
            attachments: attachments.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::response::{AggregateResult, RecipientResult, SenderResponse};
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    struct MockTransport {
        requests: parking_lot::Mutex<Vec<OutboundRequest>>,
        responses: parking_lot::Mutex<VecDeque<Result<SenderResponse>>>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                requests: parking_lot::Mutex::new(Vec::new()),
                responses: parking_lot::Mutex::new(VecDeque::new()),
            }
        }

        fn push_response(&self, response: Result<SenderResponse>) {
            self.responses.lock().push_back(response);
        }

        fn recorded(&self) -> Vec<OutboundRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl SenderTransport for MockTransport {
        async fn send(&self, request: &OutboundRequest) -> Result<SenderResponse> {
            self.requests.lock().push(request.clone());
            self.responses.lock().pop_front().unwrap_or_else(|| {
                Ok(SenderResponse::Aggregate(AggregateResult {
                    success: true,
                    error: None,
                }))
            })
        }
    }

    fn recipients() -> Vec<Contact> {
        vec![
            Contact::new("Ada", "+441000"),
            Contact::new("Grace", "+441001"),
        ]
    }

    fn uploaded(name: &str, kind: AttachmentKind) -> Attachment {
        Attachment::new(name, kind).with_url(format!("https://img.example/{name}"))
    }

    fn compose(message: &str, attachments: Vec<Attachment>) -> ComposeState {
        let selected_attachments = attachments.iter().map(|a| a.id).collect();
        ComposeState {
            message: message.to_string(),
            attachments,
            selected_attachments,
            turbo_mode: false,
            scheduled_time: None,
        }
    }

    fn dispatcher(transport: Arc<MockTransport>) -> Dispatcher {
        Dispatcher::new(
            transport,
            Arc::new(SendingLog::new()),
            Arc::new(SettingsStore::default()),
            "provider-token".to_string(),
        )
    }

    fn recipient_failure(number: &str) -> SenderResponse {
        SenderResponse::PerRecipient(vec![RecipientResult {
            recipient: number.to_string(),
            is_success: false,
            response_content: r#"{"error":{"message":"undeliverable"}}"#.to_string(),
        }])
    }

    #[tokio::test]
    async fn non_turbo_sends_text_then_each_attachment_in_order() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(transport.clone());
        let mut state = compose(
            "hi",
            vec![
                uploaded("a.png", AttachmentKind::Image),
                uploaded("b.pdf", AttachmentKind::Document),
            ],
        );

        let report = dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        let labels: Vec<&str> = transport.recorded().iter().map(|r| r.label()).collect();
        assert_eq!(labels, ["text", "image", "document"]);
        assert_eq!(report.requests_attempted, 3);
        assert!(!report.aborted);
        assert!(report.cleared);
        assert!(state.message.is_empty());
        assert!(state.attachments.is_empty());
        assert!(state.selected_attachments.is_empty());
    }

    #[tokio::test]
    async fn text_failure_aborts_all_attachment_sends() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(Ok(recipient_failure("+441000")));
        let dispatcher = dispatcher(transport.clone());
        let mut state = compose(
            "hi",
            vec![
                uploaded("a.png", AttachmentKind::Image),
                uploaded("b.pdf", AttachmentKind::Document),
            ],
        );

        let report = dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        assert_eq!(transport.recorded().len(), 1);
        assert!(report.aborted);
        assert!(!report.cleared);
        assert_eq!(state.message, "hi");
        assert_eq!(state.attachments.len(), 2);
    }

    #[tokio::test]
    async fn attachment_failures_are_isolated_from_each_other() {
        let transport = Arc::new(MockTransport::new());
        // Text succeeds, first attachment transport-fails, second succeeds.
        transport.push_response(Ok(SenderResponse::Aggregate(AggregateResult {
            success: true,
            error: None,
        })));
        transport.push_response(Err(WabulkError::Network("connection reset".to_string())));
        let dispatcher = dispatcher(transport.clone());
        let mut state = compose(
            "hi",
            vec![
                uploaded("a.png", AttachmentKind::Image),
                uploaded("b.pdf", AttachmentKind::Document),
            ],
        );

        let report = dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        assert_eq!(transport.recorded().len(), 3);
        assert!(!report.aborted);
        assert!(report.cleared);
    }

    #[tokio::test]
    async fn turbo_mode_sends_one_combined_request() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(transport.clone());
        let mut state = compose(
            "hi",
            vec![
                uploaded("a.png", AttachmentKind::Image),
                uploaded("b.pdf", AttachmentKind::Document),
            ],
        );
        state.turbo_mode = true;

        let report = dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].label(), "turbo");
        let json = serde_json::to_value(&recorded[0]).unwrap();
        assert_eq!(json["text"]["body"], "hi");
        assert_eq!(json["attachments"].as_array().unwrap().len(), 2);
        assert!(report.cleared);
    }

    #[tokio::test]
    async fn turbo_mode_requires_a_message() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(transport.clone());
        let mut state = compose("   ", vec![uploaded("a.png", AttachmentKind::Image)]);
        state.turbo_mode = true;

        let err = dispatcher.dispatch(&mut state, &recipients()).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));
        assert!(transport.recorded().is_empty());
    }

    #[tokio::test]
    async fn empty_compositions_and_empty_recipient_lists_are_rejected() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(transport.clone());

        let mut nothing = compose("", vec![]);
        let err = dispatcher.dispatch(&mut nothing, &recipients()).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));

        let mut state = compose("hi", vec![]);
        let err = dispatcher.dispatch(&mut state, &[]).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));

        assert!(transport.recorded().is_empty());
    }

    #[tokio::test]
    async fn unparseable_and_past_schedules_are_rejected_before_dispatch() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(transport.clone());

        let mut state = compose("hi", vec![]);
        state.scheduled_time = Some("whenever".to_string());
        let err = dispatcher.dispatch(&mut state, &recipients()).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));

        state.scheduled_time = Some("2001-01-01T00:00:00Z".to_string());
        let err = dispatcher.dispatch(&mut state, &recipients()).await.unwrap_err();
        assert!(matches!(err, WabulkError::Validation(_)));

        assert!(transport.recorded().is_empty());
        assert_eq!(state.message, "hi");
    }

    #[tokio::test]
    async fn schedule_rides_the_envelope_and_clears_after_success() {
        let transport = Arc::new(MockTransport::new());
        let dispatcher = dispatcher(transport.clone());
        let future = (Utc::now() + chrono::Duration::hours(1))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut state = compose("hi", vec![]);
        state.scheduled_time = Some(future);

        let report = dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        let recorded = transport.recorded();
        assert!(recorded[0].envelope().scheduled_time_in_utc.is_some());
        assert!(report.cleared);
        assert!(state.scheduled_time.is_none());
    }

    #[tokio::test]
    async fn envelope_carries_settings_read_at_send_time() {
        let transport = Arc::new(MockTransport::new());
        let settings = Arc::new(SettingsStore::default());
        settings.update(crate::settings::SettingsUpdate {
            time_gap_secs: Some(3),
            randomize_order: Some(false),
        });
        let dispatcher = Dispatcher::new(
            transport.clone(),
            Arc::new(SendingLog::new()),
            settings,
            "provider-token".to_string(),
        );
        let mut state = compose("hi", vec![]);

        dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        let envelope = transport.recorded()[0].envelope().clone();
        assert_eq!(envelope.delay_between_messages_in_ms, 3000);
        assert_eq!(envelope.to, vec!["+441000", "+441001"]);
        assert_eq!(envelope.access_token, "provider-token");
    }

    #[tokio::test]
    async fn pending_attachments_are_skipped_with_a_warning() {
        let transport = Arc::new(MockTransport::new());
        let log = Arc::new(SendingLog::new());
        let dispatcher = Dispatcher::new(
            transport.clone(),
            log.clone(),
            Arc::new(SettingsStore::default()),
            "provider-token".to_string(),
        );
        let pending = Attachment::new("slow.png", AttachmentKind::Image);
        let mut state = compose("hi", vec![pending]);

        dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        assert_eq!(transport.recorded().len(), 1);
        assert!(log
            .entries()
            .iter()
            .any(|entry| entry.kind == LogKind::Warning && entry.message.contains("slow.png")));
    }

    #[tokio::test]
    async fn mixed_outcomes_log_one_entry_per_recipient() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(Ok(SenderResponse::PerRecipient(vec![
            RecipientResult {
                recipient: "+441000".to_string(),
                is_success: true,
                response_content: r#"{"messages":[{"id":"m1"}]}"#.to_string(),
            },
            RecipientResult {
                recipient: "+441001".to_string(),
                is_success: false,
                response_content: r#"{"error":{"message":"undeliverable"}}"#.to_string(),
            },
        ])));
        let log = Arc::new(SendingLog::new());
        let dispatcher = Dispatcher::new(
            transport,
            log.clone(),
            Arc::new(SettingsStore::default()),
            "provider-token".to_string(),
        );
        let mut state = compose("hi", vec![]);

        let report = dispatcher.dispatch(&mut state, &recipients()).await.unwrap();

        assert!(report.aborted);
        let entries = log.entries();
        assert!(entries
            .iter()
            .any(|e| e.kind == LogKind::Success && e.message == "Message sent to +441000"));
        assert!(entries
            .iter()
            .any(|e| e.kind == LogKind::Error && e.message.contains("+441001")));
    }

    #[tokio::test]
    async fn template_dispatch_is_one_request_and_one_log_entry() {
        let transport = Arc::new(MockTransport::new());
        let log = Arc::new(SendingLog::new());
        let dispatcher = Dispatcher::new(
            transport.clone(),
            log.clone(),
            Arc::new(SettingsStore::default()),
            "provider-token".to_string(),
        );
        let template = Template {
            name: "hello_world".to_string(),
            language: crate::api::wire::TemplateLanguage::deterministic("en_US"),
            components: crate::api::wire::TemplateComponents::body(vec![]),
        };

        let records = dispatcher
            .dispatch_template(&recipients(), template)
            .await
            .unwrap();

        assert_eq!(transport.recorded().len(), 1);
        assert_eq!(transport.recorded()[0].label(), "template");
        assert!(records[0].is_success);
        let successes: Vec<_> = log
            .entries()
            .into_iter()
            .filter(|e| e.kind == LogKind::Success)
            .collect();
        assert_eq!(successes.len(), 1);
        assert_eq!(successes[0].message, "Template sent");
    }

    struct BlockingTransport {
        started: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl SenderTransport for BlockingTransport {
        async fn send(&self, _request: &OutboundRequest) -> Result<SenderResponse> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(SenderResponse::Aggregate(AggregateResult {
                success: true,
                error: None,
            }))
        }
    }

    #[tokio::test]
    async fn a_second_dispatch_is_refused_while_one_is_in_flight() {
        let transport = Arc::new(BlockingTransport {
            started: Notify::new(),
            release: Notify::new(),
        });
        let dispatcher = Arc::new(Dispatcher::new(
            transport.clone(),
            Arc::new(SendingLog::new()),
            Arc::new(SettingsStore::default()),
            "provider-token".to_string(),
        ));

        let first = {
            let dispatcher = dispatcher.clone();
            let recipients = recipients();
            tokio::spawn(async move {
                let mut state = compose("hi", vec![]);
                dispatcher.dispatch(&mut state, &recipients).await
            })
        };
        transport.started.notified().await;

        let mut state = compose("second", vec![]);
        let err = dispatcher
            .dispatch(&mut state, &recipients())
            .await
            .unwrap_err();
        assert!(matches!(err, WabulkError::SendInProgress));
        assert_eq!(state.message, "second");

        transport.release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert!(report.cleared);
    }
}
