//! The dispatch engine.
//!
//! [`Dispatcher::dispatch`] walks one decoded [`Notification`] (every
//! entry, every change, in order) and routes each embedded unit to its
//! registered handler:
//!
//! 1. envelope-level errors, in list order;
//! 2. status updates, in list order;
//! 3. messages, in list order, each classified first.
//!
//! Handler failures follow a two-tier policy. A recoverable error is
//! recorded and processing continues; once the walk completes, any recorded
//! errors surface as [`Outcome::PartialFailure`]. A fatal error stops the
//! walk immediately and surfaces as [`Outcome::Fatal`]; nothing later in
//! the same notification is processed. A message that fails classification
//! is recorded as a recoverable [`UnsupportedMessageType`]; a variant with
//! no registered handler is skipped without any record.
//!
//! The engine is sequential: one `dispatch` call runs the whole walk on the
//! caller's task, spawning nothing, imposing no timeout of its own. Callers
//! needing bounded latency wrap the call in `tokio::time::timeout`;
//! dropping the future between handler await points cancels the remainder
//! of the walk.
//!
//! [`UnsupportedMessageType`]: crate::error::UnsupportedMessageType

use tracing::{debug, error, warn};

use crate::error::{FatalError, HandlerError, RecoveredError, RecoveredErrors};
use crate::handler::{
    ErasedChangeHandler, ErasedMessageHandler, NotificationContext, Registry,
};
use crate::message::{classify, Content, MessageInfo};
use crate::notification::{Change, Notification};

/// The result of one [`Dispatcher::dispatch`] call.
#[derive(Debug)]
#[non_exhaustive]
pub enum Outcome {
    /// Every invoked handler succeeded (including the degenerate case of
    /// nothing to invoke).
    Success,

    /// At least one handler (or the classifier) failed recoverably; the
    /// whole notification was still processed.
    PartialFailure(RecoveredErrors),

    /// A handler failed fatally; processing stopped at that point.
    Fatal(FatalError),
}

impl Outcome {
    /// `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// `true` for [`Outcome::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Routes decoded notifications to the handlers of one [`Registry`].
///
/// The registry is fixed at construction; the dispatcher is cheap to share
/// behind an `Arc` and safe for concurrent `dispatch` calls, each of which
/// operates on its own independently decoded notification graph.
pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    /// Creates a dispatcher over a configured registry.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Processes one notification to completion, or to the first fatal
    /// handler error.
    pub async fn dispatch(&self, notification: Notification) -> Outcome {
        let mut recovered = Vec::new();

        for entry in notification.entries {
            for change in entry.changes {
                if let Err(fatal) = self.process_change(&entry.id, change, &mut recovered).await {
                    error!(
                        business = %entry.id,
                        message_id = fatal.message_id().unwrap_or(""),
                        "dispatch aborted by fatal handler error: {}",
                        fatal.source
                    );
                    return Outcome::Fatal(fatal);
                }
            }
        }

        if recovered.is_empty() {
            Outcome::Success
        } else {
            let recovered = RecoveredErrors { errors: recovered };
            warn!("{recovered}");
            Outcome::PartialFailure(recovered)
        }
    }

    async fn process_change(
        &self,
        business: &str,
        change: Change,
        recovered: &mut Vec<RecoveredError>,
    ) -> Result<(), FatalError> {
        let ctx = NotificationContext::new(business, &change.value);
        let value = change.value;

        for err in value.errors {
            self.run_change_handler(
                self.registry.envelope_error.as_deref(),
                "envelope_error",
                &ctx,
                err,
                None,
                recovered,
            )
            .await?;
        }

        for status in value.statuses {
            let message_id = Some(status.id.clone());
            self.run_change_handler(
                self.registry.status.as_deref(),
                "status",
                &ctx,
                status,
                message_id,
                recovered,
            )
            .await?;
        }

        for record in value.messages {
            let info = MessageInfo::from_record(&record);
            match classify(record) {
                Ok(content) => self.route(&ctx, &info, content, recovered).await?,
                Err(unsupported) => {
                    warn!(message_id = info.id(), "{unsupported}");
                    recovered.push(RecoveredError {
                        message_id: Some(info.id().to_owned()),
                        source: Box::new(unsupported),
                    });
                }
            }
        }

        Ok(())
    }

    async fn route(
        &self,
        ctx: &NotificationContext,
        info: &MessageInfo,
        content: Content,
        recovered: &mut Vec<RecoveredError>,
    ) -> Result<(), FatalError> {
        let registry = &self.registry;
        match content {
            Content::Text(text) => {
                self.run_message_handler(registry.text.as_deref(), ctx, info, text, recovered)
                    .await
            }
            Content::Media(media) => {
                self.run_message_handler(registry.media.as_deref(), ctx, info, media, recovered)
                    .await
            }
            Content::Location(location) => {
                self.run_message_handler(
                    registry.location.as_deref(),
                    ctx,
                    info,
                    location,
                    recovered,
                )
                .await
            }
            Content::Contacts(cards) => {
                self.run_message_handler(registry.contacts.as_deref(), ctx, info, cards, recovered)
                    .await
            }
            Content::Reaction(reaction) => {
                self.run_message_handler(
                    registry.reaction.as_deref(),
                    ctx,
                    info,
                    reaction,
                    recovered,
                )
                .await
            }
            Content::Order(order) => {
                self.run_message_handler(registry.order.as_deref(), ctx, info, order, recovered)
                    .await
            }
            Content::Button(button) => {
                self.run_message_handler(registry.button.as_deref(), ctx, info, button, recovered)
                    .await
            }
            Content::System(system) => {
                self.run_message_handler(registry.system.as_deref(), ctx, info, system, recovered)
                    .await
            }
            Content::IdentityChange(identity) => {
                self.run_message_handler(
                    registry.identity_change.as_deref(),
                    ctx,
                    info,
                    identity,
                    recovered,
                )
                .await
            }
            Content::ListReply(reply) => {
                self.run_message_handler(
                    registry.list_reply.as_deref(),
                    ctx,
                    info,
                    reply,
                    recovered,
                )
                .await
            }
            Content::ButtonReply(reply) => {
                self.run_message_handler(
                    registry.button_reply.as_deref(),
                    ctx,
                    info,
                    reply,
                    recovered,
                )
                .await
            }
            Content::FlowReply(reply) => {
                self.run_message_handler(
                    registry.flow_reply.as_deref(),
                    ctx,
                    info,
                    reply,
                    recovered,
                )
                .await
            }
            Content::Interactive(interactive) => {
                self.run_message_handler(
                    registry.interactive.as_deref(),
                    ctx,
                    info,
                    interactive,
                    recovered,
                )
                .await
            }
            Content::Referral(bundle) => {
                self.run_message_handler(
                    registry.referral.as_deref(),
                    ctx,
                    info,
                    bundle,
                    recovered,
                )
                .await
            }
            Content::ProductEnquiry(enquiry) => {
                self.run_message_handler(
                    registry.product_enquiry.as_deref(),
                    ctx,
                    info,
                    enquiry,
                    recovered,
                )
                .await
            }
            Content::Unknown(errors) => {
                self.run_message_handler(
                    registry.unknown.as_deref(),
                    ctx,
                    info,
                    errors,
                    recovered,
                )
                .await
            }
        }
    }

    async fn run_message_handler<P: Send + 'static>(
        &self,
        slot: Option<&dyn ErasedMessageHandler<P>>,
        ctx: &NotificationContext,
        info: &MessageInfo,
        payload: P,
        recovered: &mut Vec<RecoveredError>,
    ) -> Result<(), FatalError> {
        let Some(handler) = slot else {
            debug!(
                message_id = info.id(),
                type_tag = info.type_tag(),
                "no handler registered for variant; skipping"
            );
            return Ok(());
        };

        match handler.call(ctx, info, payload).await {
            Ok(()) => Ok(()),
            Err(HandlerError::Recoverable(source)) => {
                recovered.push(RecoveredError {
                    message_id: Some(info.id().to_owned()),
                    source,
                });
                Ok(())
            }
            Err(HandlerError::Fatal(source)) => Err(FatalError {
                message_id: Some(info.id().to_owned()),
                source,
            }),
        }
    }

    async fn run_change_handler<P: Send + 'static>(
        &self,
        slot: Option<&dyn ErasedChangeHandler<P>>,
        slot_name: &'static str,
        ctx: &NotificationContext,
        payload: P,
        message_id: Option<String>,
        recovered: &mut Vec<RecoveredError>,
    ) -> Result<(), FatalError> {
        let Some(handler) = slot else {
            debug!(slot = slot_name, "no handler registered; skipping");
            return Ok(());
        };

        match handler.call(ctx, payload).await {
            Ok(()) => Ok(()),
            Err(HandlerError::Recoverable(source)) => {
                recovered.push(RecoveredError { message_id, source });
                Ok(())
            }
            Err(HandlerError::Fatal(source)) => Err(FatalError { message_id, source }),
        }
    }
}
