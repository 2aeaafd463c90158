//! Handler contract and registry.
//!
//! Applications react to webhook traffic by registering one async callback
//! per classified message variant (plus one for status updates and one for
//! envelope-level errors) into a [`Registry`]. A variant with no registered
//! handler is skipped silently during dispatch.
//!
//! The registry is plain owned state: build it once with
//! [`Registry::builder`], hand it to a
//! [`Dispatcher`](crate::dispatch::Dispatcher), and share the dispatcher
//! (e.g. behind `Arc`) across however many connections the embedding server
//! accepts. Nothing here is global, so multi-tenant hosts can run several
//! engines with distinct registries side by side.
//!
//! # Implementing handlers
//!
//! A handler is any type implementing [`MessageHandler`] for its payload
//! type, or a plain closure:
//!
//! ```rust
//! use whatsapp_webhooks_rs::{
//!     error::HandlerError,
//!     handler::{MessageHandler, NotificationContext, Registry},
//!     message::MessageInfo,
//!     notification::{Order, Text},
//! };
//!
//! struct OrderDesk;
//!
//! impl MessageHandler<Order> for OrderDesk {
//!     async fn handle(
//!         &self,
//!         _ctx: &NotificationContext,
//!         info: &MessageInfo,
//!         order: Order,
//!     ) -> Result<(), HandlerError> {
//!         println!("order {} with {} item(s)", info.id(), order.product_items.len());
//!         Ok(())
//!     }
//! }
//!
//! let registry = Registry::builder()
//!     .on_order(OrderDesk)
//!     .on_text(|_ctx: &NotificationContext, info: &MessageInfo, text: Text| {
//!         // Closures get the same arguments; copy what the future needs
//!         // out of the borrowed context before the async block.
//!         let sender = info.sender().to_owned();
//!         async move {
//!             println!("{sender}: {}", text.body);
//!             Ok(())
//!         }
//!     })
//!     .build();
//! # let _ = registry;
//! ```

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;

use crate::error::HandlerError;
use crate::message::{MediaMessage, MessageInfo, ProductEnquiry, ReferralMessage};
use crate::notification::{
    BusinessMetadata, Button, ButtonReply, Contact, ContactCard, CustomerIdentity, FlowReply,
    InteractiveRecord, ListReply, Location, Order, Reaction, StatusRecord, SystemEvent, Text,
    Value,
};
use crate::PlatformError;

/// Read-only context shared by every handler invoked for one change.
///
/// Built once per change from the entry's business account id and the
/// change value's contact/metadata blocks, and passed by reference to each
/// handler invocation.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct NotificationContext {
    pub(crate) business: String,
    pub(crate) contacts: Vec<Contact>,
    pub(crate) metadata: BusinessMetadata,
}

impl NotificationContext {
    pub(crate) fn new(business: &str, value: &Value) -> Self {
        Self {
            business: business.to_owned(),
            contacts: value.contacts.clone(),
            metadata: value.metadata.clone().unwrap_or_default(),
        }
    }

    /// The WhatsApp Business Account id the change belongs to.
    pub fn business_id(&self) -> &str {
        &self.business
    }

    /// Contact info for the customers whose messages are in this change.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// The business phone identity the change was delivered for.
    pub fn metadata(&self) -> &BusinessMetadata {
        &self.metadata
    }

    /// Looks up the profile of a sender by WhatsApp id.
    pub fn contact(&self, wa_id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.wa_id == wa_id)
    }
}

/// A handler for one classified message variant.
///
/// `P` is the payload type bound to the variant (e.g. [`Text`], [`Order`],
/// [`MediaMessage`]). Returning [`HandlerError::Recoverable`] records the
/// failure and lets the batch continue; [`HandlerError::Fatal`] aborts the
/// whole dispatch call.
///
/// Any `Fn(&NotificationContext, &MessageInfo, P) -> impl Future` closure
/// qualifies, as long as its future does not borrow from the two context
/// references (copy what you need before the async block).
pub trait MessageHandler<P>: Send + Sync {
    /// Handles one message of this variant.
    fn handle(
        &self,
        ctx: &NotificationContext,
        info: &MessageInfo,
        payload: P,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

impl<F, Fut, P> MessageHandler<P> for F
where
    F: Fn(&NotificationContext, &MessageInfo, P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    #[inline]
    fn handle(
        &self,
        ctx: &NotificationContext,
        info: &MessageInfo,
        payload: P,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        self(ctx, info, payload)
    }
}

/// A handler for change-level payloads that are not messages: status
/// updates and envelope errors.
///
/// Same error contract as [`MessageHandler`], minus the per-message info.
pub trait ChangeHandler<P>: Send + Sync {
    /// Handles one status update or envelope error.
    fn handle(
        &self,
        ctx: &NotificationContext,
        payload: P,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;
}

impl<F, Fut, P> ChangeHandler<P> for F
where
    F: Fn(&NotificationContext, P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    #[inline]
    fn handle(
        &self,
        ctx: &NotificationContext,
        payload: P,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send {
        self(ctx, payload)
    }
}

// Object-safe shims so handlers of different payload types can live in one
// registry. The public traits use RPIT futures and cannot be boxed
// directly.
pub(crate) trait ErasedMessageHandler<P>: Send + Sync {
    fn call<'a>(
        &'a self,
        ctx: &'a NotificationContext,
        info: &'a MessageInfo,
        payload: P,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;
}

impl<P, H> ErasedMessageHandler<P> for H
where
    H: MessageHandler<P>,
    P: Send + 'static,
{
    fn call<'a>(
        &'a self,
        ctx: &'a NotificationContext,
        info: &'a MessageInfo,
        payload: P,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(self.handle(ctx, info, payload))
    }
}

pub(crate) trait ErasedChangeHandler<P>: Send + Sync {
    fn call<'a>(
        &'a self,
        ctx: &'a NotificationContext,
        payload: P,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;
}

impl<P, H> ErasedChangeHandler<P> for H
where
    H: ChangeHandler<P>,
    P: Send + 'static,
{
    fn call<'a>(
        &'a self,
        ctx: &'a NotificationContext,
        payload: P,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(self.handle(ctx, payload))
    }
}

pub(crate) type BoxedMessageHandler<P> = Box<dyn ErasedMessageHandler<P>>;
pub(crate) type BoxedChangeHandler<P> = Box<dyn ErasedChangeHandler<P>>;

macro_rules! registry {
    ($(
        $(#[$doc:meta])*
        $slot:ident: $payload:ty,
    )*) => {
        paste::paste! {
            /// One optional handler slot per classified message variant,
            /// plus the status-update and envelope-error slots.
            ///
            /// Construct with [`Registry::builder`]. An empty registry is
            /// valid: dispatch then skips everything and reports
            /// [`Outcome::Success`](crate::dispatch::Outcome::Success).
            #[derive(Default)]
            pub struct Registry {
                $( pub(crate) $slot: Option<BoxedMessageHandler<$payload>>, )*
                pub(crate) status: Option<BoxedChangeHandler<StatusRecord>>,
                pub(crate) envelope_error: Option<BoxedChangeHandler<PlatformError>>,
            }

            impl Registry {
                /// Returns a builder for registering handlers.
                pub fn builder() -> RegistryBuilder {
                    RegistryBuilder::default()
                }
            }

            impl fmt::Debug for Registry {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let mut set = f.debug_set();
                    $(
                        if self.$slot.is_some() {
                            set.entry(&stringify!($slot));
                        }
                    )*
                    if self.status.is_some() {
                        set.entry(&"status");
                    }
                    if self.envelope_error.is_some() {
                        set.entry(&"envelope_error");
                    }
                    set.finish()
                }
            }

            /// Builder for a [`Registry`].
            #[derive(Default)]
            #[must_use]
            pub struct RegistryBuilder {
                inner: Registry,
            }

            impl RegistryBuilder {
                $(
                    $(#[$doc])*
                    pub fn [<on_ $slot>]<H>(mut self, handler: H) -> Self
                    where
                        H: MessageHandler<$payload> + 'static,
                    {
                        self.inner.$slot = Some(Box::new(handler));
                        self
                    }
                )*

                /// Registers the handler for message status updates
                /// (sent/delivered/read/failed…).
                pub fn on_status<H>(mut self, handler: H) -> Self
                where
                    H: ChangeHandler<StatusRecord> + 'static,
                {
                    self.inner.status = Some(Box::new(handler));
                    self
                }

                /// Registers the handler for envelope-level delivery errors.
                pub fn on_envelope_error<H>(mut self, handler: H) -> Self
                where
                    H: ChangeHandler<PlatformError> + 'static,
                {
                    self.inner.envelope_error = Some(Box::new(handler));
                    self
                }

                /// Finishes the builder.
                pub fn build(self) -> Registry {
                    self.inner
                }
            }
        }
    };
}

registry! {
    /// Registers the handler for plain text messages.
    text: Text,
    /// Registers the handler for media messages (image, audio, video,
    /// document, sticker). The payload carries the [`MediaKind`] so one
    /// handler can branch on it.
    ///
    /// [`MediaKind`]: crate::message::MediaKind
    media: MediaMessage,
    /// Registers the handler for shared locations.
    location: Location,
    /// Registers the handler for shared contact cards.
    contacts: Vec<ContactCard>,
    /// Registers the handler for emoji reactions.
    reaction: Reaction,
    /// Registers the handler for catalog orders.
    order: Order,
    /// Registers the handler for template quick-reply button presses.
    button: Button,
    /// Registers the handler for system events (e.g. number changes).
    system: SystemEvent,
    /// Registers the handler for customer identity changes.
    identity_change: CustomerIdentity,
    /// Registers the handler for interactive list selections.
    list_reply: ListReply,
    /// Registers the handler for interactive reply-button presses.
    button_reply: ButtonReply,
    /// Registers the handler for completed WhatsApp Flow submissions.
    flow_reply: FlowReply,
    /// Registers the handler for interactive payloads whose discriminator
    /// matched none of the known reply kinds.
    interactive: InteractiveRecord,
    /// Registers the handler for ad click-through messages (text plus
    /// referral metadata).
    referral: ReferralMessage,
    /// Registers the handler for catalog product enquiries.
    product_enquiry: ProductEnquiry,
    /// Registers the handler for messages the platform itself could not
    /// process (`type: unknown`), payload being their attached error list.
    unknown: Vec<PlatformError>,
}
