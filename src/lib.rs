#![deny(clippy::future_not_send)]

//! # whatsapp_webhooks_rs
//!
//! Typed webhook dispatch for the Meta WhatsApp Business Cloud API.
//! This crate decodes inbound webhook notification payloads, classifies every
//! embedded message by its (sometimes misleading) type tag, and routes each
//! one to exactly one application-supplied async handler — with a defined
//! policy for partial failure and hard aborts.
//!
//! ## ✨ Features
//!
//! - **Total envelope decoding**: the Notification → Entry → Change graph
//!   decodes leniently — absent lists and objects become empty values, and
//!   only invalid JSON or an oversized body (> 3 MiB) is an error.
//! - **Faithful classification**: `text` messages are re-inspected for ad
//!   referrals and product enquiries, `interactive` payloads sub-dispatch on
//!   their inner discriminator, and tagless payloads are identified by field
//!   presence.
//! - **Per-variant handler registry**: register only the handlers you care
//!   about; unhandled variants are skipped silently. No globals — build as
//!   many independent registries as you have tenants.
//! - **Recoverable vs fatal errors**: a handler failure either gets recorded
//!   while the batch continues, or aborts the whole dispatch call
//!   immediately.
//! - **HTTP surface included**: a managed [`server::Server`] (axum) and a
//!   bring-your-own-server [`webhook_service::WebhookService`], both with
//!   the `hub.verify_token` handshake and `X-Hub-Signature-256` payload
//!   verification.
//!
//! ## 🚀 Example
//!
//! ```rust,no_run
//! use whatsapp_webhooks_rs::{
//!     dispatch::Dispatcher,
//!     error::HandlerError,
//!     handler::{MessageHandler, NotificationContext, Registry},
//!     message::MessageInfo,
//!     notification::Text,
//!     server::Server,
//! };
//!
//! struct Logger;
//!
//! impl MessageHandler<Text> for Logger {
//!     async fn handle(
//!         &self,
//!         _ctx: &NotificationContext,
//!         info: &MessageInfo,
//!         text: Text,
//!     ) -> Result<(), HandlerError> {
//!         println!("{} says: {}", info.sender(), text.body);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Registry::builder().on_text(Logger).build();
//!
//!     Server::builder()
//!         .endpoint("0.0.0.0:8080".parse().unwrap())
//!         .route("/webhook")
//!         .verify_token("MY_VERIFY_TOKEN")
//!         .verify_payload("MY_APP_SECRET")
//!         .build()
//!         .serve(Dispatcher::new(registry))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Driving dispatch yourself
//!
//! The HTTP layer is optional; `decode` + `Dispatcher::dispatch` is the whole
//! engine:
//!
//! ```rust
//! use whatsapp_webhooks_rs::{
//!     dispatch::{Dispatcher, Outcome},
//!     handler::Registry,
//!     notification::decode,
//!     response::ResponsePolicy,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = Dispatcher::new(Registry::builder().build());
//!
//! let body = br#"{"object": "whatsapp_business_account", "entry": []}"#;
//! let notification = decode(body).unwrap();
//!
//! let outcome = dispatcher.dispatch(notification).await;
//! assert!(matches!(outcome, Outcome::Success));
//!
//! let policy = ResponsePolicy::new();
//! assert_eq!(policy.status(&outcome).as_u16(), 200);
//! # }
//! ```
//!
//! Dispatch runs on the caller's task and spawns nothing; to bound its
//! latency, wrap the call in `tokio::time::timeout` — dropping the future
//! between handler await points is the cancellation mechanism.

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod message;
pub mod notification;
pub mod response;
pub mod server;
pub mod webhook_service;

/// Represents a timestamp reported by the Cloud API.
///
/// The platform sends UNIX timestamps (seconds since epoch), sometimes as a
/// JSON number and sometimes as a quoted string; both forms decode.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
pub struct Timestamp {
    inner: i64,
}

impl Timestamp {
    /// Wraps a raw seconds-since-epoch value.
    pub fn from_seconds(seconds: i64) -> Self {
        Self { inner: seconds }
    }

    /// Returns the raw timestamp in seconds since epoch.
    pub fn seconds(&self) -> i64 {
        self.inner
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let inner = crate::notification::number_or_string::<i64, D>(deserializer)?;
        Ok(Self { inner })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// An error object reported **by the WhatsApp platform inside a webhook
/// payload**.
///
/// This is distinct from the crate's own error types: a `PlatformError`
/// describes something that went wrong on Meta's side — an undeliverable
/// message, an unsupported inbound message type — and is delivered to the
/// envelope-error handler (or attached to `unknown` messages and failed
/// statuses) rather than raised by this crate.
///
/// # Example (from a webhook payload)
/// ```json
/// {
///   "code": 131051,
///   "title": "Unsupported message type",
///   "details": "Message type is not currently supported"
/// }
/// ```
#[derive(thiserror::Error, Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct PlatformError {
    /// Numerical error code assigned by Meta.
    #[serde(default)]
    pub code: i64,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Free-form detail text. Older payload versions carry this at the top
    /// level; newer ones nest it under `error_data`.
    #[serde(default)]
    pub details: Option<String>,

    #[serde(default)]
    pub error_data: Option<PlatformErrorData>,

    /// Link to Meta's documentation for the error.
    #[serde(rename = "href", default)]
    pub support: Option<String>,
}

impl PlatformError {
    /// The detail text, wherever the payload version put it.
    pub fn detail_text(&self) -> Option<&str> {
        self.details
            .as_deref()
            .or_else(|| self.error_data.as_ref().map(|d| d.details.as_str()))
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(code: {})", self.code)?;

        if let Some(title) = &self.title {
            write!(f, " - {title}")?;
        }

        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        if let Some(details) = self.detail_text() {
            write!(f, " ({details})")?;
        }

        if let Some(support) = &self.support {
            write!(f, " [more info: {support}]")?;
        }

        Ok(())
    }
}

/// The `error_data` block of a [`PlatformError`].
#[derive(Deserialize, PartialEq, Eq, Clone, Debug, Default)]
#[non_exhaustive]
pub struct PlatformErrorData {
    #[serde(default)]
    pub details: String,
}

pub use dispatch::{Dispatcher, Outcome};
pub use error::{DecodeError, HandlerError};
pub use handler::{NotificationContext, Registry};
pub use message::{classify, Content, MessageInfo, MessageType};
pub use notification::{decode, Notification};
pub use response::ResponsePolicy;
pub use server::Server;

use serde::Deserialize;
use std::fmt;
