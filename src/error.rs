//! Error Handling
//!
//! This module defines the crate's core error types. They fall into three
//! groups: failures to decode an inbound webhook body ([`DecodeError`]),
//! failures signalled by application handlers during dispatch
//! ([`HandlerError`] and the derived [`FatalError`]/[`RecoveredError`]),
//! and the classifier's [`UnsupportedMessageType`].

use std::error::Error as StdError;
use std::fmt;

/// An error produced while decoding a raw webhook body into a
/// [`Notification`].
///
/// Decoding is deliberately total over the payload's *structure*: absent
/// entries, changes, messages or statuses decode to empty values. The only
/// ways decoding can fail are an oversized body (rejected before any parse
/// attempt) and structurally invalid JSON.
///
/// [`Notification`]: crate::notification::Notification
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// The body exceeds the maximum accepted webhook payload size.
    ///
    /// The limit is checked against the raw byte length, so no parsing work
    /// is done for oversized bodies.
    #[error("webhook body of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge {
        /// The size of the rejected body, in bytes.
        size: usize,
        /// The configured limit, in bytes.
        limit: usize,
    },

    /// The body is not valid JSON.
    #[error("webhook body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The error type handlers return to steer the dispatch loop.
///
/// A handler decides whether its failure should stop the whole batch:
///
/// - [`HandlerError::Recoverable`] is recorded and dispatch continues with
///   the next message. All recorded errors are aggregated into the final
///   [`Outcome::PartialFailure`].
/// - [`HandlerError::Fatal`] aborts dispatch immediately; no further
///   changes or messages in the same call are processed.
///
/// Webhook providers disable subscriptions after repeated hard failures, so
/// reserve `Fatal` for conditions where continuing would make things worse
/// (lost database connection, poisoned state) and use `Recoverable` for
/// per-message business failures.
///
/// [`Outcome::PartialFailure`]: crate::dispatch::Outcome::PartialFailure
#[derive(thiserror::Error, Debug)]
pub enum HandlerError {
    /// Record the error and keep processing the batch.
    #[error("recoverable handler error: {0}")]
    Recoverable(#[source] BoxError),

    /// Stop the batch immediately.
    #[error("fatal handler error: {0}")]
    Fatal(#[source] BoxError),
}

impl HandlerError {
    /// Wraps an error as recoverable.
    pub fn recoverable(err: impl Into<BoxError>) -> Self {
        Self::Recoverable(err.into())
    }

    /// Wraps an error as fatal.
    pub fn fatal(err: impl Into<BoxError>) -> Self {
        Self::Fatal(err.into())
    }
}

/// A fatal handler failure that aborted a dispatch call.
///
/// Carried by [`Outcome::Fatal`]. The `message_id` names the message whose
/// handler signalled the abort, when the failure happened while processing
/// a message (status and envelope-error handlers have no message id).
///
/// [`Outcome::Fatal`]: crate::dispatch::Outcome::Fatal
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub struct FatalError {
    pub(crate) message_id: Option<String>,
    pub(crate) source: BoxError,
}

impl FatalError {
    /// The id of the message being processed when dispatch aborted, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// The handler's underlying error.
    pub fn source_err(&self) -> &(dyn StdError + Send + Sync) {
        self.source.as_ref()
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message_id {
            Some(id) => write!(f, "dispatch aborted on message '{id}': {}", self.source),
            None => write!(f, "dispatch aborted: {}", self.source),
        }
    }
}

/// One recoverable failure recorded during dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub struct RecoveredError {
    pub(crate) message_id: Option<String>,
    pub(crate) source: BoxError,
}

impl RecoveredError {
    /// The id of the message whose handling failed, if the failure was
    /// message-scoped.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

impl fmt::Display for RecoveredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message_id {
            Some(id) => write!(f, "handler error for message '{id}': {}", self.source),
            None => write!(f, "handler error: {}", self.source),
        }
    }
}

impl StdError for RecoveredError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

/// The composite of every recoverable error recorded by one dispatch call.
///
/// Each original error keeps its identity (and its `message_id` context) so
/// the embedding application can log them individually.
#[derive(Debug)]
#[non_exhaustive]
pub struct RecoveredErrors {
    pub(crate) errors: Vec<RecoveredError>,
}

impl RecoveredErrors {
    /// The individual recorded errors, in the order they occurred.
    pub fn errors(&self) -> &[RecoveredError] {
        &self.errors
    }

    /// The number of recorded errors. Never zero.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; a `RecoveredErrors` is only built when at least one
    /// error was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for RecoveredErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} handler error(s) recovered during dispatch",
            self.errors.len()
        )?;
        for err in &self.errors {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl StdError for RecoveredErrors {}

/// A message that could not be matched to any classified variant.
///
/// Produced when a message carries a type tag outside the known set and
/// none of its payload fields identify it either. Treated as recoverable
/// by the dispatch engine: it is recorded and the batch continues.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct UnsupportedMessageType {
    /// The wire type tag that failed to classify (possibly empty).
    pub tag: String,
    /// The id of the offending message.
    pub message_id: String,
}

impl fmt::Display for UnsupportedMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            write!(
                f,
                "message '{}' has no type tag and no classifiable payload",
                self.message_id
            )
        } else {
            write!(
                f,
                "unsupported message type '{}' for message '{}'",
                self.tag, self.message_id
            )
        }
    }
}

impl StdError for UnsupportedMessageType {}

/// A convenient type alias for a boxed, trait-object error that can be sent across threads.
///
/// This is typically used to erase the concrete type of an error when it needs to be
/// stored or passed up the call stack generically.
pub type BoxError = Box<dyn StdError + Send + Sync>;
