//! WhatsApp webhook server implementation
//!
//! Provides a high-level API for receiving and processing webhook
//! notifications. Handles the verification handshake, signature validation,
//! and hands every decoded notification to a [`Dispatcher`].
//!
//! This module provides a managed [`Server`] that owns the networking and
//! lifecycle for you. For integrating into an existing `http`-based server,
//! see the [`crate::webhook_service`] module.
//!
//! # Key Components
//! - [`ServerBuilder`]: configure endpoint, route, shutdown signal,
//!   security and response policy.
//! - [`Server`]: the configured server, ready to run.
//! - [`Server::serve`]: runs the server against a [`Dispatcher`] until it
//!   is shut down.
//!
//! # Example
//! ```rust,no_run
//! use whatsapp_webhooks_rs::{dispatch::Dispatcher, handler::Registry, server::Server};
//!
//! # async fn example() {
//! let dispatcher = Dispatcher::new(Registry::builder().build());
//!
//! Server::builder()
//!     .endpoint("127.0.0.1:8080".parse().unwrap())
//!     .route("/webhook")
//!     .verify_token("MY_VERIFY_TOKEN")
//!     .verify_payload("MY_APP_SECRET")
//!     .build()
//!     .serve(dispatcher)
//!     .await
//!     .unwrap();
//! # }
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use http::{HeaderMap, StatusCode};
use sha2::Sha256;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::notification::{decode, MAX_BODY_SIZE};
use crate::response::ResponsePolicy;

// Default Server configuration...
const DEFAULT_ENDPOINT: &str = "127.0.0.1:3000";
const DEFAULT_ROUTE_PATH: &str = "/";

// Leave headroom above the decoder's own limit so a slightly-oversized body
// reaches `decode` and gets the PayloadTooLarge answer rather than being
// cut off mid-read by the framework.
pub(crate) const BODY_READ_LIMIT: usize = MAX_BODY_SIZE + 1024;

/// A Meta App secret used to verify webhook payload signatures.
///
/// Wraps the secret so it cannot leak through `Debug` output.
#[derive(Clone)]
pub struct AppSecret(pub(crate) String);

impl<S: Into<String>> From<S> for AppSecret {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

impl fmt::Debug for AppSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppSecret(***)")
    }
}

/// An error starting or running the webhook server.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ServeError {
    /// The configured endpoint could not be bound.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: SocketAddr,
        source: std::io::Error,
    },

    /// The server failed while accepting or serving connections.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// WhatsApp webhook server
///
/// Listens for incoming notifications and routes them through a
/// [`Dispatcher`]. Create using [`Server::builder()`] or [`Server::new()`].
#[derive(Default)]
pub struct Server {
    pub(crate) config: ServerBuilder,
}

impl Server {
    /// Create a new server with default settings
    pub fn new() -> Self {
        ServerBuilder::new().build()
    }

    /// Create a server builder for custom configuration
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Runs the server until the shutdown future (if any) resolves.
    ///
    /// Binds the configured endpoint, then answers:
    /// - `GET` with the `hub.challenge` handshake (requires a configured
    ///   verify token, otherwise 405);
    /// - `POST` by verifying the signature when an app secret is
    ///   configured, decoding the body, dispatching, and translating the
    ///   [`Outcome`](crate::dispatch::Outcome) through the configured
    ///   [`ResponsePolicy`].
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), ServeError> {
        let config = self.config;

        let state = Arc::new(InnerService {
            dispatcher,
            policy: config.policy,
            app_secret: config.app_secret,
            verify_token: config.verify_token,
        });

        let app = Router::new()
            .route(
                &config.route_path,
                post(handle_webhook).get(handle_verification),
            )
            .layer(DefaultBodyLimit::max(BODY_READ_LIMIT))
            .with_state(state);

        let listener = TcpListener::bind(&config.endpoint)
            .await
            .map_err(|source| ServeError::Bind {
                endpoint: config.endpoint,
                source,
            })?;

        info!(
            endpoint = %config.endpoint,
            route = %config.route_path,
            "webhook server listening"
        );

        let serve = axum::serve(listener, app);
        match config.shutdown {
            Some(shutdown) => serve.with_graceful_shutdown(shutdown).await,
            None => serve.await,
        }
        .map_err(ServeError::Io)
    }
}

/// Builder for creating a [`Server`]
///
/// Customize endpoint, route, shutdown signal, security and response
/// policy.
#[must_use]
pub struct ServerBuilder {
    pub(crate) endpoint: SocketAddr,
    pub(crate) route_path: String,
    pub(crate) shutdown: Option<Pin<Box<dyn Future<Output = ()> + Send + 'static>>>,
    pub(crate) app_secret: Option<AppSecret>,
    pub(crate) verify_token: Option<String>,
    pub(crate) policy: ResponsePolicy,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.parse().unwrap(),
            route_path: DEFAULT_ROUTE_PATH.to_owned(),
            shutdown: None,
            app_secret: None,
            verify_token: None,
            policy: ResponsePolicy::default(),
        }
    }
}

impl ServerBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network address and port on which the webhook server will
    /// listen, e.g. `127.0.0.1:8080` for local access or `0.0.0.0:8080`
    /// for all interfaces.
    pub fn endpoint(mut self, endpoint: SocketAddr) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the URL path where notifications are expected. Defaults to `/`.
    pub fn route<P: Into<String>>(mut self, path: P) -> Self {
        self.route_path = path.into();
        self
    }

    /// Sets a custom `Future` that, when resolved, triggers graceful
    /// shutdown.
    ///
    /// # Example
    /// ```rust,no_run
    /// use whatsapp_webhooks_rs::server::ServerBuilder;
    /// use tokio::signal;
    ///
    /// # async fn example() {
    /// let shutdown_signal = async {
    ///     signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    /// };
    ///
    /// let builder = ServerBuilder::new().shutdown(shutdown_signal);
    /// # }
    /// ```
    pub fn shutdown<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shutdown = Some(Box::pin(shutdown));
        self
    }

    /// Configures the server to verify the authenticity of incoming
    /// payloads using your Meta App secret.
    ///
    /// The server computes an HMAC-SHA256 signature over each received body
    /// and compares it (in constant time) against the
    /// `X-Hub-Signature-256` header. Mismatches are rejected with 401
    /// before any decoding or dispatch.
    ///
    /// Strongly recommended in production; without it, anyone who learns
    /// the endpoint URL can inject fabricated notifications.
    pub fn verify_payload(mut self, app_secret: impl Into<AppSecret>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Sets the verification token for the webhook challenge-response
    /// handshake.
    ///
    /// During webhook setup in the Meta developer console you provide a
    /// "Verify Token"; Meta then sends a GET request carrying it as
    /// `hub.verify_token`. When the received token matches, the server
    /// echoes `hub.challenge` back, completing the registration.
    pub fn verify_token(mut self, verify_token: impl Into<String>) -> Self {
        self.verify_token = Some(verify_token.into());
        self
    }

    /// Overrides the [`Outcome`](crate::dispatch::Outcome) → status-code
    /// mapping.
    pub fn response_policy(mut self, policy: ResponsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds and returns a [`Server`] instance from the configured
    /// builder.
    pub fn build(self) -> Server {
        Server { config: self }
    }
}

/// Internal shared state for the webhook logic.
/// Used by both the managed server and the low-level service.
pub(crate) struct InnerService {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) policy: ResponsePolicy,
    pub(crate) app_secret: Option<AppSecret>,
    pub(crate) verify_token: Option<String>,
}

impl InnerService {
    /// Answers the GET challenge-response handshake.
    pub(crate) fn challenge(&self, params: &HashMap<String, String>) -> (StatusCode, String) {
        let Some(expected) = &self.verify_token else {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                "GET method not supported without a verify_token configured.".to_owned(),
            );
        };

        let received = params
            .get("hub.verify_token")
            .map(String::as_str)
            .unwrap_or_default();

        if received == expected {
            (
                StatusCode::OK,
                params.get("hub.challenge").cloned().unwrap_or_default(),
            )
        } else {
            warn!("invalid verification token received: '{received}'");
            (
                StatusCode::FORBIDDEN,
                "Invalid verification token".to_owned(),
            )
        }
    }

    /// Verifies, decodes and dispatches one POSTed body.
    pub(crate) async fn process(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> (StatusCode, Cow<'static, str>) {
        if let Some(app_secret) = &self.app_secret {
            if let Err(reason) = verify_signature(app_secret, headers, body) {
                warn!("signature verification failed: {reason}");
                return (
                    StatusCode::UNAUTHORIZED,
                    "Signature verification failed".into(),
                );
            }
        }

        let notification = match decode(body) {
            Ok(notification) => notification,
            Err(err) => {
                warn!("webhook body rejected: {err}");
                return (self.policy.decode_status(&err), err.to_string().into());
            }
        };

        let outcome = self.dispatcher.dispatch(notification).await;
        (self.policy.status(&outcome), "".into())
    }
}

// Verification handler
async fn handle_verification(
    State(state): State<Arc<InnerService>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.challenge(&params)
}

// Webhook handler
async fn handle_webhook(
    State(state): State<Arc<InnerService>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Cow<'static, str>) {
    state.process(&headers, &body).await
}

// Signature verification
pub(crate) fn verify_signature(
    secret: &AppSecret,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), String> {
    let signature = headers
        .get("x-hub-signature-256")
        .ok_or_else(|| "Missing X-Hub-Signature-256 header".to_owned())?
        .to_str()
        .map_err(|_| "Invalid signature header".to_owned())?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.0.as_bytes())
        .map_err(|_| "Invalid webhook secret".to_owned())?;

    mac.update(body);
    let expected_signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

    // Constant-time comparison to prevent timing attacks
    if subtle::ConstantTimeEq::ct_eq(signature.as_bytes(), expected_signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(format!(
            "Signature mismatch. Received: {signature}. This usually indicates \
             an incorrect webhook secret or a tampered payload."
        ))
    }
}
