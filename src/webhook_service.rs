//! For "Bring Your Own Server" (BYOS) integrations.
//!
//! This module provides a low-level [`WebhookService`] that encapsulates
//! webhook request handling — the verification handshake, signature
//! validation, decoding and dispatch — behind a single method over standard
//! `http` types, so it can be mounted in any framework built on them
//! (`axum`, `hyper`, `warp`, …).
//!
//! For a fully managed server, see the [`crate::server`] module.
//!
//! # Key Components
//!
//! - [`WebhookServiceBuilder`]: configures the service with your
//!   `verify_token`, `app_secret` and response policy.
//! - [`WebhookService`]: the handler service. It's `Clone`, `Send`, `Sync`
//!   and `'static`, making it suitable as shared state in any web
//!   framework.
//! - [`WebhookService::handle`]: the single asynchronous method that
//!   processes an incoming `http::Request` and returns an
//!   `http::Response`.
//!
//! # Usage Example (with axum)
//!
//! ```rust,no_run
//! use whatsapp_webhooks_rs::{
//!     dispatch::Dispatcher,
//!     handler::Registry,
//!     webhook_service::WebhookService,
//! };
//! use axum::{extract::Request, routing::any, Router};
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::new(Registry::builder().build());
//!
//!     // 1. Build the service
//!     let service = WebhookService::builder()
//!         .verify_token("my_secret_token")
//!         .verify_payload("my_app_secret")
//!         .build(dispatcher);
//!
//!     // 2. Integrate into your router; GET and POST share the route
//!     let app = Router::new().route(
//!         "/webhook",
//!         any(move |req: Request| {
//!             let service = service.clone();
//!             async move { service.handle(req).await }
//!         }),
//!     );
//!
//!     // 3. Run your server
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Query;
use http::{Request, Response, StatusCode, Uri};

use crate::dispatch::Dispatcher;
use crate::response::ResponsePolicy;
use crate::server::{AppSecret, InnerService, BODY_READ_LIMIT};

// Not stable
pub type Body = axum::body::Body;

/// A builder for creating a [`WebhookService`].
///
/// This builder is for the low-level, "Bring Your Own Server" API.
/// It does **not** configure server details like endpoint or shutdown
/// signals — those belong to whatever server the service is mounted in.
#[derive(Debug, Default)]
#[must_use]
pub struct WebhookServiceBuilder {
    app_secret: Option<AppSecret>,
    verify_token: Option<String>,
    policy: ResponsePolicy,
}

impl WebhookServiceBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to verify incoming payloads using your app
    /// secret.
    ///
    /// See [`crate::server::ServerBuilder::verify_payload`] for details.
    pub fn verify_payload(mut self, app_secret: impl Into<AppSecret>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }

    /// Sets the verification token for the webhook challenge-response
    /// handshake.
    ///
    /// See [`crate::server::ServerBuilder::verify_token`] for details.
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

    /// Builds a [`WebhookService`] routing through the given dispatcher.
    pub fn build(self, dispatcher: Dispatcher) -> WebhookService {
        WebhookService {
            inner: Arc::new(InnerService {
                dispatcher,
                policy: self.policy,
                app_secret: self.app_secret,
                verify_token: self.verify_token,
            }),
        }
    }
}

/// A low-level service to handle webhook requests.
///
/// Created via [`WebhookService::builder`] and designed to be mounted in an
/// existing web server.
#[derive(Clone)]
pub struct WebhookService {
    inner: Arc<InnerService>,
}

impl WebhookService {
    /// Returns a new builder to create a `WebhookService`.
    pub fn builder() -> WebhookServiceBuilder {
        WebhookServiceBuilder::new()
    }

    /// The primary request handler for your BYOS server.
    ///
    /// Handles both GET (verification handshake) and POST (notification
    /// payload) requests; any other method is answered with 405. The body
    /// type only needs to convert into the `http` body this crate uses, so
    /// the method works unchanged with `axum`, `hyper` and other
    /// `http`-compatible frameworks.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Body>
    where
        B: Into<Body>,
    {
        let (parts, body) = req.into_parts();

        match parts.method {
            http::Method::GET => {
                let params = query_params(&parts.uri);
                let (status, text) = self.inner.challenge(&params);
                respond(status, text)
            }
            http::Method::POST => {
                let bytes = match axum::body::to_bytes(body.into(), BODY_READ_LIMIT).await {
                    Ok(bytes) => bytes,
                    // The read cap sits above the decoder's limit, so
                    // hitting it means the body was oversized anyway.
                    Err(_) => {
                        return respond(
                            StatusCode::PAYLOAD_TOO_LARGE,
                            "Request body too large".to_owned(),
                        )
                    }
                };
                let (status, text) = self.inner.process(&parts.headers, &bytes).await;
                respond(status, text.into_owned())
            }
            _ => respond(StatusCode::METHOD_NOT_ALLOWED, String::new()),
        }
    }
}

fn query_params(uri: &Uri) -> HashMap<String, String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .map(|Query(params)| params)
        .unwrap_or_default()
}

fn respond(status: StatusCode, text: String) -> Response<Body> {
    // Infallible for any status + plain body combination we produce.
    Response::builder()
        .status(status)
        .body(Body::from(text))
        .expect("building a plain response cannot fail")
}
