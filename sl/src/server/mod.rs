//! HTTP transport for inbound SMS webhooks
//!
//! The SMS provider posts each message as a form with `From` and `Body`
//! fields and expects a TwiML document back.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use eyre::{Context, Result};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::conversation::{InboundMessage, Orchestrator};

pub mod twiml;

/// Path the SMS provider posts to
pub const MESSAGE_PATH: &str = "/message";

/// Body of the liveness response
pub const LIVENESS_REPLY: &str = "Saving the world.";

/// Form fields posted by the SMS provider; anything else is ignored
#[derive(Debug, Default, Deserialize)]
pub struct InboundSms {
    #[serde(rename = "From")]
    pub from: Option<String>,

    #[serde(rename = "Body")]
    pub body: Option<String>,
}

impl From<InboundSms> for InboundMessage {
    fn from(sms: InboundSms) -> Self {
        InboundMessage {
            from: sms.from,
            body: sms.body,
        }
    }
}

/// Build the router with the orchestrator as shared state
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route(MESSAGE_PATH, get(liveness).post(receive_message))
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}

async fn liveness() -> Response {
    ([(header::CONTENT_TYPE, "text/html")], LIVENESS_REPLY).into_response()
}

async fn receive_message(State(orchestrator): State<Arc<Orchestrator>>, Form(sms): Form<InboundSms>) -> Response {
    debug!(from = ?sms.from, "receive_message: called");
    match orchestrator.handle(sms.into()).await {
        Ok(outcome) => ([(header::CONTENT_TYPE, "application/xml")], twiml::render(&outcome)).into_response(),
        Err(e) if e.is_invalid_input() => {
            warn!(error = %e, "Rejected inbound message");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Serve on an already-bound listener until `shutdown` resolves
pub async fn serve_on<F>(listener: TcpListener, orchestrator: Arc<Orchestrator>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Failed to read listener address")?;
    info!(%addr, "Listening for inbound messages");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Bind and serve until Ctrl-C
pub async fn serve(bind: &str, orchestrator: Arc<Orchestrator>) -> Result<()> {
    debug!(%bind, "serve: called");
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    serve_on(listener, orchestrator, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
