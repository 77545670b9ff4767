//! Webhook routes — one activation per carrier leg.
//!
//! The handler is a thin adapter around the pure routing engine: it loads
//! the lists, runs the admission gate, reads the cursor, asks the engine for
//! a decision, attempts one best-effort conditional cursor write, and renders
//! the markup. Every activation produces exactly one response; any fault on
//! the decision path degrades to the apology response rather than leaving
//! the carrier unanswered.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::admission::{self, Admission};
use crate::config::RoutingConfig;
use crate::engine;
use crate::error::Error;
use crate::markup::{self, Intent};
use crate::notify::{VoicemailNotice, VoicemailNotifier};
use crate::numbers;
use crate::signal::CallSignal;
use crate::store::{SessionStore, WriteOutcome};

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RoutingConfig>,
    pub store: Arc<dyn SessionStore>,
    pub notifier: Option<Arc<VoicemailNotifier>>,
}

/// Build the webhook router. Paths come from config so a deployment can
/// mount the carrier callbacks wherever its numbers are provisioned.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&state.config.voice_path, post(handle_voice))
        .route(&state.config.transcript_path, post(handle_transcript))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST `voice_path` — one call leg.
///
/// Takes the extractor result directly: an unparseable body must still be
/// answered with markup, never a bare 400 the carrier cannot speak.
async fn handle_voice(
    State(state): State<AppState>,
    body: Result<Form<CallSignal>, FormRejection>,
) -> Response {
    let signal = match body {
        Ok(Form(signal)) => signal,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unparseable leg body, treating as bare initial leg");
            CallSignal::default()
        }
    };

    match route_one_leg(&state, &signal).await {
        Ok(xml) => xml_response(xml),
        Err(e) => {
            tracing::error!(
                call_sid = signal.call_sid.as_deref().unwrap_or("-"),
                error = %e,
                "Leg failed, answering with apology"
            );
            xml_response(apology())
        }
    }
}

/// The decision path for one leg. Store read failures bubble up to the
/// apology fallback in `handle_voice`; everything else is absorbed here.
async fn route_one_leg(state: &AppState, signal: &CallSignal) -> Result<String, Error> {
    let config = &state.config;
    let forwarding = numbers::load_forwarding_list(&config.forward_list_path);
    let block_list = numbers::load_block_list(config.block_list_path.as_deref());

    let is_initial = signal.is_initial_leg();

    // The gate runs on every leg, before any store access. The spam
    // annotation is only consulted on the initial leg; the blacklist always.
    let annotation = if is_initial { signal.spam_annotation() } else { None };
    let verdict = admission::evaluate(
        signal.from.as_deref(),
        annotation.as_ref(),
        is_initial,
        &block_list,
        config.spam_threshold,
    );
    if let Admission::Reject(reason) = verdict {
        tracing::info!(
            call_sid = signal.call_sid.as_deref().unwrap_or("-"),
            reason = ?reason,
            "Call rejected by admission gate"
        );
        return Ok(markup::render(&[Intent::Reject {
            reason: "rejected".to_string(),
        }]));
    }

    let snapshot = state.store.get_cursor(&config.session_name).await?;
    let routing = engine::route_leg(is_initial, signal.leg_status(), snapshot.cursor, forwarding.len());

    tracing::info!(
        call_sid = signal.call_sid.as_deref().unwrap_or("-"),
        cursor = snapshot.cursor,
        decision = ?routing.decision,
        "Leg routed"
    );

    // Best-effort durability: one conditional write attempt, then answer the
    // carrier regardless of how it went.
    if let Some(next) = routing.cursor_write {
        match state
            .store
            .set_cursor(&config.session_name, next, snapshot.version)
            .await
        {
            Ok(WriteOutcome::Applied) => {}
            Ok(WriteOutcome::Conflict) => {
                tracing::debug!(next, "Cursor write dropped, a concurrent leg advanced first");
            }
            Err(e) => {
                tracing::warn!(next, error = %e, "Cursor write failed, answering anyway");
            }
        }
    }

    Ok(markup::render(&engine::intents_for(
        &routing.decision,
        &forwarding,
        config,
    )))
}

/// Transcription callback fields.
#[derive(Debug, Deserialize)]
struct TranscriptCallback {
    #[serde(rename = "RecordingUrl", default)]
    recording_url: Option<String>,
    #[serde(rename = "TranscriptionText", default)]
    transcription_text: Option<String>,
    #[serde(rename = "From", alias = "Caller", default)]
    from: Option<String>,
}

/// POST `transcript_path` — voicemail recording and transcript are ready.
/// Always answers 200; a failed email is an operator problem, not a carrier
/// problem.
async fn handle_transcript(
    State(state): State<AppState>,
    body: Result<Form<TranscriptCallback>, FormRejection>,
) -> Response {
    let callback = match body {
        Ok(Form(callback)) => callback,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unparseable transcription callback, ignoring");
            return xml_response(markup::render(&[]));
        }
    };

    let Some(recording_url) = callback.recording_url else {
        tracing::warn!("Transcription callback without a recording URL, ignoring");
        return xml_response(markup::render(&[]));
    };

    match &state.notifier {
        Some(notifier) => {
            let notice = VoicemailNotice {
                caller: callback.from,
                recording_url,
                transcription: callback.transcription_text,
            };
            if let Err(e) = notifier.notify(notice).await {
                tracing::error!(error = %e, "Voicemail notification failed");
            }
        }
        None => {
            tracing::info!(recording_url = %recording_url, "Voicemail recorded, notifier not configured");
        }
    }

    xml_response(markup::render(&[]))
}

/// The universal fallback: never leave the carrier without an answer.
fn apology() -> String {
    markup::render(&[
        Intent::Say("We are sorry, something went wrong. Please try your call again later.".to_string()),
        Intent::Hangup,
    ])
}

fn xml_response(xml: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], xml).into_response()
}
