//! `/translate` HTTP handler.
//!
//! `POST` translates through the dispatcher, `GET` reports which backends
//! have credentials. Any other method is answered with 405 by the router.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use parley_core::LanguageTag;
use parley_protocol::{ErrorBody, HealthResponse, TranslateRequest, TranslateResponse};
use parley_translate::{Translate, TranslationDispatcher, TranslationError};

/// Path the endpoint is mounted on.
pub const TRANSLATE_PATH: &str = "/translate";

/// Message returned when no backend has a credential.
pub const MISSING_KEYS_MESSAGE: &str = "API keys are not configured. \
     Set GROQ_API_KEY and/or CEREBRAS_API_KEY.";

/// State shared by all requests.
#[derive(Debug, Clone)]
pub struct AppState {
    dispatcher: Arc<TranslationDispatcher>,
}

impl AppState {
    /// Creates state around a dispatcher.
    pub fn new(dispatcher: TranslationDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// The shared dispatcher.
    pub fn dispatcher(&self) -> &TranslationDispatcher {
        &self.dispatcher
    }
}

/// Builds the router serving [`TRANSLATE_PATH`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(TRANSLATE_PATH, post(translate).get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.dispatcher.status()))
}

async fn translate(State(state): State<AppState>, body: Bytes) -> Response {
    let request: TranslateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "rejecting malformed translate request");
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorBody::new(format!("Invalid JSON body: {}", e)),
            );
        }
    };

    if let Some(field) = request.missing_field() {
        debug!(field, "rejecting incomplete translate request");
        return error_response(
            StatusCode::BAD_REQUEST,
            ErrorBody::new("Missing text or targetLang"),
        );
    }

    let target = LanguageTag::new(request.target_lang.trim());
    match state.dispatcher.translate(&request.text, &target).await {
        Ok(translation) => {
            info!(
                provider = translation.provider.as_deref().unwrap_or("none"),
                target = %target,
                "translated request"
            );
            Json(TranslateResponse {
                translated_text: translation.text,
                provider: translation.provider.unwrap_or_default(),
            })
            .into_response()
        }
        Err(e) => {
            warn!(error = %e, code = %e.code(), "translate request failed");
            let (status, body) = failure_body(&e);
            error_response(status, body)
        }
    }
}

fn failure_body(error: &TranslationError) -> (StatusCode, ErrorBody) {
    match error {
        TranslationError::Validation(message) => {
            (StatusCode::BAD_REQUEST, ErrorBody::new(message.clone()))
        }
        TranslationError::Configuration(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new(MISSING_KEYS_MESSAGE),
        ),
        TranslationError::AggregateFailure { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("All translation backends failed").with_details(error.details()),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new(other.to_string()),
        ),
    }
}
