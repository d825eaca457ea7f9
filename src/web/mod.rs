mod error;
mod export;
mod handlers;
mod views;

#[cfg(test)]
mod tests;

use crate::llm::CompletionService;
use crate::store::Store;
use async_trait::async_trait;
use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
pub use error::WebError;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub completions: Arc<dyn CompletionService>,
}

/// The stored model API key, handed to handlers that call the model.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether the app has been given an API key yet. Resolved once per request
/// by [`setup_gate`] and attached to the request before any handler runs.
#[derive(Clone)]
pub enum SetupState {
    Pending,
    Ready(ApiKey),
}

/// Loads the API key and blocks everything but the setup page until one
/// exists: `/chat` gets a JSON 403, other routes are sent to `/`.
async fn setup_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let setup = match state.store.api_key().await? {
        Some(key) => SetupState::Ready(ApiKey(key)),
        None => SetupState::Pending,
    };

    if let SetupState::Pending = setup {
        match request.uri().path() {
            "/" => {}
            "/chat" => {
                return Ok((
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": "API key not configured" })),
                )
                    .into_response());
            }
            _ => return Ok(Redirect::to("/").into_response()),
        }
    }

    request.extensions_mut().insert(setup);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<SetupState>() {
            Some(SetupState::Ready(key)) => Ok(key.clone()),
            _ => Err(Redirect::to("/")),
        }
    }
}

/// Integer ids from the path. A segment that does not parse is an unknown
/// record, not a bad request.
pub struct IdPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for IdPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| WebError::CustomerNotFound)?;
        Ok(Self(value))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home).post(handlers::submit_api_key))
        .route("/chat", post(handlers::chat))
        .route("/add", post(handlers::add_customer))
        .route("/delete/:id", get(handlers::delete_customer))
        .route(
            "/edit/:id",
            get(handlers::edit_form).post(handlers::edit_customer),
        )
        .route(
            "/interactions/:id",
            get(handlers::interactions).post(handlers::add_interaction),
        )
        .route(
            "/delete_interaction/:iid/:cid",
            get(handlers::delete_interaction),
        )
        .route("/insight/:id", get(handlers::insight))
        .route("/add_insight_note/:id", post(handlers::add_insight_note))
        .route("/custom_insight/:id", post(handlers::custom_insight))
        .route("/export", get(handlers::export_csv))
        .layer(middleware::from_fn_with_state(state.clone(), setup_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
