use super::error::WebError;
use super::{ApiKey, AppState, IdPath, SetupState, export, views};
use crate::llm::prompts;
use crate::markdown;
use crate::store::{Customer, CustomerFields};
use crate::utils::{escape_html, non_empty};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Form, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Chat messages shown under the widget on the home page.
const CHAT_HISTORY_SHOWN: usize = 5;

const INSIGHT_NOTE_PREFIX: &str = "AI Insight: ";

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyForm {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<CustomerForm> for CustomerFields {
    fn from(form: CustomerForm) -> Self {
        Self {
            name: form.name.unwrap_or_default(),
            account: form.account.unwrap_or_default(),
            email: non_empty(form.email),
            phone: non_empty(form.phone),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsightNoteForm {
    #[serde(default)]
    pub insight: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomQueryForm {
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

async fn find_customer(state: &AppState, id: i64) -> Result<Customer, WebError> {
    state
        .store
        .get_customer(id)
        .await?
        .ok_or(WebError::CustomerNotFound)
}

/// GET /
pub async fn home(
    State(state): State<AppState>,
    Extension(setup): Extension<SetupState>,
    Query(query): Query<HomeQuery>,
) -> Result<Html<String>, WebError> {
    if let SetupState::Pending = setup {
        return Ok(Html(views::setup_page()));
    }

    let search = query.search.unwrap_or_default();
    let customers = state.store.list_customers(Some(&search)).await?;
    let chat = state.store.recent_chat(CHAT_HISTORY_SHOWN).await?;
    Ok(Html(views::home_page(&customers, &search, &chat)))
}

/// POST /
///
/// Stores the API key while the app is still in setup. Once a key exists the
/// form is no longer shown and a stray POST just lands on the home page.
pub async fn submit_api_key(
    State(state): State<AppState>,
    Extension(setup): Extension<SetupState>,
    Form(form): Form<ApiKeyForm>,
) -> Result<Response, WebError> {
    if let SetupState::Ready(_) = setup {
        return Ok(Redirect::to("/").into_response());
    }

    match non_empty(form.api_key) {
        Some(key) => {
            state.store.set_api_key(&key).await?;
            Ok(Redirect::to("/").into_response())
        }
        None => Ok(Html(views::setup_page()).into_response()),
    }
}

/// POST /add
pub async fn add_customer(
    State(state): State<AppState>,
    Form(form): Form<CustomerForm>,
) -> Result<Redirect, WebError> {
    state.store.create_customer(form.into()).await?;
    Ok(Redirect::to("/"))
}

/// GET /delete/:id
pub async fn delete_customer(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<Redirect, WebError> {
    state.store.delete_customer(id).await?;
    Ok(Redirect::to("/"))
}

/// GET /edit/:id
pub async fn edit_form(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<Html<String>, WebError> {
    let customer = find_customer(&state, id).await?;
    Ok(Html(views::edit_page(&customer)))
}

/// POST /edit/:id
pub async fn edit_customer(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    Form(form): Form<CustomerForm>,
) -> Result<Response, WebError> {
    let customer = find_customer(&state, id).await?;

    match state.store.update_customer(id, form.into()).await? {
        Some(_) => Ok(Redirect::to("/").into_response()),
        None => Ok(Html(views::edit_page(&customer)).into_response()),
    }
}

/// GET /interactions/:id
pub async fn interactions(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
) -> Result<Html<String>, WebError> {
    let customer = find_customer(&state, id).await?;
    let notes = state.store.list_interactions(id).await?;
    Ok(Html(views::interactions_page(&customer, &notes)))
}

/// POST /interactions/:id
pub async fn add_interaction(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    Form(form): Form<NoteForm>,
) -> Result<Html<String>, WebError> {
    let customer = find_customer(&state, id).await?;
    if let Some(note) = non_empty(form.note) {
        state.store.create_interaction(id, &note).await?;
    }
    let notes = state.store.list_interactions(id).await?;
    Ok(Html(views::interactions_page(&customer, &notes)))
}

/// GET /delete_interaction/:iid/:cid
pub async fn delete_interaction(
    State(state): State<AppState>,
    IdPath((interaction_id, customer_id)): IdPath<(i64, i64)>,
) -> Result<Redirect, WebError> {
    state.store.delete_interaction(interaction_id).await?;
    Ok(Redirect::to(&format!("/interactions/{}", customer_id)))
}

/// Runs one completion and renders it. Failures are shown inline in place of
/// the answer; the raw text is empty in that case.
async fn render_completion(state: &AppState, api_key: &ApiKey, prompt: &str) -> (String, String) {
    match state.completions.complete(api_key.as_str(), prompt).await {
        Ok(text) => (markdown::render(&text), text),
        Err(e) => {
            warn!("Completion failed: {}", e);
            (format!("Error: {}", escape_html(&e.to_string())), String::new())
        }
    }
}

/// GET /insight/:id
pub async fn insight(
    State(state): State<AppState>,
    api_key: ApiKey,
    IdPath(id): IdPath<i64>,
) -> Result<Html<String>, WebError> {
    let customer = find_customer(&state, id).await?;
    let notes = state.store.list_interactions(id).await?;

    let prompt = prompts::insight_prompt(&customer, &notes);
    let (insight_html, raw) = render_completion(&state, &api_key, &prompt).await;
    Ok(Html(views::insight_page(&customer, &insight_html, &raw)))
}

/// POST /add_insight_note/:id
pub async fn add_insight_note(
    State(state): State<AppState>,
    IdPath(id): IdPath<i64>,
    Form(form): Form<InsightNoteForm>,
) -> Result<Redirect, WebError> {
    find_customer(&state, id).await?;
    if let Some(text) = non_empty(form.insight) {
        let note = format!("{}{}", INSIGHT_NOTE_PREFIX, text);
        state.store.create_interaction(id, &note).await?;
        info!("Saved insight as note for customer {}", id);
    }
    Ok(Redirect::to(&format!("/insight/{}", id)))
}

/// POST /custom_insight/:id
pub async fn custom_insight(
    State(state): State<AppState>,
    api_key: ApiKey,
    IdPath(id): IdPath<i64>,
    Form(form): Form<CustomQueryForm>,
) -> Result<Response, WebError> {
    let Some(question) = non_empty(form.custom_prompt) else {
        return Ok(Redirect::to(&format!("/insight/{}", id)).into_response());
    };

    let customer = find_customer(&state, id).await?;
    let notes = state.store.list_interactions(id).await?;

    let prompt = prompts::custom_prompt(&customer, &notes, &question);
    let (response_html, _) = render_completion(&state, &api_key, &prompt).await;
    Ok(Html(views::custom_insight_page(&customer, &question, &response_html)).into_response())
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    api_key: ApiKey,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, WebError> {
    let message = match request {
        Ok(Json(request)) => non_empty(request.message),
        Err(rejection) => {
            warn!("Rejected chat body: {}", rejection);
            None
        }
    };
    let Some(message) = message else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No message provided" })),
        )
            .into_response());
    };

    let customers = state.store.all_customers().await?;
    let recent = state
        .store
        .recent_interactions(prompts::CHAT_INTERACTION_CONTEXT)
        .await?;
    let prompt = prompts::chat_prompt(&message, &customers, &recent);

    match state.completions.complete(api_key.as_str(), &prompt).await {
        Ok(text) => {
            let response_html = markdown::render(&text);
            state.store.append_chat(&message, &response_html).await?;
            Ok(Json(json!({ "response": response_html })).into_response())
        }
        Err(e) => {
            warn!("Chat completion failed: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response())
        }
    }
}

/// GET /export
pub async fn export_csv(State(state): State<AppState>) -> Result<Response, WebError> {
    let customers = state.store.all_customers().await?;
    let csv = export::customers_csv(&customers)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", export::EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}
