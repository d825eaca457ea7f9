use super::*;
use crate::llm::CompletionError;
use crate::store::CustomerFields;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use std::sync::Mutex;
use tempfile::TempDir;
use tower::ServiceExt;

struct FakeCompletion {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, _api_key: &str, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(CompletionError::Provider)
    }
}

struct TestApp {
    _dir: TempDir,
    store: Store,
    completions: Arc<FakeCompletion>,
    router: Router,
}

impl TestApp {
    async fn new(completions: Arc<FakeCompletion>) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        let router = router(AppState {
            store: store.clone(),
            completions: completions.clone(),
        });
        Self {
            _dir: dir,
            store,
            completions,
            router,
        }
    }

    async fn ready(completions: Arc<FakeCompletion>) -> Self {
        let app = Self::new(completions).await;
        app.store.set_api_key("test-key").await.unwrap();
        app
    }

    async fn customer(&self, name: &str, account: &str) -> i64 {
        let fields = CustomerFields {
            name: name.to_string(),
            account: account.to_string(),
            email: None,
            phone: None,
        };
        self.store.create_customer(fields).await.unwrap().unwrap().id
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, String) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_form(&self, uri: &str, form: &str) -> (StatusCode, HeaderMap, String) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let (status, _, text) = self
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        (status, serde_json::from_str(&text).unwrap())
    }
}

fn location(headers: &HeaderMap) -> &str {
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn setup_page_is_shown_until_key_is_stored() {
    let app = TestApp::new(FakeCompletion::replying("hi")).await;

    let (status, _, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Enter Your Groq API Key"));

    let (status, _, body) = app.post_form("/", "api_key=").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Enter Your Groq API Key"));
    assert_eq!(app.store.api_key().await.unwrap(), None);

    let (status, headers, _) = app.post_form("/", "api_key=gsk_123").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");
    assert_eq!(app.store.api_key().await.unwrap().as_deref(), Some("gsk_123"));

    let (_, _, body) = app.get("/").await;
    assert!(body.contains("Advanced Customer Relationship Manager"));
}

#[tokio::test]
async fn routes_redirect_to_setup_without_key() {
    let app = TestApp::new(FakeCompletion::replying("hi")).await;

    for uri in ["/export", "/edit/1", "/interactions/1", "/insight/1"] {
        let (status, headers, _) = app.get(uri).await;
        assert_eq!(status, StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&headers), "/");
    }

    let (status, body) = app
        .post_json("/chat", serde_json::json!({ "message": "hello" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "API key not configured");
    assert!(app.completions.calls().is_empty());
}

#[tokio::test]
async fn add_requires_name_and_account() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;

    let (status, headers, _) = app.post_form("/add", "name=Ada&account=").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");
    assert!(app.store.all_customers().await.unwrap().is_empty());

    app.post_form("/add", "name=Ada&account=Acme&email=ada%40acme.test&phone=")
        .await;
    let customers = app.store.all_customers().await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].email.as_deref(), Some("ada@acme.test"));
    assert_eq!(customers[0].phone, None);
}

#[tokio::test]
async fn home_filters_by_search_and_escapes() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    app.customer("Ada <Lovelace>", "Acme").await;
    app.customer("Bob", "Beta").await;

    let (_, _, body) = app.get("/?search=acme").await;
    assert!(body.contains("Ada &lt;Lovelace&gt;"));
    assert!(!body.contains("<td>Bob</td>"));

    let (_, _, body) = app.get("/?search=nobody").await;
    assert!(body.contains("No customers found. Add one above!"));
}

#[tokio::test]
async fn unknown_customer_is_not_found_without_writes() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;

    let (status, _, body) = app.get("/edit/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Customer not found");

    let (status, _, _) = app.post_form("/interactions/42", "note=hello").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.store.recent_interactions(10).await.unwrap().is_empty());

    let (status, _, _) = app.get("/insight/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.completions.calls().is_empty());
}

#[tokio::test]
async fn edit_updates_or_rerenders_form() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    let id = app.customer("Ada", "Acme").await;

    let (status, _, body) = app
        .post_form(&format!("/edit/{}", id), "name=&account=Other")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Edit Customer"));
    assert_eq!(app.store.get_customer(id).await.unwrap().unwrap().account, "Acme");

    let (status, headers, _) = app
        .post_form(&format!("/edit/{}", id), "name=Ada+L&account=Acme+Ltd&phone=555")
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");
    let updated = app.store.get_customer(id).await.unwrap().unwrap();
    assert_eq!(updated.name, "Ada L");
    assert_eq!(updated.account, "Acme Ltd");
    assert_eq!(updated.phone.as_deref(), Some("555"));
}

#[tokio::test]
async fn interactions_add_and_delete() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    let id = app.customer("Ada", "Acme").await;
    let uri = format!("/interactions/{}", id);

    let (status, _, body) = app.post_form(&uri, "note=Called+about+renewal").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Called about renewal"));

    app.post_form(&uri, "note=").await;
    let notes = app.store.list_interactions(id).await.unwrap();
    assert_eq!(notes.len(), 1);

    let (status, headers, _) = app
        .get(&format!("/delete_interaction/{}/{}", notes[0].id, id))
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), uri);
    assert!(app.store.list_interactions(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_customer_removes_interactions() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    let id = app.customer("Ada", "Acme").await;
    app.store.create_interaction(id, "note").await.unwrap();

    let (status, headers, _) = app.get(&format!("/delete/{}", id)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");
    assert!(app.store.get_customer(id).await.unwrap().is_none());
    assert!(app.store.recent_interactions(10).await.unwrap().is_empty());

    let (status, _, _) = app.get("/delete/999").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn export_is_a_csv_attachment() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;

    let (status, headers, body) = app.get("/export").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=customers.csv"
    );
    assert_eq!(body, "ID,Name,Account,Email,Phone,Created At,Updated At\r\n");

    app.customer("Ada", "Acme").await;
    let (_, _, body) = app.get("/export").await;
    assert_eq!(body.lines().count(), 2);
    assert!(body.lines().nth(1).unwrap().starts_with("1,Ada,Acme,,,"));
}

#[tokio::test]
async fn chat_replies_and_records_history() {
    let app = TestApp::ready(FakeCompletion::replying("**Ada** is active")).await;
    app.customer("Ada", "Acme").await;

    let (status, body) = app
        .post_json("/chat", serde_json::json!({ "message": "Who is active?" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "<strong>Ada</strong> is active");

    let prompts = app.completions.calls();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Who is active?"));
    assert!(prompts[0].contains("Ada"));

    let history = app.store.recent_chat(5).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ai_response, "<strong>Ada</strong> is active");
}

#[tokio::test]
async fn chat_rejects_empty_message() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;

    for body in [serde_json::json!({}), serde_json::json!({ "message": "" })] {
        let (status, reply) = app.post_json("/chat", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["error"], "No message provided");
    }
    assert!(app.completions.calls().is_empty());
    assert!(app.store.recent_chat(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_failure_is_reported_and_not_recorded() {
    let app = TestApp::ready(FakeCompletion::failing("rate limited")).await;

    let (status, reply) = app
        .post_json("/chat", serde_json::json!({ "message": "hello" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply["error"], "rate limited");
    assert!(app.store.recent_chat(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn home_shows_latest_five_chat_messages() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    for i in 0..7 {
        app.store
            .append_chat(&format!("question-{}", i), "answer")
            .await
            .unwrap();
    }

    let (_, _, body) = app.get("/").await;
    assert!(!body.contains("question-0<"));
    assert!(!body.contains("question-1<"));
    let newest = body.find("question-6<").unwrap();
    let oldest_shown = body.find("question-2<").unwrap();
    assert!(newest < oldest_shown);
}

#[tokio::test]
async fn insight_renders_reply_or_error_inline() {
    let app = TestApp::ready(FakeCompletion::replying("## Summary\n- renew")).await;
    let id = app.customer("Ada", "Acme").await;
    app.store.create_interaction(id, "Asked for pricing").await.unwrap();

    let (status, _, body) = app.get(&format!("/insight/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h2>Summary</h2>"));
    assert!(body.contains("<ul><li>renew</li></ul>"));
    assert!(app.completions.calls()[0].contains("Asked for pricing"));

    let failing = TestApp::ready(FakeCompletion::failing("upstream down")).await;
    let id = failing.customer("Bob", "Beta").await;
    let (status, _, body) = failing.get(&format!("/insight/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Error: upstream down"));
}

#[tokio::test]
async fn insight_note_is_saved_with_prefix() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    let id = app.customer("Ada", "Acme").await;
    let uri = format!("/add_insight_note/{}", id);

    let (status, headers, _) = app.post_form(&uri, "insight=Offer+a+discount").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), format!("/insight/{}", id));

    app.post_form(&uri, "insight=").await;
    let notes = app.store.list_interactions(id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note, "AI Insight: Offer a discount");

    let (status, _, _) = app.post_form("/add_insight_note/999", "insight=x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_insight_answers_question() {
    let app = TestApp::ready(FakeCompletion::replying("*Yes*")).await;
    let id = app.customer("Ada", "Acme").await;
    let uri = format!("/custom_insight/{}", id);

    let (status, headers, _) = app.post_form(&uri, "custom_prompt=").await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), format!("/insight/{}", id));
    assert!(app.completions.calls().is_empty());

    let (status, _, body) = app.post_form(&uri, "custom_prompt=Will+they+renew%3F").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Query: Will they renew?"));
    assert!(body.contains("<em>Yes</em>"));
    assert!(app.completions.calls()[0].contains("Will they renew?"));
}

#[tokio::test]
async fn chat_malformed_body_gets_json_error() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;

    for (content_type, body) in [
        ("application/json", "{not json"),
        ("text/plain", "hello"),
        ("application/json", r#"{"message": 42}"#),
    ] {
        let (status, headers, text) = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, content_type)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        let reply: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reply["error"], "No message provided");
    }
    assert!(app.completions.calls().is_empty());
}

#[tokio::test]
async fn non_numeric_ids_are_not_found() {
    let app = TestApp::ready(FakeCompletion::replying("hi")).await;
    app.customer("Ada", "Acme").await;

    for uri in ["/edit/abc", "/interactions/1x", "/insight/-", "/delete/abc", "/delete_interaction/a/1"] {
        let (status, _, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, "Customer not found");
    }

    let (status, _, _) = app.post_form("/add_insight_note/abc", "insight=x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.all_customers().await.unwrap().len(), 1);
    assert!(app.completions.calls().is_empty());
}
