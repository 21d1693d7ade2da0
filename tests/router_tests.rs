// tests/router_tests.rs

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use safety_exam::{
    config::Config,
    create_router,
    models::{category::ExamCategory, question::QuestionRecord},
    notify::Dispatcher,
    state::AppState,
    store::memory::MemoryStore,
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "router_test_secret";

fn router(store: Arc<MemoryStore>) -> Router {
    let config = Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        notify_webhook_url: None,
        exam_page_size: 5,
        training_threshold: 80,
        permit_threshold: 80,
        training_manual_url: None,
        permit_manual_url: None,
    };
    let state = AppState::new(store, Arc::new(Dispatcher::from_webhook(None)), config);
    create_router(state)
}

fn bearer(role: &str) -> String {
    format!("Bearer {}", sign_jwt(1, role, SECRET, 600).unwrap())
}

fn true_false() -> QuestionRecord {
    QuestionRecord {
        id: 0,
        category: "training".to_string(),
        content_th: String::new(),
        content_en: "Hard hats are required on site".to_string(),
        pattern: Some("TRUE_FALSE".to_string()),
        choices: json!([
            {"text_th": "", "text_en": "True", "is_correct": true},
            {"text_th": "", "text_en": "False", "is_correct": false}
        ]),
        correct_index: Some(0),
        image_url: None,
        is_active: true,
        created_at: None,
    }
}

fn send(method: &str, uri: String, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer("user"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn admin_routes_need_a_token() {
    let app = router(Arc::new(MemoryStore::new()));
    let resp = app
        .oneshot(Request::get("/api/admin/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let app = router(Arc::new(MemoryStore::new()));
    let forged = sign_jwt(1, "admin", "someone_elses_secret", 600).unwrap();
    let resp = app
        .oneshot(
            Request::get("/api/admin/users")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_read_thresholds() {
    let store = Arc::new(MemoryStore::new());
    store.put_threshold(ExamCategory::WorkPermit, 90);
    let app = router(store);

    let resp = app
        .oneshot(
            Request::get("/api/admin/thresholds")
                .header(header::AUTHORIZATION, bearer("admin"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp.into_body()).await;
    assert_eq!(body, json!([{"category": "work_permit", "threshold": 90}]));
}

#[tokio::test]
async fn threshold_above_hundred_is_rejected() {
    let app = router(Arc::new(MemoryStore::new()));
    let resp = app
        .oneshot(
            Request::put("/api/admin/thresholds")
                .header(header::AUTHORIZATION, bearer("admin"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"category": "training", "threshold": 101}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = router(Arc::new(MemoryStore::new()));
    let resp = app
        .oneshot(
            Request::get(format!("/api/exam/sessions/{}", uuid::Uuid::new_v4()))
                .header(header::AUTHORIZATION, bearer("user"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = json_body(resp.into_body()).await;
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn verify_unknown_user_is_not_found() {
    let app = router(Arc::new(MemoryStore::new()));
    let resp = app
        .oneshot(
            Request::get("/api/credentials/999/verify")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_edits_return_the_fresh_view() {
    let store = Arc::new(MemoryStore::new());
    for _ in 0..6 {
        store.seed_question(true_false());
    }
    let app = router(store);

    let resp = app
        .clone()
        .oneshot(send("POST", "/api/exam/sessions".to_string(), json!({"category": "training"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let view = json_body(resp.into_body()).await;
    let base = format!("/api/exam/sessions/{}", view["id"].as_str().unwrap());

    let resp = app
        .clone()
        .oneshot(send("POST", format!("{base}/acknowledge"), json!({"accepted": true})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp.into_body()).await["acknowledged"], true);

    let resp = app
        .clone()
        .oneshot(send("POST", format!("{base}/start"), json!({})))
        .await
        .unwrap();
    let view = json_body(resp.into_body()).await;
    assert_eq!(view["stage"], "in_progress");
    let first = view["index"][0]["question_id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(send("PUT", format!("{base}/page"), json!({"page": 1})))
        .await
        .unwrap();
    assert_eq!(json_body(resp.into_body()).await["page"], 1);

    let resp = app
        .clone()
        .oneshot(send(
            "PUT",
            format!("{base}/answers"),
            json!({"question_id": first, "answer": {"type": "choice", "index": 0}}),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(resp.into_body()).await["answered"], 1);

    let resp = app
        .oneshot(send("PUT", format!("{base}/permit"), json!({"permit_number": "HW-1"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp.into_body()).await["permit_number"], "HW-1");
}
