mod common;

use axum::{body::Body, http::{Request, StatusCode}, Router};
use serde_json::{json, Value};

use sapphire_led::config::Settings;

use common::{app, app_with, get, post_json, send, RecordingNotifier};

const CLIENT: &str = "192.0.2.44";

async fn open(app: &Router) -> Value {
    let (status, view) = send(app, post_json("/api/chat/sessions", json!({}), CLIENT)).await;
    assert_eq!(status, StatusCode::OK);
    view
}

async fn say(app: &Router, session_id: &str, text: &str) -> (StatusCode, Value) {
    let uri = format!("/api/chat/sessions/{session_id}/messages");
    send(
        app,
        post_json(
            &uri,
            json!({ "text": text, "pageUrl": "https://sapphire-led.ru/", "pageTitle": "Главная" }),
            CLIENT,
        ),
    )
    .await
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn new_session_starts_at_location() {
    let app = app(RecordingNotifier::configured());
    let view = open(&app).await;

    assert_eq!(view["step"], "location");
    assert_eq!(view["options"], json!(["На улице", "В помещении", "Пока не знаю"]));
    let id = view["sessionId"].as_str().unwrap();
    assert_eq!(view["storageKey"], format!("sapphire-chat-v1:{id}"));
    assert_eq!(view["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn questionnaire_to_submitted_sends_one_lead() {
    let notifier = RecordingNotifier::configured();
    let app = app(notifier.clone());
    let view = open(&app).await;
    let id = view["sessionId"].as_str().unwrap().to_string();

    for (text, next) in [
        ("На улице", "purpose"),
        ("Реклама", "size"),
        ("Указать точный размер", "size_custom"),
        ("6×3 м", "timeline"),
        ("1–3 месяца", "contact"),
    ] {
        let (status, view) = say(&app, &id, text).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["step"], next, "after {text}");
    }

    let (_, view) = say(&app, &id, "sales@sapphire-led.ru").await;
    assert_eq!(view["step"], "submitted");
    assert_eq!(
        view["answers"],
        json!({
            "location": "На улице",
            "purpose": "Реклама",
            "size": "6×3 м",
            "timeline": "1–3 месяца",
            "contact": "sales@sapphire-led.ru"
        })
    );
    assert!(view["submittedAt"].is_string());
    assert_eq!(view["options"], json!(["Начать заново", "Изменить контакты"]));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("<b>📐 Размер:</b> 6×3 м"));
    assert!(messages[0].contains("Главная"));

    let (status, view) = send(&app, post_empty(&format!("/api/chat/sessions/{id}/edit-contact"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "contact");
    assert_eq!(view["answers"]["timeline"], "1–3 месяца");

    let (_, view) = send(&app, post_empty(&format!("/api/chat/sessions/{id}/restart"))).await;
    assert_eq!(view["step"], "location");
    assert_eq!(view["answers"]["location"], Value::Null);
}

#[tokio::test]
async fn faq_question_keeps_current_step() {
    let app = app(RecordingNotifier::configured());
    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();
    say(&app, &id, "В помещении").await;

    let (_, view) = say(&app, &id, "какой шаг пикселя выбрать?").await;

    assert_eq!(view["step"], "purpose");
    let messages = view["messages"].as_array().unwrap();
    assert_eq!(messages.last().unwrap()["text"], "Для чего нужен экран?");
}

#[tokio::test]
async fn failed_delivery_keeps_contact_step() {
    let app = app(std::sync::Arc::new(RecordingNotifier::default()));
    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();
    for text in ["На улице", "Реклама", "До 5 м²", "Позже", "+7 916 000-00-00"] {
        say(&app, &id, text).await;
    }

    let (status, view) = send(&app, get(&format!("/api/chat/sessions/{id}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "contact");
    assert_eq!(view["answers"]["contact"], "+79160000000");
    let last = view["messages"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["role"], "bot");
    assert_eq!(last["text"], "Не удалось отправить, попробуйте ещё раз.");
}

#[tokio::test]
async fn reopening_restores_session() {
    let app = app(RecordingNotifier::configured());
    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();
    say(&app, &id, "Пока не знаю").await;

    let (_, view) = send(&app, post_json("/api/chat/sessions", json!({ "sessionId": id }), CLIENT)).await;

    assert_eq!(view["sessionId"], id.as_str());
    assert_eq!(view["step"], "purpose");
}

#[tokio::test]
async fn edit_contact_before_submission_is_rejected() {
    let app = app(RecordingNotifier::configured());
    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();

    let (status, body) = send(&app, post_empty(&format!("/api/chat/sessions/{id}/edit-contact"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn empty_message_and_unknown_session() {
    let app = app(RecordingNotifier::configured());
    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();

    let (status, body) = say(&app, &id, "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_message");

    let (status, body) = send(&app, get("/api/chat/sessions/00000000-0000-0000-0000-000000000000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
}

#[tokio::test]
async fn malformed_requests_use_error_envelope() {
    let app = app(RecordingNotifier::configured());
    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/chat/sessions/{id}/messages"))
        .header("content-type", "application/json")
        .body(Body::from("{bad"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "ok": false, "error": "invalid_json" }));

    let (status, body) = send(&app, get("/api/chat/sessions/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "ok": false, "error": "invalid_session_id" }));

    let (status, body) = send(&app, post_empty("/api/chat/sessions/42/restart")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_session_id");
}

#[tokio::test]
async fn new_sessions_are_throttled_per_client() {
    let settings = Settings {
        session_rate_limit_max: 2,
        ..Settings::default()
    };
    let app = app_with(settings, RecordingNotifier::configured());

    let id = open(&app).await["sessionId"].as_str().unwrap().to_string();
    open(&app).await;

    let (status, body) = send(&app, post_json("/api/chat/sessions", json!({}), CLIENT)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "too_many_requests");

    // The widget can still restore what it already has.
    let (status, view) = send(&app, post_json("/api/chat/sessions", json!({ "sessionId": id }), CLIENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["sessionId"], id.as_str());

    let (status, _) = send(&app, post_json("/api/chat/sessions", json!({}), "198.51.100.9")).await;
    assert_eq!(status, StatusCode::OK);
}
