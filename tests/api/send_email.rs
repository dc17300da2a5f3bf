//! tests/api/send_email.rs

use crate::helpers::{spawn_app, SEND_API_KEY};
use newsletter::authentication::{generate_internal_token, API_KEY_HEADER, TIMESTAMP_HEADER, TOKEN_HEADER};
use secrecy::Secret;
use uuid::Uuid;
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn send_body() -> serde_json::Value {
    serde_json::json!({
        "to": "ursula_le_guin@gmail.com",
        "subject": "Hello",
        "html": "<p>Hello</p>",
    })
}

fn api_key_header() -> Vec<(&'static str, String)> {
    vec![(API_KEY_HEADER, SEND_API_KEY.to_string())]
}

fn internal_token_headers(timestamp_ms: i64) -> Vec<(&'static str, String)> {
    let timestamp = timestamp_ms.to_string();
    let token = generate_internal_token(&timestamp, &Secret::new(SEND_API_KEY.to_string()));
    vec![(TIMESTAMP_HEADER, timestamp), (TOKEN_HEADER, token)]
}

#[tokio::test]
async fn requests_without_credentials_are_rejected() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let response = app.post_send(&send_body(), &[]).await;

    assert_eq!(response.status().as_u16(), 401);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload, serde_json::json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn a_wrong_api_key_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .post_send(&send_body(), &[(API_KEY_HEADER, "re_wrong".to_string())])
        .await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn the_api_key_authorizes_a_send_and_the_attempt_is_logged() {
    let app = spawn_app().await;
    Mock::given(path("/emails"))
        .and(method("POST"))
        .and(header("Authorization", format!("Bearer {}", SEND_API_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "msg_1" })))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_send(&send_body(), &api_key_header()).await;

    assert_eq!(response.status().as_u16(), 200);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        payload,
        serde_json::json!({ "success": true, "data": { "id": "msg_1" } })
    );
    assert_eq!(app.email_log_statuses().await, vec!["sent"]);
}

#[tokio::test]
async fn a_fresh_internal_token_authorizes_a_send() {
    let app = spawn_app().await;
    app.accept_provider_sends("msg_internal").await;

    let now = chrono::Utc::now().timestamp_millis();
    let response = app.post_send(&send_body(), &internal_token_headers(now)).await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn a_stale_internal_token_is_rejected() {
    let app = spawn_app().await;

    let six_minutes_ago = chrono::Utc::now().timestamp_millis() - 6 * 60 * 1000;
    let response = app
        .post_send(&send_body(), &internal_token_headers(six_minutes_ago))
        .await;

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn missing_fields_return_400() {
    let app = spawn_app().await;
    let test_cases = vec![
        (serde_json::json!({ "subject": "Hi", "html": "<p>Hi</p>" }), "missing to"),
        (serde_json::json!({ "to": "a@example.com", "html": "<p>Hi</p>" }), "missing subject"),
        (serde_json::json!({ "to": "a@example.com", "subject": "Hi" }), "missing html"),
        (serde_json::json!({ "to": "", "subject": "Hi", "html": "<p>Hi</p>" }), "empty to"),
    ];

    for (body, description) in test_cases {
        let response = app.post_send(&body, &api_key_header()).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );
        let payload: serde_json::Value = response.json().await.unwrap();
        assert_eq!(payload["error"], "Missing required fields");
    }
}

#[tokio::test]
async fn a_provider_rejection_is_passed_through_and_logged_as_failed() {
    let app = spawn_app().await;
    Mock::given(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "statusCode": 422,
            "message": "Invalid `to` field."
        })))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_send(&send_body(), &api_key_header()).await;

    assert_eq!(response.status().as_u16(), 422);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["success"], false);
    assert_eq!(payload["error"]["message"], "Invalid `to` field.");
    assert_eq!(app.email_log_statuses().await, vec!["failed"]);
}

#[tokio::test]
async fn the_subscriber_id_is_attached_to_the_log() {
    let app = spawn_app().await;
    app.accept_provider_sends("msg_2").await;
    let subscribed: serde_json::Value = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await
        .json()
        .await
        .unwrap();
    let subscriber_id = subscribed["data"]["id"].as_str().unwrap().to_string();

    let mut body = send_body();
    body["subscriberId"] = subscriber_id.clone().into();
    let response = app.post_send(&body, &api_key_header()).await;
    assert_eq!(response.status().as_u16(), 200);

    let (logged, message_id): (Option<Uuid>, Option<String>) =
        sqlx::query_as("SELECT subscriber_id, message_id FROM email_logs")
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(logged.map(|id| id.to_string()), Some(subscriber_id));
    assert_eq!(message_id.as_deref(), Some("msg_2"));
}

#[tokio::test]
async fn a_provider_timeout_returns_500_and_is_logged_as_failed() {
    let app = spawn_app().await;
    Mock::given(path("/emails"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "msg_late" }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_send(&send_body(), &api_key_header()).await;

    assert_eq!(response.status().as_u16(), 500);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        payload,
        serde_json::json!({ "success": false, "error": "Internal server error" })
    );
    assert_eq!(app.email_log_statuses().await, vec!["failed"]);
}

#[tokio::test]
async fn unreadable_bodies_keep_the_json_failure_shape() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;
    let test_cases = vec![
        ("application/json", r#"{"to": 5, "subject": "Hi", "html": "<p>Hi</p>"}"#, "wrong types"),
        ("application/json", "not json", "not json"),
        ("text/plain", r#"{"to": "a@example.com"}"#, "wrong content type"),
    ];

    for (content_type, body, description) in test_cases {
        let response = app
            .post_raw("/api/send", content_type, body, &api_key_header())
            .await;

        assert_eq!(
            500,
            response.status().as_u16(),
            "The API did not fail with 500 when the body was {}.",
            description
        );
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        let payload: serde_json::Value = response.json().await.unwrap();
        assert_eq!(
            payload,
            serde_json::json!({ "success": false, "error": "Internal server error" })
        );
    }
    assert!(app.email_log_statuses().await.is_empty());
}

#[tokio::test]
async fn credentials_are_checked_before_the_body() {
    let app = spawn_app().await;

    let response = app.post_raw("/api/send", "application/json", "not json", &[]).await;

    assert_eq!(response.status().as_u16(), 401);
}
