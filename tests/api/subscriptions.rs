//! tests/api/subscriptions.rs

use crate::helpers::spawn_app;
use newsletter::domain::SubscriberStatus;

#[tokio::test]
async fn subscribe_returns_200_for_valid_form_data() {
    let app = spawn_app().await;
    let body = "email=ursula_le_guin%40gmail.com&firstName=Ursula&lastName=Le%20Guin";

    let response = app.post_subscriptions(body.into()).await;

    assert_eq!(200, response.status().as_u16());
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(payload["success"], true);
    assert_eq!(payload["isExistingSubscriber"], false);
    assert_eq!(
        payload["message"],
        "Successfully subscribed! Your eBook is on the way!"
    );
    assert_eq!(payload["data"]["email"], "ursula_le_guin@gmail.com");
}

#[tokio::test]
async fn subscribe_persists_the_new_subscriber() {
    let app = spawn_app().await;
    let body = "email=ursula_le_guin%40gmail.com&first_name=Ursula";

    app.post_subscriptions(body.into()).await;

    let (email, first_name, source): (String, Option<String>, Option<String>) =
        sqlx::query_as("SELECT email, first_name, source FROM subscribers")
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to fetch saved subscription.");
    assert_eq!(email, "ursula_le_guin@gmail.com");
    assert_eq!(first_name.as_deref(), Some("Ursula"));
    assert_eq!(source.as_deref(), Some("website"));
    assert_eq!(
        app.subscriber_status("ursula_le_guin@gmail.com").await,
        SubscriberStatus::Active
    );
}

#[tokio::test]
async fn subscribing_twice_reports_an_existing_subscriber() {
    let app = spawn_app().await;
    let body = "email=ursula_le_guin%40gmail.com";

    let first = app.post_subscriptions(body.into()).await;
    let second = app.post_subscriptions(body.into()).await;

    assert_eq!(200, first.status().as_u16());
    assert_eq!(200, second.status().as_u16());
    let first: serde_json::Value = first.json().await.unwrap();
    let second: serde_json::Value = second.json().await.unwrap();
    assert_eq!(second["isExistingSubscriber"], true);
    assert_eq!(second["message"], "Welcome back! You are already subscribed.");
    assert_eq!(first["data"]["id"], second["data"]["id"]);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn concurrent_signups_store_a_single_row() {
    let app = spawn_app().await;
    let body = "email=ursula_le_guin%40gmail.com";

    let (a, b) = tokio::join!(
        app.post_subscriptions(body.into()),
        app.post_subscriptions(body.into())
    );

    assert_eq!(200, a.status().as_u16());
    assert_eq!(200, b.status().as_u16());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn subscribe_returns_400_when_fields_are_missing_or_invalid() {
    let app = spawn_app().await;
    let test_cases = vec![
        ("", "Email is required", "missing email"),
        ("email=", "Email is required", "empty email"),
        ("email=not-an-email", "Invalid email address", "invalid email"),
    ];

    for (body, message, description) in test_cases {
        let response = app.post_subscriptions(body.into()).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );
        let payload: serde_json::Value = response.json().await.unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["message"], message);
    }
}

#[tokio::test]
async fn subscribe_fails_if_there_is_a_fatal_database_error() {
    let app = spawn_app().await;
    sqlx::query("ALTER TABLE subscribers DROP COLUMN email;")
        .execute(&app.db_pool)
        .await
        .unwrap();

    let response = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".into())
        .await;

    assert_eq!(response.status().as_u16(), 500);
    let payload: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        payload["message"],
        "An unexpected error occurred. Please try again."
    );
}

#[tokio::test]
async fn form_routes_answer_unreadable_bodies_with_the_failure_shape() {
    let app = spawn_app().await;

    for route in ["/subscriptions", "/lead-magnet", "/unsubscribe"] {
        let response = app
            .post_raw(route, "application/json", r#"{"email":"a@example.com"}"#, &[])
            .await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "{} did not fail with 400 Bad Request for a JSON body.",
            route
        );
        let payload: serde_json::Value = response.json().await.unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["message"], "Invalid form submission. Please try again.");
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
