//! tests/api/helpers.rs

use newsletter::configurations::{get_configuration, DatabaseSettings};
use newsletter::dispatch::DispatchMode;
use newsletter::domain::SubscriberStatus;
use newsletter::startup::{get_connection_pool, Application};
use newsletter::telemetry::{get_subscriber, init_subscriber};
use newsletter::templates::RenderStrategy;
use once_cell::sync::Lazy;
use secrecy::Secret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SEND_API_KEY: &str = "re_test_key";
pub const TURNSTILE_SECRET: &str = "turnstile-test-secret";

// Set TEST_LOG to see the logs of the application under test.
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub turnstile_server: MockServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_subscriptions(&self, body: String) -> reqwest::Response {
        self.post_form("/subscriptions", body).await
    }

    pub async fn post_lead_magnet(&self, body: String) -> reqwest::Response {
        self.post_form("/lead-magnet", body).await
    }

    pub async fn post_unsubscribe(&self, body: String) -> reqwest::Response {
        self.post_form("/unsubscribe", body).await
    }

    async fn post_form(&self, route: &str, body: String) -> reqwest::Response {
        self.api_client
            .post(&format!("{}{}", &self.address, route))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// POST a body exactly as given, for exercising unreadable payloads.
    pub async fn post_raw(
        &self,
        route: &str,
        content_type: &str,
        body: &str,
        headers: &[(&str, String)],
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .post(&format!("{}{}", &self.address, route))
            .header("Content-Type", content_type)
            .body(body.to_string());
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn get_html(&self, route: &str) -> String {
        self.api_client
            .get(&format!("{}{}", &self.address, route))
            .send()
            .await
            .expect("Failed to execute request.")
            .text()
            .await
            .unwrap()
    }

    /// POST to `/api/send` with the given extra headers.
    pub async fn post_send(
        &self,
        body: &serde_json::Value,
        headers: &[(&str, String)],
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .post(&format!("{}/api/send", &self.address))
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn accept_turnstile_tokens(&self) {
        Mock::given(path("/turnstile/v0/siteverify"))
            .and(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })),
            )
            .mount(&self.turnstile_server)
            .await;
    }

    pub async fn accept_provider_sends(&self, message_id: &str) {
        Mock::given(path("/emails"))
            .and(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": message_id })),
            )
            .mount(&self.email_server)
            .await;
    }

    pub async fn subscriber_status(&self, email: &str) -> SubscriberStatus {
        sqlx::query_scalar::<_, SubscriberStatus>("SELECT status FROM subscribers WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to fetch subscriber status.")
    }

    pub async fn email_log_statuses(&self) -> Vec<String> {
        sqlx::query_scalar::<_, String>("SELECT status::text FROM email_logs ORDER BY sent_at")
            .fetch_all(&self.db_pool)
            .await
            .expect("Failed to fetch email logs.")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(DispatchMode::Direct).await
}

pub async fn spawn_app_with(dispatch: DispatchMode) -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;
    let turnstile_server = MockServer::start().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        c.email_client.base_url = email_server.uri();
        c.email_client.api_key = Secret::new(SEND_API_KEY.to_string());
        // Short enough for tests to provoke a provider timeout.
        c.email_client.timeout_milliseconds = 1_000;
        c.email.render_strategy = RenderStrategy::Live;
        c.email.dispatch = dispatch;
        c.turnstile.base_url = turnstile_server.uri();
        c.turnstile.secret_key = Some(Secret::new(TURNSTILE_SECRET.to_string()));
        c
    };

    configure_database(&configuration.database).await;

    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        db_pool: get_connection_pool(&configuration.database),
        email_server,
        turnstile_server,
        api_client: reqwest::Client::new(),
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");
    connection_pool
}
