//! src/startup.rs

use crate::authentication::SendApiKey;
use crate::configurations::{DatabaseSettings, LeadMagnetSettings, Settings};
use crate::dispatch::{DispatchMode, EmailDispatcher, RelayClient, Transport};
use crate::email_client::EmailClient;
use crate::routes::{
    claim_lead_magnet, form_error_handler, health_check, home, json_error_handler, send_email,
    subscribe, unsubscribe, unsubscribe_form, HomePage, TurnstileSiteKey,
};
use crate::templates::{Branding, TemplateRenderer};
use crate::turnstile::TurnstileClient;
use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let timeout = configuration.email_client.timeout();
        let api_key = configuration.email_client.api_key.clone();
        let email_client = Arc::new(
            configuration
                .email_client
                .client(&configuration.application.name),
        );
        let turnstile_site_key = configuration.turnstile.site_key.clone();
        let turnstile_client = configuration.turnstile.client(timeout);

        let renderer = TemplateRenderer::new(
            configuration.email.render_strategy,
            configuration.email.generated_dir,
            Branding {
                app_name: configuration.application.name.clone(),
                base_url: configuration.application.base_url.clone(),
            },
            configuration.email.default_theme,
        )?;
        let transport = match configuration.email.dispatch {
            DispatchMode::Direct => Transport::Direct(email_client.clone()),
            DispatchMode::Relay => {
                let relay_url = format!(
                    "http://{}:{}",
                    loopback_host(&configuration.application.host),
                    port
                );
                Transport::Relay(RelayClient::new(&relay_url, api_key.clone(), timeout))
            }
        };
        let dispatcher = EmailDispatcher::new(connection_pool.clone(), renderer, transport);
        let home_page = HomePage::render(&configuration.lead_magnet)?;

        let server = run(
            listener,
            connection_pool,
            AppState {
                email_client,
                turnstile_client,
                turnstile_site_key,
                dispatcher,
                send_api_key: SendApiKey(api_key),
                home_page,
                lead_magnet: configuration.lead_magnet,
            },
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// The relay posts back to this process, so a wildcard bind address becomes
/// the loopback one.
fn loopback_host(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

struct AppState {
    email_client: Arc<EmailClient>,
    turnstile_client: TurnstileClient,
    turnstile_site_key: String,
    dispatcher: EmailDispatcher,
    send_api_key: SendApiKey,
    home_page: HomePage,
    lead_magnet: LeadMagnetSettings,
}

fn run(listener: TcpListener, db_pool: PgPool, state: AppState) -> Result<Server, std::io::Error> {
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::from(state.email_client);
    let turnstile_client = web::Data::new(state.turnstile_client);
    let turnstile_site_key = web::Data::new(TurnstileSiteKey(state.turnstile_site_key));
    let dispatcher = web::Data::new(state.dispatcher);
    let send_api_key = web::Data::new(state.send_api_key);
    let home_page = web::Data::new(state.home_page);
    let lead_magnet = web::Data::new(state.lead_magnet);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::FormConfig::default().error_handler(form_error_handler))
            .route("/", web::get().to(home))
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(subscribe))
            .route("/lead-magnet", web::post().to(claim_lead_magnet))
            .route("/unsubscribe", web::get().to(unsubscribe_form))
            .route("/unsubscribe", web::post().to(unsubscribe))
            .route("/api/send", web::post().to(send_email))
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(turnstile_client.clone())
            .app_data(turnstile_site_key.clone())
            .app_data(dispatcher.clone())
            .app_data(send_api_key.clone())
            .app_data(home_page.clone())
            .app_data(lead_magnet.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
