//! src/turnstile.rs

use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

/// Client for the Turnstile human-verification service.
pub struct TurnstileClient {
    http_client: Client,
    base_url: String,
    secret_key: Option<Secret<String>>,
}

#[derive(serde::Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
}

#[derive(serde::Deserialize)]
struct SiteVerifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl TurnstileClient {
    pub fn new(
        base_url: String,
        secret_key: Option<Secret<String>>,
        timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            secret_key,
        }
    }

    /// Any failure to get a definite answer counts as a failed verification.
    #[tracing::instrument(name = "Verifying a Turnstile token", skip(self, token))]
    pub async fn verify(&self, token: &str) -> bool {
        let Some(secret_key) = self.secret_key.as_ref() else {
            tracing::error!("Turnstile secret key is not configured");
            return false;
        };
        match self.site_verify(secret_key, token).await {
            Ok(reply) => {
                if !reply.success {
                    tracing::info!(error_codes = ?reply.error_codes, "Turnstile rejected the token");
                }
                reply.success
            }
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Error verifying Turnstile token");
                false
            }
        }
    }

    async fn site_verify(
        &self,
        secret_key: &Secret<String>,
        token: &str,
    ) -> Result<SiteVerifyResponse, reqwest::Error> {
        let url = format!("{}/turnstile/v0/siteverify", self.base_url);
        self.http_client
            .post(&url)
            .json(&SiteVerifyRequest {
                secret: secret_key.expose_secret(),
                response: token,
            })
            .send()
            .await?
            .json::<SiteVerifyResponse>()
            .await
    }
}
