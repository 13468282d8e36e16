//! Cloudflare Turnstile challenge verification.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::TurnstileConfig;

pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(thiserror::Error, Debug)]
pub enum VerificationError {
    #[error("No captcha token was submitted")]
    MissingToken,

    #[error("The captcha token was rejected")]
    InvalidToken,

    #[error("Could not reach the captcha verification service: {0}")]
    ServiceError(#[from] reqwest::Error),
}

#[async_trait]
pub trait VerificationGate: Send + Sync {
    async fn verify(&self, token: Option<&str>) -> Result<(), VerificationError>;
}

#[derive(Deserialize)]
struct SiteVerifyResponse {
    success: bool,

    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct Turnstile {
    secret_key: Option<String>,
    verify_url: Url,
    client: reqwest::Client,
}

impl Turnstile {
    pub fn new(config: &TurnstileConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            secret_key: config.secret_key.clone(),
            verify_url: config.verify_url.clone(),
            client,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.secret_key.is_some()
    }
}

#[async_trait]
impl VerificationGate for Turnstile {
    async fn verify(&self, token: Option<&str>) -> Result<(), VerificationError> {
        let Some(secret) = self.secret_key.as_deref() else {
            tracing::warn!("TURNSTILE_SECRET_KEY is not configured, skipping captcha verification");
            return Ok(());
        };

        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(VerificationError::MissingToken),
        };

        let response: SiteVerifyResponse = self
            .client
            .post(self.verify_url.clone())
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            tracing::info!(error_codes = ?response.error_codes, "Captcha token rejected");
            return Err(VerificationError::InvalidToken);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, net::SocketAddr, time::Duration};

    use axum::{Form, Json, Router, routing::post};
    use serde_json::{Value, json};

    use super::*;

    async fn siteverify(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
        let ok = form.get("secret").map(String::as_str) == Some("s3cret")
            && form.get("response").map(String::as_str) == Some("good-token");
        if ok {
            Json(json!({ "success": true }))
        } else {
            Json(json!({ "success": false, "error-codes": ["invalid-input-response"] }))
        }
    }

    async fn mock_server() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/siteverify", post(siteverify));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn gate(secret: Option<&str>, addr: SocketAddr) -> Turnstile {
        Turnstile::new(&TurnstileConfig {
            secret_key: secret.map(String::from),
            verify_url: Url::parse(&format!("http://{addr}/siteverify")).unwrap(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn disabled_gate_always_passes() {
        let gate = gate(None, "127.0.0.1:9".parse().unwrap());
        assert!(!gate.is_enabled());
        assert!(gate.verify(None).await.is_ok());
        assert!(gate.verify(Some("whatever")).await.is_ok());
    }

    #[tokio::test]
    async fn missing_or_blank_token_is_rejected_without_a_request() {
        // nothing listens on the discard port, so a request would fail differently
        let gate = gate(Some("s3cret"), "127.0.0.1:9".parse().unwrap());
        assert!(matches!(
            gate.verify(None).await,
            Err(VerificationError::MissingToken)
        ));
        assert!(matches!(
            gate.verify(Some("  ")).await,
            Err(VerificationError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn accepted_token_passes() {
        let addr = mock_server().await;
        let gate = gate(Some("s3cret"), addr);
        assert!(gate.verify(Some("good-token")).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_token_is_invalid() {
        let addr = mock_server().await;
        let gate = gate(Some("s3cret"), addr);
        assert!(matches!(
            gate.verify(Some("bad-token")).await,
            Err(VerificationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let addr = mock_server().await;
        let gate = gate(Some("not-the-secret"), addr);
        assert!(matches!(
            gate.verify(Some("good-token")).await,
            Err(VerificationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_service_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gate = gate(Some("s3cret"), addr);
        assert!(matches!(
            gate.verify(Some("good-token")).await,
            Err(VerificationError::ServiceError(_))
        ));
    }

    #[tokio::test]
    async fn non_json_response_is_a_service_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/siteverify", post(|| async { "not json" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let gate = gate(Some("s3cret"), addr);
        assert!(matches!(
            gate.verify(Some("good-token")).await,
            Err(VerificationError::ServiceError(_))
        ));
    }
}
