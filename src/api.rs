//! HTTP boundary with the conversion backend.
//!
//! Two traits split the backend by consumer: [`ConversionApi`] is all the
//! workflow needs (upload + current user), [`AccountApi`] is what the auth
//! service needs. [`HttpApi`] implements both over `reqwest`; tests swap in
//! scripted fakes.
//!
//! The upload deliberately returns the raw status, detail and header instead
//! of an error: classification belongs to [`crate::pipeline::classify`], and
//! only a missing response (transport failure) is an `Err` here.

use crate::config::{ClientConfig, Theme};
use crate::error::Sheet2DeckError;
use crate::pipeline::classify::{decode_header, extract_detail, WARNINGS_HEADER};
use crate::pipeline::intake::PendingFile;
use crate::session::UserSnapshot;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ── Wire types ───────────────────────────────────────────────────────────

/// One conversion submission. Immutable once sent.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub file: PendingFile,
    pub title: String,
    pub theme: Theme,
    pub use_ai: bool,
}

/// Raw answer to `POST /convert`, before classification.
#[derive(Debug, Clone, Default)]
pub struct ConvertResponse {
    pub status: u16,
    /// `detail` of a non-2xx JSON body.
    pub detail: Option<String>,
    /// Raw `X-Report-Warnings` value.
    pub warnings_header: Option<String>,
    /// Deck bytes on 2xx; empty otherwise.
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserSnapshot,
}

/// Registration either logs the user in directly or only acknowledges.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserSnapshot>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingStatus {
    pub plan: String,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub conversions_this_month: u32,
    #[serde(default)]
    pub last_reset_date: Option<String>,
}

/// Hosted checkout or customer-portal page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectUrl {
    pub url: String,
}

// ── Traits ───────────────────────────────────────────────────────────────

/// What the conversion workflow needs from the backend.
#[async_trait]
pub trait ConversionApi: Send + Sync {
    /// Send one multipart upload. `Err` only when there is no HTTP response.
    async fn convert(
        &self,
        token: &str,
        request: &ConversionRequest,
    ) -> Result<ConvertResponse, Sheet2DeckError>;

    /// `GET /auth/me`.
    async fn current_user(&self, token: &str) -> Result<UserSnapshot, Sheet2DeckError>;
}

/// What the auth service needs from the backend.
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, Sheet2DeckError>;

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, Sheet2DeckError>;

    async fn current_user(&self, token: &str) -> Result<UserSnapshot, Sheet2DeckError>;
}

// ── reqwest implementation ───────────────────────────────────────────────

/// `reqwest`-backed client for every backend endpoint.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: ClientConfig,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, Sheet2DeckError> {
        // No overall timeout on the client: uploads wait for the backend.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("sheet2deck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Sheet2DeckError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /billing/status`.
    pub async fn billing_status(&self, token: &str) -> Result<BillingStatus, Sheet2DeckError> {
        let url = self.config.endpoint("/billing/status");
        let req = self.client.get(&url).bearer_auth(token);
        self.send_json(&url, req).await
    }

    /// `POST /billing/checkout` for the pro plan.
    pub async fn billing_checkout(&self, token: &str) -> Result<RedirectUrl, Sheet2DeckError> {
        let url = self.config.endpoint("/billing/checkout");
        let req = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "plan": "pro" }));
        self.send_json(&url, req).await
    }

    /// `GET /billing/portal`.
    pub async fn billing_portal(&self, token: &str) -> Result<RedirectUrl, Sheet2DeckError> {
        let url = self.config.endpoint("/billing/portal");
        let req = self.client.get(&url).bearer_auth(token);
        self.send_json(&url, req).await
    }

    async fn send(&self, url: &str, req: RequestBuilder) -> Result<Response, Sheet2DeckError> {
        req.send().await.map_err(|e| Sheet2DeckError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Send a JSON call with the request timeout; non-2xx → `Api` error.
    async fn send_json<T: DeserializeOwned>(
        &self,
        url: &str,
        req: RequestBuilder,
    ) -> Result<T, Sheet2DeckError> {
        let response = self.send(url, req.timeout(self.config.request_timeout)).await?;
        let status = response.status();
        let text = response.text().await;

        if !status.is_success() {
            let detail = match text {
                Ok(text) => extract_detail(&text),
                Err(e) => {
                    warn!("Could not read error body from {}: {}", url, e);
                    None
                }
            };
            return Err(Sheet2DeckError::Api {
                status: status.as_u16(),
                detail: detail
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            });
        }

        let text = text.map_err(|e| Sheet2DeckError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&text).map_err(|e| Sheet2DeckError::UnexpectedResponse {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    async fn fetch_current_user(&self, token: &str) -> Result<UserSnapshot, Sheet2DeckError> {
        let url = self.config.endpoint("/auth/me");
        let req = self.client.get(&url).bearer_auth(token);
        self.send_json(&url, req).await
    }
}

#[async_trait]
impl ConversionApi for HttpApi {
    async fn convert(
        &self,
        token: &str,
        request: &ConversionRequest,
    ) -> Result<ConvertResponse, Sheet2DeckError> {
        let url = self.config.endpoint("/convert");
        let bytes = request.file.source.read().await?;

        let part = Part::bytes(bytes)
            .file_name(request.file.name.clone())
            .mime_str(request.file.mime_type())
            .map_err(|e| Sheet2DeckError::Internal(format!("multipart mime: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("title", request.title.clone())
            .text("theme", request.theme.as_str())
            .text("use_ai", request.use_ai.to_string());

        info!(
            "Uploading '{}' ({} bytes) to {}",
            request.file.name, request.file.byte_size, url
        );
        let response = self
            .send(&url, self.client.post(&url).bearer_auth(token).multipart(form))
            .await?;

        let status = response.status().as_u16();
        let warnings_header = response
            .headers()
            .get(WARNINGS_HEADER)
            .map(|v| decode_header(v.as_bytes()));

        let body = response.bytes().await;

        if (200..300).contains(&status) {
            let body = body.map_err(|e| Sheet2DeckError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            debug!("POST /convert → {} ({} bytes)", status, body.len());
            Ok(ConvertResponse {
                status,
                detail: None,
                warnings_header,
                body: body.to_vec(),
            })
        } else {
            // The status alone is enough to classify; a lost body only loses the detail.
            let detail = match body {
                Ok(body) => extract_detail(&String::from_utf8_lossy(&body)),
                Err(e) => {
                    warn!("Could not read error body from {}: {}", url, e);
                    None
                }
            };
            debug!("POST /convert → {}", status);
            Ok(ConvertResponse {
                status,
                detail,
                warnings_header,
                body: Vec::new(),
            })
        }
    }

    async fn current_user(&self, token: &str) -> Result<UserSnapshot, Sheet2DeckError> {
        self.fetch_current_user(token).await
    }
}

#[async_trait]
impl AccountApi for HttpApi {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, Sheet2DeckError> {
        let url = self.config.endpoint("/auth/login");
        let req = self.client.post(&url).json(request);
        self.send_json(&url, req).await
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, Sheet2DeckError> {
        let url = self.config.endpoint("/auth/register");
        let req = self.client.post(&url).json(request);
        self.send_json(&url, req).await
    }

    async fn current_user(&self, token: &str) -> Result<UserSnapshot, Sheet2DeckError> {
        self.fetch_current_user(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_omits_missing_name() {
        let req = RegisterRequest {
            email: "a@b.c".into(),
            password: "secret1".into(),
            name: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("name").is_none());
    }

    #[test]
    fn register_response_accepts_both_shapes() {
        let ack: RegisterResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(ack.access_token.is_none());
        assert_eq!(ack.success, Some(true));

        let full: RegisterResponse = serde_json::from_str(
            r#"{"access_token":"t","user":{"plan":"free","conversions_this_month":0}}"#,
        )
        .unwrap();
        assert_eq!(full.access_token.as_deref(), Some("t"));
        assert!(full.user.is_some());
    }

    #[test]
    fn login_response_parses_backend_user() {
        let body = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "user": {
                "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                "email": "ana@example.com",
                "plan": "free",
                "credits": 10,
                "is_active": true,
                "conversions_this_month": 4
            }
        }"#;
        let parsed: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.access_token, "jwt");
        assert_eq!(parsed.user.conversions_this_month, 4);
        assert_eq!(parsed.user.credits, Some(10));
    }
}
