//! Phone-OTP authentication client.
//!
//! Wraps the hosted auth service (GoTrue-style endpoints under `/auth/v1`):
//! send an OTP to a phone number, verify it for a session, refresh and
//! sign out. The session token is what the app layer attaches to
//! user-scoped backend calls.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use kirana_core::{Phone, UserId};

use crate::config::BackendConfig;

/// Errors from the OTP auth service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Auth service rejected the request.
    #[error("Auth API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The OTP code was wrong or expired.
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    /// Response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An authenticated session.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: UserId,
    /// Epoch seconds at which `access_token` expires.
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: UserId,
}

impl From<TokenResponse> for Session {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
            user_id: resp.user.id,
            expires_at: resp.expires_at,
        }
    }
}

/// Client for the phone-OTP auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// Create an auth client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| AuthError::Parse(format!("invalid API key: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        // 401/403 on verify means a wrong or expired code, which the UI
        // handles with an inline retry rather than an error alert.
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthError::InvalidOtp);
        }
        Err(AuthError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        })
    }

    /// Send a one-time code to `phone` via SMS.
    #[instrument(skip(self), fields(phone = %phone))]
    pub async fn send_otp(&self, phone: &Phone) -> Result<(), AuthError> {
        #[derive(Serialize)]
        struct OtpRequest<'a> {
            phone: &'a Phone,
        }

        let response = self
            .client
            .post(self.url("otp"))
            .json(&OtpRequest { phone })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Verify the OTP `code` for `phone`, returning a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` for a wrong or expired code.
    #[instrument(skip(self, code), fields(phone = %phone))]
    pub async fn verify_otp(&self, phone: &Phone, code: &str) -> Result<Session, AuthError> {
        #[derive(Serialize)]
        struct VerifyRequest<'a> {
            phone: &'a Phone,
            token: &'a str,
            #[serde(rename = "type")]
            kind: &'static str,
        }

        let response = self
            .client
            .post(self.url("verify"))
            .json(&VerifyRequest {
                phone,
                token: code,
                kind: "sms",
            })
            .send()
            .await?;
        let response = Self::check(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        Ok(token.into())
    }

    /// Exchange a refresh token for a fresh session.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<Session, AuthError> {
        #[derive(Serialize)]
        struct RefreshRequest<'a> {
            refresh_token: &'a str,
        }

        let response = self
            .client
            .post(self.url("token?grant_type=refresh_token"))
            .json(&RefreshRequest {
                refresh_token: refresh_token.expose_secret(),
            })
            .send()
            .await?;
        let response = Self::check(response).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        Ok(token.into())
    }

    /// Invalidate the session server-side.
    #[instrument(skip(self, access_token))]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url("logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
