//! Identity Provider collaborator.
//!
//! Resolves a bearer token to the authenticated session, or `None` when the
//! visitor is not signed in. The production implementation calls the hosted
//! auth backend; `StaticTokens` serves local development and tests.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Authenticated identity of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque user identifier issued by the auth backend.
    pub user_id: String,
}

/// Supplies the current session for a request, or `None` if unauthenticated.
///
/// `Err` means the auth backend could not be reached — callers surface that as
/// a failure, not as a login redirect.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> Result<Option<Session>>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

// ─── Hosted auth backend ─────────────────────────────────────────────────────

/// Shape of the auth backend's user endpoint response.
#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
}

/// Identity provider backed by the hosted auth service.
///
/// `GET {base_url}/auth/v1/user` with bearer auth: 200 yields the user id,
/// 401/403 means the token is invalid or expired (not an error — the visitor
/// is simply unauthenticated).
pub struct AuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for AuthApi {
    async fn current_user(&self, token: &str) -> Result<Option<Session>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("auth backend unreachable: {url}"))?;

        match resp.status() {
            s if s.is_success() => {
                let user: UserPayload = resp
                    .json()
                    .await
                    .context("auth backend returned malformed user payload")?;
                Ok(Some(Session { user_id: user.id }))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Ok(None),
            s => anyhow::bail!("auth backend returned unexpected status {s} for {url}"),
        }
    }
}

// ─── Static tokens (dev / tests) ─────────────────────────────────────────────

/// In-process token → user-id map. Configured via `[auth.static_tokens]`.
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokens {
    async fn current_user(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.tokens.get(token).map(|user_id| Session {
            user_id: user_id.clone(),
        }))
    }
}
