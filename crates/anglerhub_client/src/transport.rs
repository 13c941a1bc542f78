//! crates/anglerhub_client/src/transport.rs
//!
//! HTTP access to the AnglerHub API and the `MutationTransport` port the
//! offline queue replays records through.

use anglerhub_core::domain::{Catch, Goal, User};
use async_trait::async_trait;
use reqwest::{header::HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::record::{MutationKind, PendingRecord};

/// Header carrying the queue record id, so a server may recognise replays.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Delivers one queued mutation. Any error counts as a failed attempt.
#[async_trait]
pub trait MutationTransport: Send + Sync {
    async fn deliver(&self, record: &PendingRecord) -> ClientResult<()>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

#[derive(Deserialize)]
struct CatchEnvelope {
    catch: Catch,
}

#[derive(Deserialize)]
struct GoalEnvelope {
    goal: Goal,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> ClientResult<AuthResponse> {
        let body = json!({
            "name": name,
            "email": email,
            "password": password,
            "password_confirmation": password,
        });
        let response: AuthResponse = self
            .send(Method::POST, "/auth/register", &body, None, false)
            .await?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    /// Logs in and keeps the returned bearer token for later calls.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthResponse> {
        let body = json!({ "email": email, "password": password });
        let response: AuthResponse = self
            .send(Method::POST, "/auth/login", &body, None, false)
            .await?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    pub async fn create_catch<B: Serialize + ?Sized>(&self, body: &B) -> ClientResult<Catch> {
        let envelope: CatchEnvelope = self.send(Method::POST, "/catches", body, None, true).await?;
        Ok(envelope.catch)
    }

    pub async fn create_goal<B: Serialize + ?Sized>(&self, body: &B) -> ClientResult<Goal> {
        let envelope: GoalEnvelope = self.send(Method::POST, "/goals", body, None, true).await?;
        Ok(envelope.goal)
    }

    pub async fn update_profile<B: Serialize + ?Sized>(&self, body: &B) -> ClientResult<User> {
        let envelope: UserEnvelope = self
            .send(Method::PUT, "/auth/profile", body, None, true)
            .await?;
        Ok(envelope.user)
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        idempotency_key: Option<Uuid>,
        authenticated: bool,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/api{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url).json(body);
        if authenticated {
            let token = self.token().ok_or(ClientError::NotAuthenticated)?;
            request = request.bearer_auth(token);
        }
        if let Some(key) = idempotency_key {
            if let Ok(value) = HeaderValue::from_str(&key.to_string()) {
                request = request.header(IDEMPOTENCY_KEY_HEADER, value);
            }
        }

        debug!(%method, %url, "Sending API request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> ClientError {
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    warn!(status = status.as_u16(), %message, "API request failed");
    ClientError::Status {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl MutationTransport for ApiClient {
    async fn deliver(&self, record: &PendingRecord) -> ClientResult<()> {
        let key = Some(record.id);
        let payload = &record.payload;
        match record.kind {
            MutationKind::CreateCatch => {
                let _: CatchEnvelope = self.send(Method::POST, "/catches", payload, key, true).await?;
            }
            MutationKind::CreateGoal => {
                let _: GoalEnvelope = self.send(Method::POST, "/goals", payload, key, true).await?;
            }
            MutationKind::UpdateProfile => {
                let _: UserEnvelope = self
                    .send(Method::PUT, "/auth/profile", payload, key, true)
                    .await?;
            }
        }
        Ok(())
    }
}
