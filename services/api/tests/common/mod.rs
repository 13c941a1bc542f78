//! Spawns the real router on a loopback port, backed by the in-memory
//! database, a settable clock and a temporary photo directory.

#![allow(dead_code)]

use anglerhub_core::test_support::{InMemoryDatabase, MutableClock};
use api_lib::{adapters::LocalPhotoStorage, config::Config, web, web::AppState};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestApp {
    /// Server origin, without the `/api` prefix.
    pub origin: String,
    pub base_url: String,
    pub client: Client,
    pub clock: Arc<MutableClock>,
    pub db: Arc<InMemoryDatabase>,
    pub photo_dir: PathBuf,
    _photos: TempDir,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn test_config(photo_dir: PathBuf) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::DEBUG,
        database_max_connections: 1,
        photo_storage_path: photo_dir,
        cors_origin: "http://localhost:3000".to_string(),
        token_ttl_days: 30,
    }
}

pub async fn spawn_app() -> TestApp {
    let photos = tempfile::tempdir().unwrap();
    let photo_dir = photos.path().to_path_buf();
    let clock = Arc::new(MutableClock::new(start_time()));
    let db = Arc::new(InMemoryDatabase::new(clock.clone()));

    let state = Arc::new(AppState::new(
        db.clone(),
        Arc::new(LocalPhotoStorage::new(photo_dir.clone())),
        clock.clone(),
        Arc::new(test_config(photo_dir.clone())),
    ));
    let app = web::router(state).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        origin: format!("http://{}", addr),
        base_url: format!("http://{}/api", addr),
        client: Client::new(),
        clock,
        db,
        photo_dir,
        _photos: photos,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Registers `email` and returns its bearer token.
    pub async fn register(&self, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({
                "name": "Test Angler",
                "email": email,
                "password": "hook-line-sinker",
                "password_confirmation": "hook-line-sinker",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, token: &str, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete(&self, token: &str, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Creates a catch and returns its JSON.
    pub async fn log_catch(&self, token: &str, body: Value) -> Value {
        let res = self.post(token, "/catches", body).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["catch"].clone()
    }
}

/// Reads the body of a response expected to carry `status`.
pub async fn expect(res: Response, status: StatusCode) -> Value {
    assert_eq!(res.status(), status);
    res.json().await.unwrap()
}
