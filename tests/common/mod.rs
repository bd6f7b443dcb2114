//! Shared test fixtures: in-memory state, seeded rows, request builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use casedesk::db::{AppState, init_db, queries};
use casedesk::error::Result;
use casedesk::handlers;
use casedesk::handlers::webhooks::signature;
use casedesk::jwt;
use casedesk::models::{CreateOrganization, CreateWorkspace, Organization, User, Workspace};
use casedesk::storage::ObjectStorage;

pub const SESSION_SECRET: &str = "test-session-secret";
pub const WEBHOOK_SECRET: &str = "whsec_dGVzdC13ZWJob29rLXNlY3JldA==";

/// One recorded call to the storage collaborator.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub bucket: String,
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

/// In-memory storage double; records uploads instead of making HTTP calls.
#[derive(Default)]
pub struct MemoryStorage {
    pub uploads: Mutex<Vec<StoredUpload>>,
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        self.uploads.lock().unwrap().push(StoredUpload {
            bucket: bucket.to_string(),
            path: path.to_string(),
            size: bytes.len(),
            content_type: content_type.to_string(),
        });
        Ok(format!("memory://{}/{}", bucket, path))
    }
}

pub fn create_test_state() -> AppState {
    create_test_state_with_storage().0
}

/// In-memory SQLite behind a single pooled connection, so every checkout
/// sees the same database.
pub fn create_test_state_with_storage() -> (AppState, Arc<MemoryStorage>) {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();

    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let storage = Arc::new(MemoryStorage::default());
    let state = AppState {
        db: pool,
        session_key: jwt::session_key(SESSION_SECRET),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        storage: storage.clone(),
    };
    (state, storage)
}

pub fn test_app(state: AppState) -> Router {
    handlers::router(state)
}

// ============ Seed helpers ============

pub fn seed_user(conn: &Connection, external_id: &str, email: &str) -> User {
    queries::upsert_user(
        conn,
        &casedesk::models::UpsertUser {
            external_id: external_id.to_string(),
            email: email.to_string(),
            name: Some("Test User".to_string()),
            avatar_url: None,
        },
    )
    .unwrap()
}

pub fn create_test_org(
    conn: &mut Connection,
    user_id: &str,
    name: &str,
    slug: &str,
) -> Organization {
    queries::provision_organization(
        conn,
        user_id,
        &CreateOrganization {
            name: name.to_string(),
            slug: slug.to_string(),
            domain: None,
            logo_url: None,
            billing_email: None,
        },
    )
    .unwrap()
}

pub fn create_test_workspace(
    conn: &mut Connection,
    user_id: &str,
    organization_id: &str,
    name: &str,
    slug: &str,
) -> Workspace {
    queries::create_workspace(
        conn,
        user_id,
        &CreateWorkspace {
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
        },
    )
    .unwrap()
}

// ============ Request builders ============

pub fn session_token(state: &AppState, external_id: &str) -> String {
    jwt::issue_session_token(&state.session_key, external_id).unwrap()
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build a correctly signed webhook delivery for the given event.
pub fn webhook_request(event: &serde_json::Value) -> Request<Body> {
    let payload = serde_json::to_vec(event).unwrap();
    let msg_id = format!("msg_{}", uuid::Uuid::new_v4());
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let sig = signature::sign(WEBHOOK_SECRET, &msg_id, &timestamp, &payload);

    Request::builder()
        .method("POST")
        .uri("/webhooks/identity")
        .header("content-type", "application/json")
        .header("webhook-id", msg_id)
        .header("webhook-timestamp", timestamp)
        .header("webhook-signature", sig)
        .body(Body::from(payload))
        .unwrap()
}

pub const MULTIPART_BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// Hand-rolled multipart/form-data body for upload tests.
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\ncontent-disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\ncontent-disposition: form-data; name=\"file\"; filename=\"{}\"\r\ncontent-type: {}\r\n\r\n",
                MULTIPART_BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
