//! Shared helpers for HTTP-level integration tests.
//!
//! Builds the full application router (same middleware stack as
//! production) over a real database pool, with fake inference, admission,
//! and marker clients injected through [`AppState`].

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use photolift_core::admission::{
    AdmissionControl, AdmissionDecision, FreeCreditMarker, MarkerError,
};
use photolift_core::credits::{free_marker_key, UtcDay};
use photolift_core::jobs::{JobError, JobHandle, JobStatus, RestorationJobs};
use photolift_core::ledger::CreditLedger;
use photolift_core::types::DbId;
use photolift_db::PgCreditLedger;

use photolift_api::auth::jwt::{Claims, JwtConfig};
use photolift_api::config::{InferenceConfig, ServerConfig};
use photolift_api::orchestrator::RestoreOrchestrator;
use photolift_api::router::build_app_router;
use photolift_api::state::AppState;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const PAYMENT_SECRET: &str = "payment-test-secret";
pub const IDENTITY_SECRET: &str = "identity-test-secret";

// ---------------------------------------------------------------------------
// Config and app construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with both webhook secrets set.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        payment_webhook_secret: Some(PAYMENT_SECRET.to_string()),
        identity_webhook_secret: Some(IDENTITY_SECRET.to_string()),
        inference: InferenceConfig {
            api_url: "http://inference.invalid".to_string(),
            api_token: "test-token".to_string(),
            model_version: "test-model".to_string(),
        },
        fast_store: None,
    }
}

/// Build the full application router with injected fakes and the given
/// configuration. Mirrors the wiring in `main.rs`.
pub fn build_app_with_config(
    pool: PgPool,
    config: ServerConfig,
    jobs: Arc<dyn RestorationJobs>,
    admission: Arc<dyn AdmissionControl>,
    marker: Arc<dyn FreeCreditMarker>,
) -> Router {
    let ledger: Arc<dyn CreditLedger> =
        Arc::new(PgCreditLedger::new(pool.clone(), Arc::clone(&marker)));

    let orchestrator = Arc::new(
        RestoreOrchestrator::new(Arc::clone(&ledger), jobs, admission, marker)
            .with_poll_interval(Duration::ZERO),
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ledger,
        orchestrator,
    };

    build_app_router(state, &config)
}

/// Default test app: scripted jobs, always-allowed admission, in-memory
/// marker.
pub fn build_test_app(
    pool: PgPool,
    jobs: Arc<dyn RestorationJobs>,
    admission: Arc<dyn AdmissionControl>,
    marker: Arc<dyn FreeCreditMarker>,
) -> Router {
    build_app_with_config(pool, test_config(), jobs, admission, marker)
}

/// App for webhook tests, where the restore-path fakes are irrelevant.
pub fn build_webhook_app(pool: PgPool) -> Router {
    build_test_app(
        pool,
        Arc::new(ScriptedJobs::succeeding("https://out/unused.png")),
        Arc::new(StaticAdmission(AdmissionDecision::Allowed)),
        Arc::new(InMemoryMarker::default()),
    )
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// What the fake inference provider reports once polled.
pub enum JobScript {
    Succeed(String),
    Fail(String),
}

/// Inference fake that records submissions and resolves immediately.
pub struct ScriptedJobs {
    script: JobScript,
    submits: AtomicU32,
}

impl ScriptedJobs {
    pub fn succeeding(url: &str) -> Self {
        Self {
            script: JobScript::Succeed(url.to_string()),
            submits: AtomicU32::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: JobScript::Fail(message.to_string()),
            submits: AtomicU32::new(0),
        }
    }

    pub fn submit_count(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RestorationJobs for ScriptedJobs {
    async fn submit(&self, _image: &[u8], _content_type: &str) -> Result<JobHandle, JobError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(JobHandle {
            id: "job_test".to_string(),
        })
    }

    async fn status(&self, _job: &JobHandle) -> Result<JobStatus, JobError> {
        Ok(match &self.script {
            JobScript::Succeed(url) => JobStatus::Succeeded {
                output_url: url.clone(),
            },
            JobScript::Fail(message) => JobStatus::Failed {
                message: message.clone(),
            },
        })
    }
}

/// Admission fake returning a fixed decision.
pub struct StaticAdmission(pub AdmissionDecision);

#[async_trait::async_trait]
impl AdmissionControl for StaticAdmission {
    async fn check(&self, _auth_id: &str) -> AdmissionDecision {
        self.0
    }
}

/// In-memory free-credit marker shared across requests in a test.
#[derive(Default)]
pub struct InMemoryMarker {
    used: Mutex<HashSet<String>>,
}

#[async_trait::async_trait]
impl FreeCreditMarker for InMemoryMarker {
    async fn is_used(&self, auth_id: &str, day: UtcDay) -> Result<bool, MarkerError> {
        Ok(self.used.lock().unwrap().contains(&free_marker_key(auth_id, day)))
    }

    async fn mark_used(&self, auth_id: &str, day: UtcDay) -> Result<(), MarkerError> {
        self.used.lock().unwrap().insert(free_marker_key(auth_id, day));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Seeding and tokens
// ---------------------------------------------------------------------------

/// Insert a user row directly; returns the internal id.
pub async fn seed_user(pool: &PgPool, auth_id: &str, paid_credits: i32) -> DbId {
    sqlx::query_scalar("INSERT INTO users (auth_id, paid_credits) VALUES ($1, $2) RETURNING id")
        .bind(auth_id)
        .bind(paid_credits)
        .fetch_one(pool)
        .await
        .expect("seed user")
}

pub async fn paid_balance(pool: &PgPool, auth_id: &str) -> i32 {
    sqlx::query_scalar("SELECT paid_credits FROM users WHERE auth_id = $1")
        .bind(auth_id)
        .fetch_one(pool)
        .await
        .expect("read balance")
}

/// Issue a valid bearer token for `auth_id` with the test JWT secret.
pub fn auth_token(auth_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: auth_id.to_string(),
        exp: now + 3600,
        iat: now,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "x-test-boundary";

/// Minimal PNG prefix with the given dimensions (signature + IHDR).
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes
}

/// A plausible JPEG payload (SOI marker + padding).
pub fn jpeg_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(len, 0);
    bytes
}

/// Build a multipart body with an `image` part and optional `label` part.
pub fn multipart_body(file: &[u8], content_type: &str, label: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; \
             filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(b"\r\n");
    if let Some(label) = label {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"label\"\r\n\r\n{label}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart restore request with a bearer token.
pub async fn post_restore(
    app: Router,
    token: Option<&str>,
    file: &[u8],
    content_type: &str,
    label: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/restore")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder
        .body(Body::from(multipart_body(file, content_type, label)))
        .expect("build request");
    app.oneshot(request).await.expect("send request")
}

/// GET with an optional bearer token.
pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Body::empty()).expect("build request");
    app.oneshot(request).await.expect("send request")
}

/// POST a signed webhook payload.
pub async fn post_signed(
    app: Router,
    uri: &str,
    signature_header: &str,
    secret: &str,
    payload: &serde_json::Value,
) -> Response<Body> {
    let body = serde_json::to_vec(payload).expect("serialize payload");
    let signature = photolift_api::webhook::sign_payload(secret, &body);
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(signature_header, signature)
        .body(Body::from(body))
        .expect("build request");
    app.oneshot(request).await.expect("send request")
}

/// POST a webhook payload with explicit (possibly absent) signature.
pub async fn post_unsigned(
    app: Router,
    uri: &str,
    signature: Option<&str>,
    payload: &serde_json::Value,
) -> Response<Body> {
    let body = serde_json::to_vec(payload).expect("serialize payload");
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-payment-signature", signature);
    }
    let request = builder.body(Body::from(body)).expect("build request");
    app.oneshot(request).await.expect("send request")
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse body as JSON")
}

/// Assert a status and return the parsed body.
pub async fn expect_status(
    response: Response<Body>,
    status: StatusCode,
) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}
