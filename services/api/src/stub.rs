//! In-memory stand-in for the registration service: two multipart upload endpoints
//! and the final registration call, answering in the same JSON shapes.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mime::Mime;
use registration_form::config::{ConfigError, RegistrationApiConfig};
use registration_form::error::AppError;
use registration_form::workflows::registration::{FileKind, RegistrationPayload};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

pub(crate) const REGISTERED_MESSAGE: &str = "User registered successfully";
pub(crate) const DUPLICATE_MESSAGE: &str = "User already registered";
pub(crate) const MISSING_FILE_MESSAGE: &str = "file is required";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredUpload {
    pub(crate) kind: FileKind,
    pub(crate) original_name: String,
    pub(crate) content_type: String,
    pub(crate) size: usize,
}

#[derive(Default, Clone)]
pub(crate) struct StubState {
    readiness: Arc<AtomicBool>,
    uploads: Arc<Mutex<HashMap<String, StoredUpload>>>,
    registrations: Arc<Mutex<HashMap<String, RegistrationPayload>>>,
}

impl StubState {
    pub(crate) fn mark_ready(&self) {
        self.readiness.store(true, Ordering::Release);
    }

    pub(crate) fn uploads(&self) -> HashMap<String, StoredUpload> {
        lock(&self.uploads).clone()
    }

    pub(crate) fn registrations(&self) -> Vec<RegistrationPayload> {
        lock(&self.registrations).values().cloned().collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn router(state: StubState, api: &RegistrationApiConfig) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route(&route_path(&api.image_upload_path), post(upload_image))
        .route(&route_path(&api.document_upload_path), post(upload_document))
        .route(&route_path(&api.submit_path), post(register))
        .with_state(state)
}

fn route_path(configured: &str) -> String {
    format!("/{}", configured.trim_start_matches('/'))
}

/// Bind the stand-in on an ephemeral local port and serve it in the background.
pub(crate) async fn spawn_local() -> Result<(Url, StubState), AppError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let base_url = local_url(addr)?;

    let state = StubState::default();
    let app = router(state.clone(), &RegistrationApiConfig::new(base_url.clone()));
    state.mark_ready();

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "local registration stand-in stopped");
        }
    });

    Ok((base_url, state))
}

fn local_url(addr: SocketAddr) -> Result<Url, ConfigError> {
    let raw = format!("http://{addr}/");
    Url::parse(&raw).map_err(|source| ConfigError::InvalidApiUrl { value: raw, source })
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(State(state): State<StubState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn upload_image(State(state): State<StubState>, multipart: Multipart) -> Response {
    receive_upload(&state, FileKind::Image, multipart).await
}

async fn upload_document(State(state): State<StubState>, multipart: Multipart) -> Response {
    receive_upload(&state, FileKind::Pdf, multipart).await
}

async fn receive_upload(state: &StubState, kind: FileKind, mut multipart: Multipart) -> Response {
    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return reject(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": MISSING_FILE_MESSAGE }),
                )
            }
            Err(err) => return reject(err.status(), json!({ "error": err.body_text() })),
        };
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
            .to_string();
        match field.bytes().await {
            Ok(bytes) => {
                break StoredUpload {
                    kind,
                    original_name,
                    content_type,
                    size: bytes.len(),
                }
            }
            Err(err) => return reject(err.status(), json!({ "error": err.body_text() })),
        }
    };

    let accepted = upload
        .content_type
        .parse::<Mime>()
        .map(|mime| kind.accepts(&mime))
        .unwrap_or(false);
    if !accepted {
        warn!(kind = kind.label(), content_type = %upload.content_type, "upload refused");
        return reject(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            json!({ "error": format!("Only {} files are allowed", kind.label()) }),
        );
    }

    let file_path = storage_path(kind, &upload.original_name);
    info!(
        kind = kind.label(),
        file_path = %file_path,
        bytes = upload.size,
        "upload stored"
    );
    lock(&state.uploads).insert(file_path.clone(), upload);

    (StatusCode::OK, Json(json!({ "filePath": file_path }))).into_response()
}

fn storage_path(kind: FileKind, original_name: &str) -> String {
    let dir = match kind {
        FileKind::Image => "images",
        FileKind::Pdf => "documents",
    };
    let name: String = original_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!("uploads/{dir}/{}-{name}", Uuid::new_v4())
}

async fn register(
    State(state): State<StubState>,
    Json(payload): Json<RegistrationPayload>,
) -> Response {
    {
        let uploads = lock(&state.uploads);
        if let Some(missing) = payload
            .documents
            .iter()
            .find(|doc| !uploads.contains_key(&doc.uploaded_path))
        {
            return reject(
                StatusCode::BAD_REQUEST,
                json!({ "error": format!("Document {} was not uploaded", missing.file_name) }),
            );
        }
    }

    let key = payload.email.trim().to_ascii_lowercase();
    let mut registrations = lock(&state.registrations);
    if registrations.contains_key(&key) {
        warn!(email = %key, "duplicate registration refused");
        return reject(StatusCode::CONFLICT, json!({ "message": DUPLICATE_MESSAGE }));
    }

    info!(
        email = %key,
        documents = payload.documents.len(),
        same_as_residential = payload.same_as_residential,
        "user registered"
    );
    registrations.insert(key, payload);
    (StatusCode::OK, Json(json!({ "message": REGISTERED_MESSAGE }))).into_response()
}

fn reject(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}
