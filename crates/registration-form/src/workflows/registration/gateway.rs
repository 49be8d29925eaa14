use std::fmt::Display;
use std::future::Future;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::domain::{Address, DocumentId, FileHandle, FileKind, RegistrationForm};
use crate::config::{ConfigError, RegistrationApiConfig};

pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred. Please try again.";

/// Document row as the registration endpoint receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedDocument {
    pub id: DocumentId,
    pub file_name: String,
    #[serde(rename = "fileType")]
    pub file_kind: FileKind,
    #[serde(rename = "filePath")]
    pub uploaded_path: String,
}

/// Body of the final registration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
    pub email: String,
    pub residential_address: Address,
    pub permanent_address: Address,
    pub documents: Vec<SubmittedDocument>,
    #[serde(rename = "isSameAsResidential")]
    pub same_as_residential: bool,
}

impl RegistrationPayload {
    pub fn new(draft: &RegistrationForm, documents: Vec<SubmittedDocument>) -> Self {
        Self {
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            dob: draft.dob.clone(),
            email: draft.email.clone(),
            residential_address: draft.residential_address.clone(),
            permanent_address: draft.permanent_address.clone(),
            documents,
            same_as_residential: draft.same_as_residential(),
        }
    }
}

/// Successful answer from the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReceipt {
    pub status: u16,
    pub message: Option<String>,
}

/// A rejected upload or registration call, network-level or application-level alike.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{endpoint} request failed: {detail}")]
pub struct TransportFailure {
    pub endpoint: String,
    pub status: Option<u16>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub detail: String,
}

#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl TransportFailure {
    /// No response was obtained (connect, timeout, decode).
    pub fn network(endpoint: impl Into<String>, err: impl Display) -> Self {
        Self {
            endpoint: endpoint.into(),
            status: None,
            message: None,
            error: None,
            detail: err.to_string(),
        }
    }

    /// The server answered with a non-success status; `body` is searched for
    /// `message` and `error` fields.
    pub fn rejected(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        let parsed: FailureBody = serde_json::from_str(body).unwrap_or_default();
        Self {
            endpoint: endpoint.into(),
            status: Some(status),
            message: non_empty(parsed.message),
            error: non_empty(parsed.error),
            detail: format!("status {status}"),
        }
    }

    /// `message`, else `error`, else the generic fallback.
    pub fn user_message(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or(GENERIC_FAILURE_MESSAGE)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// The three network calls the workflow depends on.
pub trait RegistrationGateway: Send + Sync {
    /// Store an image, returning its storage path.
    fn upload_image(
        &self,
        file: &FileHandle,
    ) -> impl Future<Output = Result<String, TransportFailure>> + Send;

    /// Store a PDF, returning its storage path.
    fn upload_document(
        &self,
        file: &FileHandle,
    ) -> impl Future<Output = Result<String, TransportFailure>> + Send;

    fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> impl Future<Output = Result<RegistrationReceipt, TransportFailure>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_path: String,
}

#[derive(Debug, Default, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    message: Option<String>,
}

const IMAGE_ENDPOINT: &str = "image upload";
const DOCUMENT_ENDPOINT: &str = "document upload";
const SUBMIT_ENDPOINT: &str = "registration";

/// `reqwest`-backed gateway talking to the configured registration service.
#[derive(Debug, Clone)]
pub struct HttpRegistrationGateway {
    http: reqwest::Client,
    image_upload_url: Url,
    document_upload_url: Url,
    submit_url: Url,
}

impl HttpRegistrationGateway {
    pub fn new(config: &RegistrationApiConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            image_upload_url: config.image_upload_url()?,
            document_upload_url: config.document_upload_url()?,
            submit_url: config.submit_url()?,
        })
    }

    async fn upload(
        &self,
        url: &Url,
        endpoint: &'static str,
        file: &FileHandle,
    ) -> Result<String, TransportFailure> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(file.content_type.as_ref())
            .map_err(|err| TransportFailure::network(endpoint, err))?;
        let form = Form::new().part("file", part);

        debug!(endpoint, file = %file.name, bytes = file.bytes.len(), "uploading file");
        let response = self
            .http
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| TransportFailure::network(endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportFailure::rejected(endpoint, status.as_u16(), &body));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|err| TransportFailure::network(endpoint, err))?;
        Ok(body.file_path)
    }
}

impl RegistrationGateway for HttpRegistrationGateway {
    async fn upload_image(&self, file: &FileHandle) -> Result<String, TransportFailure> {
        self.upload(&self.image_upload_url, IMAGE_ENDPOINT, file)
            .await
    }

    async fn upload_document(&self, file: &FileHandle) -> Result<String, TransportFailure> {
        self.upload(&self.document_upload_url, DOCUMENT_ENDPOINT, file)
            .await
    }

    async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, TransportFailure> {
        let response = self
            .http
            .post(self.submit_url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|err| TransportFailure::network(SUBMIT_ENDPOINT, err))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TransportFailure::rejected(
                SUBMIT_ENDPOINT,
                status.as_u16(),
                &body,
            ));
        }

        let parsed: RegisterResponse = serde_json::from_str(&body).unwrap_or_default();
        Ok(RegistrationReceipt {
            status: status.as_u16(),
            message: non_empty(parsed.message),
        })
    }
}
