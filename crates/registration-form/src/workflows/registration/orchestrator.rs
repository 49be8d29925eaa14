use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use super::domain::{FileKind, RegistrationForm};
use super::gateway::{
    RegistrationGateway, RegistrationPayload, SubmittedDocument, TransportFailure,
};
use super::schema::{RegistrationSchema, ValidationFailure};

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Registration successful";
pub const IN_PROGRESS_MESSAGE: &str = "A registration is already being submitted";

/// Where a submission attempt currently stands. `Succeeded` and `Failed` stay
/// published until the next attempt begins; an abandoned attempt falls back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Validating,
    Uploading,
    Submitting,
    Succeeded,
    Failed,
}

impl WorkflowPhase {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::Validating => "validating",
            WorkflowPhase::Uploading => "uploading",
            WorkflowPhase::Submitting => "submitting",
            WorkflowPhase::Succeeded => "succeeded",
            WorkflowPhase::Failed => "failed",
        }
    }

    /// The loading indicator spans validation through the last network call.
    pub const fn is_loading(self) -> bool {
        matches!(
            self,
            WorkflowPhase::Validating | WorkflowPhase::Uploading | WorkflowPhase::Submitting
        )
    }
}

/// What a successful submission hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub message: Option<String>,
    pub documents: Vec<SubmittedDocument>,
}

impl SubmissionReceipt {
    pub fn notification(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_SUCCESS_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("a registration submission is already in progress")]
    InProgress,
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Transport(#[from] TransportFailure),
}

impl SubmissionError {
    /// Single user-facing message for this failure.
    pub fn notification(&self) -> &str {
        match self {
            SubmissionError::InProgress => IN_PROGRESS_MESSAGE,
            SubmissionError::Validation(failure) => failure.summary(),
            SubmissionError::Transport(failure) => failure.user_message(),
        }
    }
}

/// Sequences validate, upload and register for one draft at a time.
pub struct RegistrationWorkflow<G> {
    gateway: Arc<G>,
    in_flight: AtomicBool,
    phase: watch::Sender<WorkflowPhase>,
}

impl<G> std::fmt::Debug for RegistrationWorkflow<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationWorkflow")
            .field("phase", &*self.phase.borrow())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<G> RegistrationWorkflow<G>
where
    G: RegistrationGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        let (phase, _) = watch::channel(WorkflowPhase::Idle);
        Self {
            gateway,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn phase(&self) -> WorkflowPhase {
        *self.phase.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.phase().is_loading()
    }

    /// Follow phase changes, e.g. to drive a loading indicator.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowPhase> {
        self.phase.subscribe()
    }

    /// Submit using today's local date for the age check.
    pub async fn submit(
        &self,
        draft: &mut RegistrationForm,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.submit_on(draft, Local::now().date_naive()).await
    }

    /// Run one submission attempt. A second call while one is in flight is refused
    /// without touching its draft. The draft is reset only on success.
    pub async fn submit_on(
        &self,
        draft: &mut RegistrationForm,
        today: NaiveDate,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let Some(attempt) = Attempt::begin(&self.in_flight, &self.phase) else {
            warn!("submission ignored: another attempt is in flight");
            return Err(SubmissionError::InProgress);
        };

        let result = self.run(draft, today).await;
        let terminal = match &result {
            Ok(_) => WorkflowPhase::Succeeded,
            Err(_) => WorkflowPhase::Failed,
        };
        self.enter(terminal);
        attempt.settle();
        result
    }

    async fn run(
        &self,
        draft: &mut RegistrationForm,
        today: NaiveDate,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.enter(WorkflowPhase::Validating);
        let schema = RegistrationSchema::prepare(draft);
        if let Err(failure) = schema.validate(draft, today) {
            info!(
                violations = failure.violations().len(),
                summary = failure.summary(),
                "registration draft rejected by validation"
            );
            return Err(failure.into());
        }

        self.enter(WorkflowPhase::Uploading);
        let documents = self.upload_documents(draft).await.map_err(|failure| {
            warn!(
                endpoint = %failure.endpoint,
                status = ?failure.status,
                message = failure.user_message(),
                "document upload failed"
            );
            failure
        })?;
        for document in &documents {
            draft.record_uploaded_path(document.id, document.uploaded_path.clone());
        }

        self.enter(WorkflowPhase::Submitting);
        let payload = RegistrationPayload::new(draft, documents.clone());
        let receipt = self.gateway.register(&payload).await.map_err(|failure| {
            warn!(
                status = ?failure.status,
                message = failure.user_message(),
                "registration call failed"
            );
            failure
        })?;

        info!(
            status = receipt.status,
            documents = documents.len(),
            "registration accepted"
        );
        draft.reset();

        Ok(SubmissionReceipt {
            message: receipt.message,
            documents,
        })
    }

    /// One upload per typed document, all dispatched together; the first rejection
    /// fails the whole batch.
    async fn upload_documents(
        &self,
        draft: &RegistrationForm,
    ) -> Result<Vec<SubmittedDocument>, TransportFailure> {
        let uploads = draft.documents().iter().filter_map(|doc| {
            let kind = doc.file_kind?;
            let file = doc.file.as_ref()?;
            let gateway = &self.gateway;
            Some(async move {
                let uploaded_path = match kind {
                    FileKind::Image => gateway.upload_image(file).await?,
                    FileKind::Pdf => gateway.upload_document(file).await?,
                };
                info!(document = %doc.id, kind = kind.label(), "document uploaded");
                Ok::<_, TransportFailure>(SubmittedDocument {
                    id: doc.id,
                    file_name: doc.file_name.clone(),
                    file_kind: kind,
                    uploaded_path,
                })
            })
        });

        try_join_all(uploads).await
    }

    fn enter(&self, phase: WorkflowPhase) {
        info!(phase = phase.label(), "registration workflow phase");
        self.phase.send_replace(phase);
    }
}

/// Holds the in-flight flag for one attempt. Beginning leaves the previous terminal
/// phase for `Idle`; an attempt dropped before it settles also returns to `Idle`.
struct Attempt<'a> {
    in_flight: &'a AtomicBool,
    phase: &'a watch::Sender<WorkflowPhase>,
    settled: bool,
}

impl<'a> Attempt<'a> {
    fn begin(in_flight: &'a AtomicBool, phase: &'a watch::Sender<WorkflowPhase>) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        phase.send_replace(WorkflowPhase::Idle);
        Some(Self {
            in_flight,
            phase,
            settled: false,
        })
    }

    /// Keep the terminal phase already published and release the flag.
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.phase.send_replace(WorkflowPhase::Idle);
        }
        self.in_flight.store(false, Ordering::Release);
    }
}
