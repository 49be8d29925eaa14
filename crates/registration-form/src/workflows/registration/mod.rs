//! Registration form workflow: the editable draft, its validation schema, and the
//! upload-then-register pipeline that submits it.

pub mod domain;
pub mod fields;
pub mod gateway;
pub mod manifest;
pub mod orchestrator;
pub mod schema;
pub mod session;

#[cfg(test)]
mod tests;

pub use domain::{
    Address, AddressKind, AddressLine, DocumentEntry, DocumentId, DraftError, FileHandle,
    FileKind, RegistrationForm, TextField,
};
pub use fields::{DocumentField, FieldPath, ValidationErrorMap, Violation};
pub use gateway::{
    GatewayError, HttpRegistrationGateway, RegistrationGateway, RegistrationPayload,
    RegistrationReceipt, SubmittedDocument, TransportFailure, GENERIC_FAILURE_MESSAGE,
};
pub use manifest::{DraftManifest, ManifestDocument, ManifestError};
pub use orchestrator::{
    RegistrationWorkflow, SubmissionError, SubmissionReceipt, WorkflowPhase,
    DEFAULT_SUCCESS_MESSAGE,
};
pub use schema::{
    age_in_years, RegistrationSchema, ValidationFailure, DATE_FORMAT, MINIMUM_AGE_YEARS,
    MINIMUM_DOCUMENTS, MINIMUM_DOCUMENTS_MESSAGE, REQUIRED_FIELDS_MESSAGE,
};
pub use session::{FormSession, Notice, NoticeLevel};
