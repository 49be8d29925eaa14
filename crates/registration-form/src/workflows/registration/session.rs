use serde::Serialize;

use super::domain::{
    AddressKind, AddressLine, DocumentId, DraftError, FileHandle, FileKind, RegistrationForm,
    TextField,
};
use super::fields::{DocumentField, FieldPath, ValidationErrorMap};
use super::orchestrator::{SubmissionError, SubmissionReceipt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One transient message for the user (toast, status line, CLI output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&DraftError> for Notice {
    fn from(err: &DraftError) -> Self {
        Notice::error(err.to_string())
    }
}

/// A draft together with the errors currently shown against it.
///
/// Edits clear the message attached to the edited path; submission outcomes
/// replace the whole map.
#[derive(Debug, Clone, Default)]
pub struct FormSession {
    draft: RegistrationForm,
    errors: ValidationErrorMap,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_draft(draft: RegistrationForm) -> Self {
        Self {
            draft,
            errors: ValidationErrorMap::new(),
        }
    }

    pub fn draft(&self) -> &RegistrationForm {
        &self.draft
    }

    /// Mutable access for handing the draft to the orchestrator.
    pub fn draft_mut(&mut self) -> &mut RegistrationForm {
        &mut self.draft
    }

    pub fn errors(&self) -> &ValidationErrorMap {
        &self.errors
    }

    pub fn edit_text(&mut self, field: TextField, value: impl Into<String>) {
        self.draft.set_text(field, value);
        self.errors.clear(&FieldPath::Text(field));
    }

    pub fn edit_address(&mut self, kind: AddressKind, line: AddressLine, value: impl Into<String>) {
        self.draft.set_address_line(kind, line, value);
        self.errors.clear(&FieldPath::address(kind, line));
    }

    pub fn toggle_same_as_residential(&mut self) {
        self.draft.toggle_same_as_residential();
        self.errors.clear_where(FieldPath::is_permanent_address);
    }

    pub fn add_document(&mut self) -> DocumentId {
        self.draft.add_document()
    }

    /// Row indices shift on removal, so indexed document messages are dropped.
    pub fn remove_document(&mut self, id: DocumentId) -> Result<(), DraftError> {
        self.draft.remove_document(id)?;
        self.errors
            .clear_where(|path| matches!(path, FieldPath::Document { .. }));
        Ok(())
    }

    pub fn rename_document(
        &mut self,
        id: DocumentId,
        name: impl Into<String>,
    ) -> Result<(), DraftError> {
        self.draft.set_document_name(id, name)?;
        self.clear_document_error(id, DocumentField::FileName);
        Ok(())
    }

    pub fn choose_document_kind(&mut self, id: DocumentId, kind: FileKind) -> Result<(), DraftError> {
        self.draft.set_document_kind(id, kind)?;
        self.clear_document_error(id, DocumentField::FileKind);
        Ok(())
    }

    pub fn attach_document_file(
        &mut self,
        id: DocumentId,
        file: FileHandle,
    ) -> Result<(), DraftError> {
        self.draft.attach_file(id, file)?;
        self.clear_document_error(id, DocumentField::File);
        Ok(())
    }

    /// Apply a submission outcome and return the notice to show for it.
    pub fn record(&mut self, outcome: &Result<SubmissionReceipt, SubmissionError>) -> Notice {
        match outcome {
            Ok(receipt) => {
                self.errors = ValidationErrorMap::new();
                Notice::success(receipt.notification())
            }
            Err(SubmissionError::Validation(failure)) => {
                self.errors = failure.error_map();
                Notice::error(failure.summary())
            }
            Err(err @ SubmissionError::Transport(_)) => {
                self.errors = ValidationErrorMap::new();
                Notice::error(err.notification())
            }
            Err(err @ SubmissionError::InProgress) => Notice::error(err.notification()),
        }
    }

    fn clear_document_error(&mut self, id: DocumentId, field: DocumentField) {
        if let Some(index) = self.draft.document_index(id) {
            self.errors.clear(&FieldPath::document(index, field));
        }
    }
}
