use std::fmt;

use mime::Mime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to a document row when it is created; survives every edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared kind of an uploaded document; decides the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    pub const fn label(self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
        }
    }

    /// `image/*` for images, exactly `application/pdf` for PDFs.
    pub fn accepts(self, content_type: &Mime) -> bool {
        match self {
            FileKind::Image => content_type.type_() == mime::IMAGE,
            FileKind::Pdf => content_type.essence_str() == mime::APPLICATION_PDF.essence_str(),
        }
    }
}

/// Raw file content picked by the user, plus what the picker reported about it.
#[derive(Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub content_type: Mime,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content_type: Mime, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("content_type", &self.content_type.essence_str())
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One uploadable row of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub id: DocumentId,
    pub file_name: String,
    pub file_kind: Option<FileKind>,
    pub file: Option<FileHandle>,
    pub uploaded_path: Option<String>,
}

impl DocumentEntry {
    pub fn empty() -> Self {
        Self {
            id: DocumentId::new(),
            file_name: String::new(),
            file_kind: None,
            file: None,
            uploaded_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street1: String,
    #[serde(default)]
    pub street2: String,
}

impl Address {
    pub fn line(&self, line: AddressLine) -> &str {
        match line {
            AddressLine::Street1 => &self.street1,
            AddressLine::Street2 => &self.street2,
        }
    }

    fn line_mut(&mut self, line: AddressLine) -> &mut String {
        match line {
            AddressLine::Street1 => &mut self.street1,
            AddressLine::Street2 => &mut self.street2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressKind {
    Residential,
    Permanent,
}

impl AddressKind {
    pub const fn key(self) -> &'static str {
        match self {
            AddressKind::Residential => "residentialAddress",
            AddressKind::Permanent => "permanentAddress",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AddressLine {
    Street1,
    Street2,
}

impl AddressLine {
    pub const fn key(self) -> &'static str {
        match self {
            AddressLine::Street1 => "street1",
            AddressLine::Street2 => "street2",
        }
    }
}

/// Top-level free-text inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextField {
    FirstName,
    LastName,
    Email,
    DateOfBirth,
}

/// Rejected edit intents. None of them mutate the draft.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("At least one document field is required")]
    LastDocument,
    #[error("Please select a valid {} file", .kind.label())]
    AttachmentMismatch { kind: FileKind, content_type: String },
    #[error("document {0} is not part of this form")]
    UnknownDocument(DocumentId),
}

/// The in-memory draft being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// As typed, `YYYY-MM-DD`.
    pub dob: String,
    pub residential_address: Address,
    pub permanent_address: Address,
    same_as_residential: bool,
    documents: Vec<DocumentEntry>,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationForm {
    /// Canonical empty shape: blank fields, toggle off, a single empty document row.
    pub fn new() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            dob: String::new(),
            residential_address: Address::default(),
            permanent_address: Address::default(),
            same_as_residential: false,
            documents: vec![DocumentEntry::empty()],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True when the draft is blank apart from the (fresh) document row id.
    pub fn is_pristine(&self) -> bool {
        let blank_document = match self.documents.as_slice() {
            [only] => {
                only.file_name.is_empty()
                    && only.file_kind.is_none()
                    && only.file.is_none()
                    && only.uploaded_path.is_none()
            }
            _ => false,
        };

        blank_document
            && self.first_name.is_empty()
            && self.last_name.is_empty()
            && self.email.is_empty()
            && self.dob.is_empty()
            && self.residential_address == Address::default()
            && self.permanent_address == Address::default()
            && !self.same_as_residential
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::FirstName => &self.first_name,
            TextField::LastName => &self.last_name,
            TextField::Email => &self.email,
            TextField::DateOfBirth => &self.dob,
        }
    }

    pub fn set_text(&mut self, field: TextField, value: impl Into<String>) {
        let slot = match field {
            TextField::FirstName => &mut self.first_name,
            TextField::LastName => &mut self.last_name,
            TextField::Email => &mut self.email,
            TextField::DateOfBirth => &mut self.dob,
        };
        *slot = value.into();
    }

    pub fn address(&self, kind: AddressKind) -> &Address {
        match kind {
            AddressKind::Residential => &self.residential_address,
            AddressKind::Permanent => &self.permanent_address,
        }
    }

    pub fn set_address_line(
        &mut self,
        kind: AddressKind,
        line: AddressLine,
        value: impl Into<String>,
    ) {
        let address = match kind {
            AddressKind::Residential => &mut self.residential_address,
            AddressKind::Permanent => &mut self.permanent_address,
        };
        *address.line_mut(line) = value.into();
    }

    pub fn same_as_residential(&self) -> bool {
        self.same_as_residential
    }

    /// Switching the mirror off discards whatever the permanent address held.
    pub fn set_same_as_residential(&mut self, enabled: bool) {
        if self.same_as_residential && !enabled {
            self.permanent_address = Address::default();
        }
        self.same_as_residential = enabled;
    }

    pub fn toggle_same_as_residential(&mut self) {
        self.set_same_as_residential(!self.same_as_residential);
    }

    /// Copy the residential address over the permanent one when mirroring is on.
    pub fn mirror_permanent_address(&mut self) {
        if self.same_as_residential {
            self.permanent_address = self.residential_address.clone();
        }
    }

    pub fn documents(&self) -> &[DocumentEntry] {
        &self.documents
    }

    pub fn document(&self, id: DocumentId) -> Option<&DocumentEntry> {
        self.documents.iter().find(|doc| doc.id == id)
    }

    pub fn document_index(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id == id)
    }

    pub fn add_document(&mut self) -> DocumentId {
        let entry = DocumentEntry::empty();
        let id = entry.id;
        self.documents.push(entry);
        id
    }

    pub fn remove_document(&mut self, id: DocumentId) -> Result<DocumentEntry, DraftError> {
        let index = self
            .document_index(id)
            .ok_or(DraftError::UnknownDocument(id))?;
        if self.documents.len() <= 1 {
            return Err(DraftError::LastDocument);
        }
        Ok(self.documents.remove(index))
    }

    pub fn set_document_name(
        &mut self,
        id: DocumentId,
        name: impl Into<String>,
    ) -> Result<(), DraftError> {
        self.document_mut(id)?.file_name = name.into();
        Ok(())
    }

    pub fn set_document_kind(&mut self, id: DocumentId, kind: FileKind) -> Result<(), DraftError> {
        self.document_mut(id)?.file_kind = Some(kind);
        Ok(())
    }

    /// Attach picked content. When the row already declares a kind, the content type
    /// has to match it or the entry is left exactly as it was.
    pub fn attach_file(&mut self, id: DocumentId, file: FileHandle) -> Result<(), DraftError> {
        let entry = self.document_mut(id)?;
        if let Some(kind) = entry.file_kind {
            if !kind.accepts(&file.content_type) {
                return Err(DraftError::AttachmentMismatch {
                    kind,
                    content_type: file.content_type.essence_str().to_string(),
                });
            }
        }
        entry.file = Some(file);
        Ok(())
    }

    pub(crate) fn record_uploaded_path(&mut self, id: DocumentId, path: String) {
        if let Ok(entry) = self.document_mut(id) {
            entry.uploaded_path = Some(path);
        }
    }

    fn document_mut(&mut self, id: DocumentId) -> Result<&mut DocumentEntry, DraftError> {
        self.documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or(DraftError::UnknownDocument(id))
    }
}
