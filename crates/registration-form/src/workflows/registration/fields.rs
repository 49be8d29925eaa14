use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use super::domain::{AddressKind, AddressLine, TextField};

/// Sub-fields of a document row that carry their own errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentField {
    FileName,
    FileKind,
    File,
}

impl DocumentField {
    pub const fn key(self) -> &'static str {
        match self {
            DocumentField::FileName => "fileName",
            DocumentField::FileKind => "fileType",
            DocumentField::File => "file",
        }
    }
}

/// Every location in the form an error can be attached to.
///
/// Renders as the dotted/indexed path the presentation layer keys its messages by,
/// e.g. `residentialAddress.street1` or `documents[1].fileName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldPath {
    Text(TextField),
    Address {
        kind: AddressKind,
        line: AddressLine,
    },
    /// The document list as a whole (minimum count).
    Documents,
    Document {
        index: usize,
        field: DocumentField,
    },
}

impl FieldPath {
    pub const fn address(kind: AddressKind, line: AddressLine) -> Self {
        FieldPath::Address { kind, line }
    }

    pub const fn document(index: usize, field: DocumentField) -> Self {
        FieldPath::Document { index, field }
    }

    pub fn is_permanent_address(&self) -> bool {
        matches!(
            self,
            FieldPath::Address {
                kind: AddressKind::Permanent,
                ..
            }
        )
    }
}

impl From<TextField> for FieldPath {
    fn from(field: TextField) -> Self {
        FieldPath::Text(field)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Text(TextField::FirstName) => f.write_str("firstName"),
            FieldPath::Text(TextField::LastName) => f.write_str("lastName"),
            FieldPath::Text(TextField::Email) => f.write_str("email"),
            FieldPath::Text(TextField::DateOfBirth) => f.write_str("dob"),
            FieldPath::Address { kind, line } => write!(f, "{}.{}", kind.key(), line.key()),
            FieldPath::Documents => f.write_str("documents"),
            FieldPath::Document { index, field } => {
                write!(f, "documents[{index}].{}", field.key())
            }
        }
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Field-keyed messages from the latest validation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrorMap(BTreeMap<FieldPath, String>);

impl ValidationErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from violations in the order they were found; a later message for the
    /// same path replaces an earlier one.
    pub fn from_violations<'a, I>(violations: I) -> Self
    where
        I: IntoIterator<Item = &'a Violation>,
    {
        let mut map = BTreeMap::new();
        for violation in violations {
            map.insert(violation.path, violation.message.clone());
        }
        Self(map)
    }

    pub fn get(&self, path: &FieldPath) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &FieldPath) -> bool {
        self.0.contains_key(path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &str)> {
        self.0.iter().map(|(path, message)| (path, message.as_str()))
    }

    pub fn clear(&mut self, path: &FieldPath) -> Option<String> {
        self.0.remove(path)
    }

    pub fn clear_where<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&FieldPath) -> bool,
    {
        self.0.retain(|path, _| !predicate(path));
    }
}

/// A single rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: FieldPath,
    pub message: String,
}

impl Violation {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}
