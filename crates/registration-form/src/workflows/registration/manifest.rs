use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::domain::{Address, DraftError, FileHandle, FileKind, RegistrationForm};

/// A draft described on disk: form fields plus document rows pointing at files.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftManifest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "dateOfBirth")]
    pub dob: String,
    #[serde(default)]
    pub residential_address: Address,
    #[serde(default)]
    pub permanent_address: Address,
    #[serde(default)]
    pub same_as_residential: bool,
    #[serde(default)]
    pub documents: Vec<ManifestDocument>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    #[serde(default)]
    pub file_name: String,
    #[serde(default, alias = "fileType")]
    pub file_kind: Option<FileKind>,
    /// Relative paths resolve against the manifest's directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid draft manifest {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("document {index}: {source}")]
    Attachment { index: usize, source: DraftError },
}

impl DraftManifest {
    pub fn load(path: &Path) -> Result<RegistrationForm, ManifestError> {
        let raw = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: DraftManifest =
            serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.into_draft(base_dir)
    }

    /// Build the draft through the same intents the form uses, so a file whose
    /// content type contradicts the declared kind is refused here too.
    pub fn into_draft(self, base_dir: &Path) -> Result<RegistrationForm, ManifestError> {
        let mut draft = RegistrationForm::new();
        draft.first_name = self.first_name;
        draft.last_name = self.last_name;
        draft.email = self.email;
        draft.dob = self.dob;
        draft.residential_address = self.residential_address;
        draft.permanent_address = self.permanent_address;
        draft.set_same_as_residential(self.same_as_residential);

        for (index, document) in self.documents.into_iter().enumerate() {
            let id = match draft.documents().get(index) {
                Some(existing) => existing.id,
                None => draft.add_document(),
            };
            let attach = |source| ManifestError::Attachment { index, source };

            draft
                .set_document_name(id, document.file_name)
                .map_err(attach)?;
            if let Some(kind) = document.file_kind {
                draft.set_document_kind(id, kind).map_err(attach)?;
            }
            if let Some(relative) = document.path {
                let file = read_file(&base_dir.join(relative))?;
                draft.attach_file(id, file).map_err(attach)?;
            }
        }

        Ok(draft)
    }
}

fn read_file(path: &Path) -> Result<FileHandle, ManifestError> {
    let bytes = fs::read(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    Ok(FileHandle::new(name, content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &Path, name: &str, bytes: &[u8]) {
        let mut file = fs::File::create(dir.join(name)).expect("create fixture");
        file.write_all(bytes).expect("write fixture");
    }

    #[test]
    fn loads_fields_and_attaches_files_relative_to_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "face.png", b"\x89PNG");
        write(dir.path(), "passport.pdf", b"%PDF-1.7");
        write(
            dir.path(),
            "draft.json",
            br#"{
                "firstName": "Jane",
                "lastName": "Doe",
                "email": "jane@x.com",
                "dateOfBirth": "1990-04-02",
                "residentialAddress": { "street1": "12 Oak St" },
                "sameAsResidential": true,
                "documents": [
                    { "fileName": "photo", "fileKind": "image", "path": "face.png" },
                    { "fileName": "passport", "fileType": "pdf", "path": "passport.pdf" }
                ]
            }"#,
        );

        let draft = DraftManifest::load(&dir.path().join("draft.json")).expect("manifest loads");
        assert_eq!(draft.first_name, "Jane");
        assert_eq!(draft.dob, "1990-04-02");
        assert!(draft.same_as_residential());
        assert_eq!(draft.documents().len(), 2);

        let photo = &draft.documents()[0];
        assert_eq!(photo.file_kind, Some(FileKind::Image));
        let file = photo.file.as_ref().expect("photo attached");
        assert_eq!(file.content_type.essence_str(), "image/png");
        assert_eq!(file.name, "face.png");

        let passport = &draft.documents()[1];
        assert_eq!(
            passport
                .file
                .as_ref()
                .expect("pdf attached")
                .content_type
                .essence_str(),
            "application/pdf"
        );
    }

    #[test]
    fn refuses_file_that_contradicts_declared_kind() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "notes.txt", b"plain text");
        write(
            dir.path(),
            "draft.json",
            br#"{ "documents": [ { "fileName": "scan", "fileKind": "pdf", "path": "notes.txt" } ] }"#,
        );

        match DraftManifest::load(&dir.path().join("draft.json")) {
            Err(ManifestError::Attachment {
                index: 0,
                source: DraftError::AttachmentMismatch { kind, .. },
            }) => assert_eq!(kind, FileKind::Pdf),
            other => panic!("expected attachment mismatch, got {other:?}"),
        }
    }

    #[test]
    fn reports_missing_files_with_their_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "draft.json",
            br#"{ "documents": [ { "fileName": "scan", "path": "missing.pdf" } ] }"#,
        );

        match DraftManifest::load(&dir.path().join("draft.json")) {
            Err(ManifestError::Read { path, .. }) => assert!(path.ends_with("missing.pdf")),
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
