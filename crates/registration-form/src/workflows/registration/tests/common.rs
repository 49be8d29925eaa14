use std::sync::{Arc, Mutex};

use chrono::{Months, NaiveDate};
use tokio::sync::Notify;

use crate::workflows::registration::domain::{
    AddressKind, AddressLine, FileHandle, FileKind, RegistrationForm, TextField,
};
use crate::workflows::registration::gateway::{
    RegistrationGateway, RegistrationPayload, RegistrationReceipt, TransportFailure,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).expect("valid date")
}

pub(super) fn born_before(today: NaiveDate, years: u32, months: u32) -> String {
    today
        .checked_sub_months(Months::new(years * 12 + months))
        .expect("representable birth date")
        .format("%Y-%m-%d")
        .to_string()
}

pub(super) fn png(name: &str) -> FileHandle {
    FileHandle::new(name, mime::IMAGE_PNG, b"\x89PNG\r\n".to_vec())
}

pub(super) fn pdf(name: &str) -> FileHandle {
    FileHandle::new(name, mime::APPLICATION_PDF, b"%PDF-1.7".to_vec())
}

pub(super) fn text_file(name: &str) -> FileHandle {
    FileHandle::new(name, mime::TEXT_PLAIN, b"hello".to_vec())
}

/// Jane Doe, 19, same-as-residential on, one photo and one PDF.
pub(super) fn valid_draft() -> RegistrationForm {
    let mut draft = RegistrationForm::new();
    draft.set_text(TextField::FirstName, "Jane");
    draft.set_text(TextField::LastName, "Doe");
    draft.set_text(TextField::Email, "jane@x.com");
    draft.set_text(TextField::DateOfBirth, born_before(today(), 19, 0));
    draft.set_address_line(AddressKind::Residential, AddressLine::Street1, "12 Oak St");
    draft.set_same_as_residential(true);

    let photo = draft.documents()[0].id;
    draft.set_document_name(photo, "photo").expect("row exists");
    draft
        .set_document_kind(photo, FileKind::Image)
        .expect("row exists");
    draft.attach_file(photo, png("face.png")).expect("png is an image");

    let passport = draft.add_document();
    draft.set_document_name(passport, "passport").expect("row exists");
    draft
        .set_document_kind(passport, FileKind::Pdf)
        .expect("row exists");
    draft
        .attach_file(passport, pdf("passport.pdf"))
        .expect("pdf matches");

    draft
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GatewayCall {
    Image(String),
    Document(String),
    Register(RegistrationPayload),
}

/// Pauses `register` until released so a test can look at the in-flight state.
pub(super) struct Hold {
    pub(super) started: Arc<Notify>,
    pub(super) release: Arc<Notify>,
}

#[derive(Default)]
pub(super) struct FakeGateway {
    pub(super) calls: Mutex<Vec<GatewayCall>>,
    pub(super) image_failure: Option<TransportFailure>,
    pub(super) document_failure: Option<TransportFailure>,
    pub(super) register_failure: Option<TransportFailure>,
    pub(super) register_message: Option<String>,
    pub(super) hold: Option<Hold>,
}

impl FakeGateway {
    pub(super) fn accepting(message: &str) -> Self {
        Self {
            register_message: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().expect("calls mutex").clone()
    }

    pub(super) fn register_calls(&self) -> Vec<RegistrationPayload> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Register(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().expect("calls mutex").push(call);
    }
}

impl RegistrationGateway for FakeGateway {
    async fn upload_image(&self, file: &FileHandle) -> Result<String, TransportFailure> {
        self.record(GatewayCall::Image(file.name.clone()));
        match &self.image_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(format!("uploads/images/{}", file.name)),
        }
    }

    async fn upload_document(&self, file: &FileHandle) -> Result<String, TransportFailure> {
        self.record(GatewayCall::Document(file.name.clone()));
        match &self.document_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(format!("uploads/documents/{}", file.name)),
        }
    }

    async fn register(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationReceipt, TransportFailure> {
        if let Some(hold) = &self.hold {
            hold.started.notify_one();
            hold.release.notified().await;
        }
        self.record(GatewayCall::Register(payload.clone()));
        match &self.register_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(RegistrationReceipt {
                status: 200,
                message: self.register_message.clone(),
            }),
        }
    }
}
