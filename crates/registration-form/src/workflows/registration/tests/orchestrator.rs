use super::common::*;
use crate::workflows::registration::domain::{FileKind, TextField};
use crate::workflows::registration::fields::FieldPath;
use crate::workflows::registration::gateway::{TransportFailure, GENERIC_FAILURE_MESSAGE};
use crate::workflows::registration::orchestrator::{
    RegistrationWorkflow, SubmissionError, WorkflowPhase, DEFAULT_SUCCESS_MESSAGE,
};
use crate::workflows::registration::schema::MINIMUM_DOCUMENTS_MESSAGE;
use std::sync::Arc;
use tokio::sync::Notify;

#[tokio::test]
async fn successful_submission_uploads_registers_and_resets() {
    let gateway = Arc::new(FakeGateway::accepting("User registered successfully"));
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();
    let residential = draft.residential_address.clone();
    let ids: Vec<_> = draft.documents().iter().map(|doc| doc.id).collect();

    let receipt = workflow
        .submit_on(&mut draft, today())
        .await
        .expect("submission succeeds");

    assert_eq!(receipt.notification(), "User registered successfully");
    assert!(draft.is_pristine(), "draft reset after success");
    assert_eq!(workflow.phase(), WorkflowPhase::Succeeded);
    assert!(!workflow.is_loading());

    let calls = gateway.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.contains(&GatewayCall::Image("face.png".to_string())));
    assert!(calls.contains(&GatewayCall::Document("passport.pdf".to_string())));

    let registrations = gateway.register_calls();
    assert_eq!(registrations.len(), 1);
    let payload = &registrations[0];
    assert_eq!(payload.permanent_address, residential);
    assert!(payload.same_as_residential);
    assert_eq!(payload.first_name, "Jane");
    assert_eq!(payload.documents.len(), 2);
    assert_eq!(payload.documents[0].id, ids[0]);
    assert_eq!(payload.documents[0].file_kind, FileKind::Image);
    assert_eq!(payload.documents[0].uploaded_path, "uploads/images/face.png");
    assert_eq!(payload.documents[1].id, ids[1]);
    assert_eq!(payload.documents[1].file_name, "passport");
    assert_eq!(
        payload.documents[1].uploaded_path,
        "uploads/documents/passport.pdf"
    );
    assert_eq!(receipt.documents, payload.documents);
}

#[tokio::test]
async fn missing_server_message_uses_default_notice() {
    let gateway = Arc::new(FakeGateway::default());
    let workflow = RegistrationWorkflow::new(gateway);
    let mut draft = valid_draft();

    let receipt = workflow
        .submit_on(&mut draft, today())
        .await
        .expect("submission succeeds");
    assert_eq!(receipt.notification(), DEFAULT_SUCCESS_MESSAGE);
}

#[tokio::test]
async fn validation_failure_makes_no_network_calls() {
    let gateway = Arc::new(FakeGateway::default());
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();
    draft.set_text(TextField::Email, "");

    let err = workflow
        .submit_on(&mut draft, today())
        .await
        .expect_err("validation fails");

    match &err {
        SubmissionError::Validation(failure) => {
            assert_eq!(
                failure.error_map().get(&TextField::Email.into()),
                Some("Email is required")
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(err.notification(), "Please fill in all required fields");
    assert!(gateway.calls().is_empty());
    assert!(!draft.is_pristine());
    assert_eq!(workflow.phase(), WorkflowPhase::Failed);
}

#[tokio::test]
async fn single_document_surfaces_minimum_count_message() {
    let gateway = Arc::new(FakeGateway::default());
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();
    let second = draft.documents()[1].id;
    draft.remove_document(second).expect("two rows present");
    draft.set_text(TextField::LastName, "");

    let err = workflow
        .submit_on(&mut draft, today())
        .await
        .expect_err("validation fails");

    assert_eq!(err.notification(), MINIMUM_DOCUMENTS_MESSAGE);
    if let SubmissionError::Validation(failure) = &err {
        assert!(failure.error_map().contains(&FieldPath::Documents));
        assert!(failure.error_map().contains(&TextField::LastName.into()));
    }
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn rejected_upload_skips_registration_and_keeps_draft() {
    let gateway = Arc::new(FakeGateway {
        document_failure: Some(TransportFailure::rejected(
            "document upload",
            415,
            r#"{"error":"Only PDF files are allowed"}"#,
        )),
        ..FakeGateway::default()
    });
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();

    let err = workflow
        .submit_on(&mut draft, today())
        .await
        .expect_err("upload rejected");

    assert!(matches!(err, SubmissionError::Transport(_)));
    assert_eq!(err.notification(), "Only PDF files are allowed");
    assert!(gateway.register_calls().is_empty());
    assert_eq!(draft.first_name, "Jane");
    assert_eq!(draft.documents().len(), 2);
    assert!(draft.documents().iter().all(|doc| doc.uploaded_path.is_none()));
    assert!(!workflow.is_loading());
}

#[tokio::test]
async fn rejected_registration_keeps_draft_for_manual_retry() {
    let gateway = Arc::new(FakeGateway {
        register_failure: Some(TransportFailure::rejected(
            "registration",
            409,
            r#"{"message":"User already registered"}"#,
        )),
        ..FakeGateway::default()
    });
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();

    let err = workflow
        .submit_on(&mut draft, today())
        .await
        .expect_err("registration rejected");

    assert_eq!(err.notification(), "User already registered");
    assert_eq!(gateway.register_calls().len(), 1);
    assert!(!draft.is_pristine());
    assert_eq!(
        draft.documents()[0].uploaded_path.as_deref(),
        Some("uploads/images/face.png")
    );

    // Nothing retries on its own; a fresh submit uploads again.
    assert_eq!(gateway.calls().len(), 3);
    let _ = workflow.submit_on(&mut draft, today()).await;
    assert_eq!(gateway.calls().len(), 6);
}

#[tokio::test]
async fn network_failure_falls_back_to_generic_notice() {
    let gateway = Arc::new(FakeGateway {
        image_failure: Some(TransportFailure::network(
            "image upload",
            "connection refused",
        )),
        ..FakeGateway::default()
    });
    let workflow = RegistrationWorkflow::new(gateway);
    let mut draft = valid_draft();

    let err = workflow
        .submit_on(&mut draft, today())
        .await
        .expect_err("network failure");
    assert_eq!(err.notification(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn concurrent_submit_is_refused_while_in_flight() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gateway = Arc::new(FakeGateway {
        hold: Some(Hold {
            started: started.clone(),
            release: release.clone(),
        }),
        ..FakeGateway::default()
    });
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut first = valid_draft();
    let mut second = valid_draft();
    let phases = workflow.subscribe();

    let (outcome, _) = tokio::join!(workflow.submit_on(&mut first, today()), async {
        started.notified().await;
        assert_eq!(*phases.borrow(), WorkflowPhase::Submitting);
        assert!(workflow.is_loading());

        let refused = workflow.submit_on(&mut second, today()).await;
        assert_eq!(refused, Err(SubmissionError::InProgress));
        assert!(!second.is_pristine(), "refused draft untouched");

        release.notify_one();
    });

    outcome.expect("first submission completes");
    assert!(first.is_pristine());
    assert_eq!(gateway.register_calls().len(), 1);
    assert_eq!(workflow.phase(), WorkflowPhase::Succeeded);
    assert!(!workflow.is_loading());
}

#[tokio::test]
async fn subscribers_see_the_terminal_phase_until_the_next_attempt() {
    let gateway = Arc::new(FakeGateway::default());
    let workflow = RegistrationWorkflow::new(gateway);
    let mut phases = workflow.subscribe();

    let mut blank = valid_draft();
    blank.set_text(TextField::FirstName, "");
    let _ = workflow.submit_on(&mut blank, today()).await;
    assert!(phases.has_changed().expect("sender alive"));
    assert_eq!(*phases.borrow_and_update(), WorkflowPhase::Failed);

    let mut draft = valid_draft();
    workflow
        .submit_on(&mut draft, today())
        .await
        .expect("submission succeeds");
    assert_eq!(*phases.borrow_and_update(), WorkflowPhase::Succeeded);
    assert!(!workflow.is_loading());
}

#[tokio::test]
async fn abandoned_attempt_returns_to_idle_and_frees_the_workflow() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gateway = Arc::new(FakeGateway {
        hold: Some(Hold {
            started: started.clone(),
            release: release.clone(),
        }),
        ..FakeGateway::default()
    });
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();

    tokio::select! {
        _ = workflow.submit_on(&mut draft, today()) => panic!("held attempt cannot finish"),
        _ = started.notified() => {}
    }

    assert_eq!(workflow.phase(), WorkflowPhase::Idle);
    assert!(!workflow.is_loading());
    assert!(!draft.is_pristine(), "abandoned draft is not reset");

    release.notify_one();
    workflow
        .submit_on(&mut draft, today())
        .await
        .expect("guard released by the abandoned attempt");
    assert_eq!(workflow.phase(), WorkflowPhase::Succeeded);
}

#[tokio::test]
async fn registered_date_of_birth_is_the_trimmed_value() {
    let gateway = Arc::new(FakeGateway::default());
    let workflow = RegistrationWorkflow::new(gateway.clone());
    let mut draft = valid_draft();
    let dob = draft.dob.clone();
    draft.set_text(TextField::DateOfBirth, format!("  {dob}\t"));

    workflow
        .submit_on(&mut draft, today())
        .await
        .expect("padded date still validates");

    let registrations = gateway.register_calls();
    assert_eq!(registrations[0].dob, dob);
}
