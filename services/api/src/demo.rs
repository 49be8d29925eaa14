use crate::commands::{parse_date, print_errors, print_notice};
use crate::stub;
use chrono::{Local, Months, NaiveDate};
use clap::Args;
use registration_form::config::RegistrationApiConfig;
use registration_form::error::AppError;
use registration_form::workflows::registration::{
    AddressKind, AddressLine, FileHandle, FileKind, FormSession, HttpRegistrationGateway,
    Notice, RegistrationGateway, RegistrationWorkflow, TextField, DATE_FORMAT,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the date used for the age check (defaults to today).
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Submit the same applicant twice to show the duplicate rejection.
    #[arg(long)]
    pub(crate) repeat: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, repeat } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let (base_url, state) = stub::spawn_local().await?;
    println!("Registration form demo");
    println!("Stand-in registration service listening on {base_url}");

    let gateway = HttpRegistrationGateway::new(&RegistrationApiConfig::new(base_url))?;
    let workflow = RegistrationWorkflow::new(Arc::new(gateway));
    let mut session = FormSession::new();

    println!("\n1. Submitting the blank form");
    submit(&workflow, &mut session, today).await;

    println!("\n2. Filling in the applicant and two documents");
    fill_sample(&mut session, today);
    println!(
        "   remaining field errors after edits: {}",
        session.errors().len()
    );
    submit(&workflow, &mut session, today).await;

    let draft = session.draft();
    println!("\nForm after submission");
    println!("  pristine: {}", draft.is_pristine());
    println!("  document rows: {}", draft.documents().len());
    println!(
        "  permanent address same as residential: {}",
        draft.same_as_residential()
    );
    println!(
        "  uploads stored: {}, registrations stored: {}",
        state.uploads().len(),
        state.registrations().len()
    );

    if repeat {
        println!("\n3. Registering the same applicant again");
        fill_sample(&mut session, today);
        submit(&workflow, &mut session, today).await;
    }

    Ok(())
}

async fn submit<G: RegistrationGateway>(
    workflow: &RegistrationWorkflow<G>,
    session: &mut FormSession,
    today: NaiveDate,
) {
    let outcome = workflow.submit_on(session.draft_mut(), today).await;
    let notice = session.record(&outcome);
    print_notice(&notice);
    print_errors(session.errors());
}

fn fill_sample(session: &mut FormSession, today: NaiveDate) {
    let dob = today
        .checked_sub_months(Months::new(25 * 12))
        .unwrap_or(today)
        .format(DATE_FORMAT)
        .to_string();

    session.edit_text(TextField::FirstName, "Jane");
    session.edit_text(TextField::LastName, "Doe");
    session.edit_text(TextField::Email, "jane.doe@example.com");
    session.edit_text(TextField::DateOfBirth, dob);
    session.edit_address(AddressKind::Residential, AddressLine::Street1, "12 Oak St");
    session.edit_address(AddressKind::Residential, AddressLine::Street2, "Apt 4");
    if !session.draft().same_as_residential() {
        session.toggle_same_as_residential();
    }

    let rows: Vec<_> = session.draft().documents().iter().map(|doc| doc.id).collect();
    let Some(&photo) = rows.first() else {
        return;
    };
    let passport = match rows.get(1) {
        Some(id) => *id,
        None => session.add_document(),
    };

    let attachments = [
        (
            photo,
            "photo",
            FileKind::Image,
            FileHandle::new("photo.png", mime::IMAGE_PNG, b"\x89PNG\r\n".to_vec()),
        ),
        (
            passport,
            "passport",
            FileKind::Pdf,
            FileHandle::new("passport.pdf", mime::APPLICATION_PDF, b"%PDF-1.7".to_vec()),
        ),
    ];
    for (id, name, kind, file) in attachments {
        let outcome = session
            .rename_document(id, name)
            .and_then(|_| session.choose_document_kind(id, kind))
            .and_then(|_| session.attach_document_file(id, file));
        if let Err(err) = outcome {
            print_notice(&Notice::from(&err));
        }
    }
}
