use chrono::{Local, NaiveDate};
use clap::Args;
use registration_form::config::AppConfig;
use registration_form::error::AppError;
use registration_form::telemetry;
use registration_form::workflows::registration::{
    DraftManifest, FormSession, HttpRegistrationGateway, Notice, NoticeLevel, RegistrationSchema,
    RegistrationWorkflow, SubmissionError, ValidationErrorMap,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// Draft manifest (JSON) describing the form fields and document files
    #[arg(long)]
    pub(crate) manifest: PathBuf,
    /// Date used for the age check (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Draft manifest (JSON) describing the form fields and document files
    #[arg(long)]
    pub(crate) manifest: PathBuf,
    /// Override REGISTRATION_API_URL for this submission
    #[arg(long)]
    pub(crate) api_url: Option<Url>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let ValidateArgs { manifest, today } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let mut draft = DraftManifest::load(&manifest)?;
    let schema = RegistrationSchema::prepare(&mut draft);
    match schema.validate(&draft, today) {
        Ok(()) => {
            println!("{:#}", json!({ "valid": true }));
            Ok(())
        }
        Err(failure) => {
            println!(
                "{:#}",
                json!({
                    "valid": false,
                    "summary": failure.summary(),
                    "errors": error_object(&failure.error_map()),
                })
            );
            Err(SubmissionError::from(failure).into())
        }
    }
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs { manifest, api_url } = args;
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let mut api = config.registration;
    if let Some(url) = api_url {
        api.base_url = url;
    }

    let draft = DraftManifest::load(&manifest)?;
    let gateway = HttpRegistrationGateway::new(&api)?;
    let workflow = RegistrationWorkflow::new(Arc::new(gateway));

    let mut session = FormSession::from_draft(draft);
    let outcome = workflow.submit(session.draft_mut()).await;
    let notice = session.record(&outcome);
    print_notice(&notice);
    print_errors(session.errors());

    outcome.map(|_| ()).map_err(AppError::from)
}

pub(crate) fn error_object(errors: &ValidationErrorMap) -> Value {
    let object: Map<String, Value> = errors
        .iter()
        .map(|(path, message)| (path.to_string(), Value::from(message)))
        .collect();
    Value::Object(object)
}

pub(crate) fn print_notice(notice: &Notice) {
    let label = match notice.level {
        NoticeLevel::Success => "success",
        NoticeLevel::Error => "error",
    };
    println!("[{label}] {}", notice.message);
}

pub(crate) fn print_errors(errors: &ValidationErrorMap) {
    for (path, message) in errors.iter() {
        println!("  - {path}: {message}");
    }
}
