use crate::cli::ServeArgs;
use crate::stub::{self, StubState};
use registration_form::config::AppConfig;
use registration_form::error::AppError;
use registration_form::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let state = StubState::default();
    let app = stub::router(state.clone(), &config.registration);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    state.mark_ready();

    info!(
        ?config.environment,
        %addr,
        image_upload = %config.registration.image_upload_path,
        document_upload = %config.registration.document_upload_path,
        submit = %config.registration.submit_path,
        "registration endpoint stand-in ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
