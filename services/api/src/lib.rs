mod cli;
mod commands;
mod demo;
mod server;
mod stub;

use registration_form::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
