use crate::commands::{run_submit, run_validate, SubmitArgs, ValidateArgs};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use registration_form::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Registration Form",
    about = "Validate, submit, and demo user registrations from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the local registration endpoint stand-in (default command)
    Serve(ServeArgs),
    /// Validate a draft manifest without contacting the registration service
    Validate(ValidateArgs),
    /// Upload a draft manifest's documents and register it
    Submit(SubmitArgs),
    /// Run an end-to-end registration against an in-process stand-in
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
        Command::Submit(args) => run_submit(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
