use crate::infra::{open_store, validate_submission};
use crate::server;
use clap::{Args, Parser, Subcommand};
use employee_intake::config::AppConfig;
use employee_intake::error::AppError;
use employee_intake::telemetry;
use employee_intake::workflows::registration::EmployeeSubmission;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Employee Intake",
    about = "Validate, register and notify about employee records",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run the active validation rules against a submission file
    Validate(ValidateArgs),
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

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// JSON file holding one employee submission
    #[arg(long)]
    pub(crate) file: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Validate(args) => run_validate(args),
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let raw = std::fs::read_to_string(&args.file)?;
    let submission: EmployeeSubmission = serde_json::from_str(&raw)?;
    let db = open_store(&config)?;
    let summary = validate_submission(db, config.scripting, submission)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
