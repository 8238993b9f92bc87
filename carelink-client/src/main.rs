use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use carelink_client::domains::clinical::{FileUpload, MAX_UPLOAD_BYTES};
use carelink_client::{ApiError, ValidationError, build_client};
use carelink_config::ConfigLoader;
use carelink_model::{AccountKind, SymptomAnalysisRequest, VisitNoteRequest};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use log::LevelFilter;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use zeroize::Zeroizing;

#[derive(Parser, Debug)]
#[command(name = "carelink", version)]
#[command(about = "Command-line client for the carelink clinical API")]
struct Cli {
    /// Path to carelink.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging for carelink crates (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in; the password is read from CARELINK_PASSWORD or stdin
    Login {
        /// Email address, or patient id with --patient
        identity: String,
        /// Use the patient login flow
        #[arg(long)]
        patient: bool,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Check that the backend is reachable
    Health,
    /// Upload a test report scan for analysis
    UploadReport { patient: String, file: PathBuf },
    /// Upload a prescription scan for analysis
    UploadPrescription { patient: String, file: PathBuf },
    /// Ask for a preliminary symptom analysis
    AnalyzeSymptoms { description: String },
    /// Generate a structured visit note from free-form input
    VisitNote { patient: String, input: String },
}

fn init_logger(verbose: bool) {
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
        return;
    }

    let mut builder = Builder::new();
    builder.target(Target::Stderr).filter_level(LevelFilter::Warn);
    if verbose {
        builder
            .filter_module("carelink", LevelFilter::Debug)
            .filter_module("carelink_client", LevelFilter::Debug)
            .filter_module("carelink_config", LevelFilter::Debug);
    }
    builder.init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = run(cli).await;
    if let Err(e) = &result
        && matches!(e.downcast_ref::<ApiError>(), Some(ApiError::SessionExpired))
    {
        eprintln!("Your session has expired. Run `carelink login` to sign in again.");
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_config_path(path);
    }
    let load = loader.load().context("failed to load configuration")?;
    for warning in &load.warnings.items {
        match &warning.hint {
            Some(hint) => log::warn!("[Config] {} ({})", warning.message, hint),
            None => log::warn!("[Config] {}", warning.message),
        }
    }

    let client = build_client(&load.config).context("failed to build HTTP client")?;

    match cli.command {
        Command::Login { identity, patient } => {
            let kind = if patient {
                AccountKind::Patient
            } else {
                AccountKind::Provider
            };
            let password = read_password().await?;
            let user = client
                .session()
                .login(&identity, &password, kind)
                .await
                .context("login failed")?;
            print_json(&user)
        }
        Command::Logout => {
            if let Some(notice) = client.session().logout().await {
                // The runtime would drop the notification on exit
                let _ = notice.await;
            }
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => match client.session().current_user().await {
            Some(user) => print_json(&user),
            None => bail!("not signed in"),
        },
        Command::Health => {
            client.health().await.context("backend health check failed")?;
            print_json(&serde_json::json!({ "status": "ok" }))
        }
        Command::UploadReport { patient, file } => {
            let upload = read_upload(&file).await?;
            let analysis = client.upload_test_report(&patient, upload).await?;
            print_json(&analysis)
        }
        Command::UploadPrescription { patient, file } => {
            let upload = read_upload(&file).await?;
            let analysis = client.upload_prescription(&patient, upload).await?;
            print_json(&analysis)
        }
        Command::AnalyzeSymptoms { description } => {
            let body = SymptomAnalysisRequest {
                symptom_description: description,
                patient_context: None,
            };
            print_json(&client.analyze_symptoms(&body).await?)
        }
        Command::VisitNote { patient, input } => {
            let body = VisitNoteRequest {
                doctor_input: input,
                patient_context: None,
            };
            print_json(&client.generate_visit_note(&patient, &body).await?)
        }
    }
}

async fn read_password() -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var("CARELINK_PASSWORD")
        && !password.is_empty()
    {
        return Ok(Zeroizing::new(password));
    }

    let mut line = Zeroizing::new(String::new());
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read password from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err(anyhow!(
            "no password given; set CARELINK_PASSWORD or pipe it on stdin"
        ));
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

/// Oversized files are refused from their metadata, before any read.
async fn read_upload(path: &Path) -> Result<FileUpload> {
    let size = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to inspect {}", path.display()))?
        .len();
    if size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        }
        .into());
    }

    FileUpload::from_path(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
