//! SOAR Forms CLI
//!
//! Usage:
//!   cargo run --features cli --bin soar-forms -- inspect forms/phishing.xml
//!   cargo run --features cli --bin soar-forms -- submit forms/phishing.xml \
//!     --values values.json \
//!     --file evidence=./mail.eml
//!   cargo run --features cli --bin soar-forms -- ping
//!
//! The case API is configured through `CASE_API_*` variables (a `.env` file
//! is honoured).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;

use soar_forms::forms::xml;
use soar_forms::render::{ControlKind, FormSession, RenderContext, Renderer};
use soar_forms::submit::{FileStatus, FileUpload, SubmissionEngine};
use soar_forms::{CaseApiClient, CaseApiConfig, FormDocument};

#[derive(Parser, Debug)]
#[command(name = "soar-forms")]
#[command(about = "Inspect stored forms and submit them to the case API")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the controls a stored form renders to
    Inspect {
        /// Form XML file
        form: PathBuf,
    },
    /// Fill a stored form and submit it
    Submit {
        /// Form XML file
        form: PathBuf,

        /// JSON object of field key to value
        #[arg(long)]
        values: Option<PathBuf>,

        /// File inputs in format key=path (can be specified multiple times)
        #[arg(long = "file", value_parser = parse_key_val)]
        files: Vec<(String, PathBuf)>,
    },
    /// Check the case API connection
    Ping,
}

/// Parse key=path pairs from command line
fn parse_key_val(s: &str) -> Result<(String, PathBuf), String> {
    let (key, path) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid key=path pair: {}", s))?;
    Ok((key.to_string(), PathBuf::from(path)))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Inspect { form } => inspect(&form),
        Command::Submit {
            form,
            values,
            files,
        } => submit(&form, values.as_deref(), &files).await,
        Command::Ping => ping().await,
    }
}

fn load_form(path: &Path) -> Result<FormDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    xml::decode(&raw).with_context(|| format!("decoding {}", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
    let doc = load_form(path)?;
    println!("{} ({})", doc.name, doc.label);
    if !doc.tags.is_empty() {
        println!("tags: {}", doc.tags.join(", "));
    }

    let renderer = Renderer::new(RenderContext::Viewer);
    for control in renderer.render(&doc) {
        let marker = if control.required { "*" } else { " " };
        println!(
            "{} {:<20} {:<24} {}",
            marker,
            control.key,
            control.label,
            describe(&control.kind)
        );
    }
    Ok(())
}

fn describe(kind: &ControlKind) -> String {
    match kind {
        ControlKind::Header { level } => format!("header h{}", level.level()),
        ControlKind::Select { options, .. } => format!("select [{}]", options.len()),
        ControlKind::Table { header, rows } => {
            format!("table {} cols x {} rows", header.len(), rows.len())
        }
        ControlKind::CurrentDate { display, .. } => format!("current date {}", display),
        ControlKind::PasswordField { requirements, .. } if !requirements.is_empty() => {
            format!("password ({})", requirements.join("; "))
        }
        other => serde_json::to_value(other)
            .ok()
            .and_then(|v| v.get("control").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default(),
    }
}

async fn submit(path: &Path, values: Option<&Path>, files: &[(String, PathBuf)]) -> Result<()> {
    let doc = load_form(path)?;
    let mut session = FormSession::new(&doc, Local::now().date_naive());

    if let Some(values_path) = values {
        let raw = std::fs::read_to_string(values_path)
            .with_context(|| format!("reading {}", values_path.display()))?;
        let parsed: serde_json::Map<String, Value> =
            serde_json::from_str(&raw).context("values file must be a JSON object")?;
        for (key, value) in parsed {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            session.set_value(&key, text)?;
            if !session.blur(&key)? {
                tracing::warn!(key = %key, "value does not pass field validation");
            }
        }
    }

    for (key, file_path) in files {
        session.attach_file(key, read_upload(file_path)?)?;
    }

    let missing = session.missing_required();
    if !missing.is_empty() {
        bail!("required fields have no value: {}", missing.join(", "));
    }

    let config = CaseApiConfig::from_env()?;
    let engine = SubmissionEngine::new(CaseApiClient::new(config)?);
    let report = engine.submit(&doc, session.values()).await?;

    println!("container {}", report.container_id);
    for file in &report.files {
        match &file.status {
            FileStatus::Uploaded { hash, .. } => println!("  {} uploaded ({})", file.file_name, hash),
            FileStatus::UploadFailed { error } => println!("  {} failed: {}", file.file_name, error),
            FileStatus::ArtifactFailed { error, .. } => {
                println!("  {} stored, artifact failed: {}", file.file_name, error)
            }
        }
    }
    if !report.is_success() {
        bail!("form data artifact was not created");
    }
    println!("submitted");
    Ok(())
}

fn read_upload(path: &Path) -> Result<FileUpload> {
    let content = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut upload = FileUpload::new(file_name, content_type_for(path), content);
    if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
        upload = upload.with_last_modified(DateTime::<Utc>::from(modified));
    }
    Ok(upload)
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "eml" => "message/rfc822",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

async fn ping() -> Result<()> {
    let config = CaseApiConfig::from_env()?;
    let base = config.base_url.clone();
    let client = CaseApiClient::new(config)?;
    let version = client
        .version()
        .await
        .with_context(|| format!("connecting to {}", base))?;
    println!("Connection successful: Version {}", version);
    Ok(())
}
