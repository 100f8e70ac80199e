//! CLI commands implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::HttpTransport;
use crate::config::{expand_path, Config};
use crate::models::{schema, AadhaarSide, DocumentSlot, DocumentType, EnrollmentFields};
use crate::services::{EnrollmentSession, InsertOutcome, RecordState, SaveKind};

#[derive(Parser)]
#[command(name = "docintake")]
#[command(about = "Student document intake and extraction pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init,

    /// Create or inspect the enrollment student record
    Student {
        #[command(subcommand)]
        command: StudentCommands,
    },

    /// Upload a document file for a student
    Upload {
        /// Student the document belongs to
        student_id: String,
        /// Document type (e.g. marksheet, aadhaar, birth-certificate)
        document_type: String,
        /// File to upload
        file: PathBuf,
        /// Aadhaar side: front or back
        #[arg(long)]
        side: Option<String>,
    },

    /// Show the document box state for a student
    Documents {
        student_id: String,
    },

    /// Manage the structured record stored for a document type
    Record {
        #[command(subcommand)]
        command: RecordCommands,
    },
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Create a new student for a class
    Create {
        /// Admission class (e.g. class-10)
        #[arg(long = "class")]
        class_name: String,
    },
    /// Load an existing student and show the enrollment state
    Show {
        student_id: String,
    },
}

#[derive(Subcommand)]
enum RecordCommands {
    /// Fetch the stored record, pre-populating from extraction if absent
    Show {
        student_id: String,
        document_type: String,
    },
    /// Create or update the stored record
    Save {
        student_id: String,
        document_type: String,
        /// Field values as key=value; repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Delete the stored record
    Delete {
        student_id: String,
        document_type: String,
        /// Confirm the deletion (required; it is permanent)
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(expand_path);

    match cli.command {
        Commands::Init => cmd_init(config_path.as_deref()),
        Commands::Student { command } => match command {
            StudentCommands::Create { class_name } => {
                cmd_student_create(config_path.as_deref(), &class_name).await
            }
            StudentCommands::Show { student_id } => {
                cmd_student_show(config_path.as_deref(), &student_id).await
            }
        },
        Commands::Upload {
            student_id,
            document_type,
            file,
            side,
        } => cmd_upload(config_path.as_deref(), &student_id, &document_type, &file, side).await,
        Commands::Documents { student_id } => {
            cmd_documents(config_path.as_deref(), &student_id).await
        }
        Commands::Record { command } => match command {
            RecordCommands::Show {
                student_id,
                document_type,
            } => cmd_record_show(config_path.as_deref(), &student_id, &document_type).await,
            RecordCommands::Save {
                student_id,
                document_type,
                fields,
            } => cmd_record_save(config_path.as_deref(), &student_id, &document_type, fields).await,
            RecordCommands::Delete {
                student_id,
                document_type,
                yes,
            } => cmd_record_delete(config_path.as_deref(), &student_id, &document_type, yes).await,
        },
    }
}

fn open_session(config_path: Option<&Path>) -> anyhow::Result<EnrollmentSession> {
    let config = Config::load(config_path)?;
    let transport = Arc::new(HttpTransport::new(config.request_timeout));
    Ok(EnrollmentSession::new(&config, transport))
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

fn parse_document_type(input: &str) -> anyhow::Result<DocumentType> {
    DocumentType::parse(input).with_context(|| {
        let known = DocumentType::ALL
            .iter()
            .map(|ty| ty.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown document type '{input}' (known: {known})")
    })
}

fn cmd_init(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);
    if Config::write_starter(&path)? {
        println!(
            "{} Wrote starter config to {}",
            style("✓").green(),
            path.display()
        );
        println!("  Edit api_base_url and school_id before first use.");
    } else {
        println!(
            "{} Config already exists at {}",
            style("!").yellow(),
            path.display()
        );
    }
    Ok(())
}

async fn cmd_student_create(config_path: Option<&Path>, class_name: &str) -> anyhow::Result<()> {
    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Creating student for {class_name}"));
    let result = session.create_student(class_name).await;
    pb.finish_and_clear();

    let student = result?;
    println!(
        "{} Student {} created for class {}",
        style("✓").green(),
        style(&student.student_id).bold(),
        student.class_name.as_deref().unwrap_or(class_name)
    );
    println!("  Upload documents with: docintake upload {} <type> <file>", student.student_id);
    Ok(())
}

async fn cmd_student_show(config_path: Option<&Path>, student_id: &str) -> anyhow::Result<()> {
    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Loading student {student_id}"));
    let result = session.load_student(student_id).await;
    pb.finish_and_clear();
    result?;

    println!(
        "{} Student {}",
        style("✓").green(),
        style(student_id).bold()
    );
    print_fields(&session.fields);
    print_slots(&session);
    print_marksheets(&session);
    Ok(())
}

async fn cmd_upload(
    config_path: Option<&Path>,
    student_id: &str,
    document_type: &str,
    file: &Path,
    side: Option<String>,
) -> anyhow::Result<()> {
    let document_type = parse_document_type(document_type)?;
    let side = match side {
        Some(input) => Some(
            AadhaarSide::parse(&input)
                .with_context(|| format!("side must be front or back, got '{input}'"))?,
        ),
        None => None,
    };
    if document_type.is_two_sided() && side.is_none() {
        bail!(
            "{} uploads need --side front or --side back",
            document_type.display_name()
        );
    }
    if !document_type.is_two_sided() && side.is_some() {
        bail!("--side only applies to {}", DocumentType::Aadhaar.display_name());
    }

    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Loading student {student_id}"));
    let result = session.load_student(student_id).await;
    pb.finish_and_clear();
    result?;

    let pb = spinner(format!(
        "Uploading {} for {student_id}",
        document_type.display_name()
    ));
    let result = match side {
        Some(side) => session.upload_aadhaar_side(side, file).await,
        None => session.upload_document(document_type, file).await,
    };
    pb.finish_and_clear();
    let report = result?;

    println!(
        "{} {} uploaded ({})",
        style("✓").green(),
        report.document,
        report.status.as_str()
    );
    if let Some(url) = &report.file_url {
        println!("  stored at {url}");
    }
    if !report.merged_fields.is_empty() {
        println!(
            "  filled form fields: {}",
            style(report.merged_fields.join(", ")).cyan()
        );
    }
    match report.marksheet_outcome {
        Some(InsertOutcome::ReplacedPlaceholder) => {
            println!("  marksheet list: first record captured");
        }
        Some(InsertOutcome::Prepended) => {
            println!("  marksheet list: new record added");
        }
        Some(InsertOutcome::Unchanged) => {
            println!(
                "  marksheet list: {} (same document already captured)",
                style("unchanged").yellow()
            );
        }
        None => {}
    }
    if report.marksheet_outcome.is_some() {
        print_marksheets(&session);
    }
    Ok(())
}

async fn cmd_documents(config_path: Option<&Path>, student_id: &str) -> anyhow::Result<()> {
    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Loading student {student_id}"));
    let result = session.load_student(student_id).await;
    pb.finish_and_clear();
    result?;

    print_slots(&session);
    print_marksheets(&session);
    Ok(())
}

async fn cmd_record_show(
    config_path: Option<&Path>,
    student_id: &str,
    document_type: &str,
) -> anyhow::Result<()> {
    let document_type = parse_document_type(document_type)?;
    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Loading student {student_id}"));
    let result = session.load_student(student_id).await;
    pb.finish_and_clear();
    result?;

    let pb = spinner(format!("Fetching {} record", document_type.as_str()));
    let result = session.open_record(document_type).await.map(|d| d.clone());
    pb.finish_and_clear();
    let draft = result?;

    match session.record_state(document_type) {
        RecordState::Found => println!(
            "{} {} record loaded from server",
            style("✓").green(),
            document_type.display_name()
        ),
        RecordState::NotFound if draft.is_empty() => println!(
            "{} No {} record stored yet; ready to create one",
            style("!").yellow(),
            document_type.display_name()
        ),
        RecordState::NotFound => println!(
            "{} No {} record stored; pre-populated from file extraction",
            style("!").yellow(),
            document_type.display_name()
        ),
        RecordState::Unknown => {}
    }

    let fields = schema::manual_fields(document_type);
    if fields.is_empty() && draft.is_empty() {
        println!("  (no structured data for this document type)");
        return Ok(());
    }
    for field in fields {
        let value = draft.get(*field).map(render_value);
        println!("  {:<28} {}", field, value.as_deref().unwrap_or("-"));
    }
    // Values outside the editable schema still get shown.
    for (key, value) in &draft {
        if !fields.contains(&key.as_str()) {
            println!("  {:<28} {}", key, render_value(value));
        }
    }
    Ok(())
}

async fn cmd_record_save(
    config_path: Option<&Path>,
    student_id: &str,
    document_type: &str,
    fields: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let document_type = parse_document_type(document_type)?;
    if fields.is_empty() {
        bail!("nothing to save; pass at least one --field key=value");
    }

    let editable = schema::manual_fields(document_type);
    for (key, _) in &fields {
        if !editable.is_empty() && !editable.contains(&key.as_str()) {
            println!(
                "{} '{}' is not an editable {} field",
                style("!").yellow(),
                key,
                document_type.as_str()
            );
        }
    }

    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Loading student {student_id}"));
    let result = session.load_student(student_id).await;
    pb.finish_and_clear();
    result?;

    // Fetch first so existence decides create vs update, and so edits
    // overlay the stored draft rather than replacing it.
    let pb = spinner(format!("Fetching {} record", document_type.as_str()));
    let result = session.open_record(document_type).await.map(|d| d.clone());
    pb.finish_and_clear();
    let mut data = result?;

    for (key, value) in fields {
        data.insert(key, serde_json::Value::String(value));
    }

    let pb = spinner(format!("Saving {} record", document_type.as_str()));
    let result = session.save_record(document_type, data).await;
    pb.finish_and_clear();

    match result? {
        SaveKind::Created => println!(
            "{} {} record created",
            style("✓").green(),
            document_type.display_name()
        ),
        SaveKind::Updated => println!(
            "{} {} record updated",
            style("✓").green(),
            document_type.display_name()
        ),
    }
    Ok(())
}

async fn cmd_record_delete(
    config_path: Option<&Path>,
    student_id: &str,
    document_type: &str,
    yes: bool,
) -> anyhow::Result<()> {
    let document_type = parse_document_type(document_type)?;
    if !yes {
        bail!(
            "deleting the {} record is permanent; re-run with --yes to confirm",
            document_type.display_name()
        );
    }

    let mut session = open_session(config_path)?;

    let pb = spinner(format!("Loading student {student_id}"));
    let result = session.load_student(student_id).await;
    pb.finish_and_clear();
    result?;

    let pb = spinner(format!("Deleting {} record", document_type.as_str()));
    let result = session.delete_record(document_type).await;
    pb.finish_and_clear();

    let message = result?;
    println!("{} {}", style("✓").green(), message);
    Ok(())
}

fn print_fields(fields: &EnrollmentFields) {
    println!("\n{}", style("Enrollment Form").bold());
    println!("{}", "-".repeat(60));
    let rows = [
        ("First name", &fields.first_name),
        ("Last name", &fields.last_name),
        ("Father's name", &fields.father_name),
        ("Mother's name", &fields.mother_name),
        ("Gender", &fields.gender),
        ("Category", &fields.category),
        ("Date of birth", &fields.date_of_birth),
        ("Permanent address", &fields.permanent_address),
        ("Temporary address", &fields.temporary_address),
        ("Previous school", &fields.previous_school),
        ("Board", &fields.board),
        ("Passing year", &fields.passing_year),
        ("TC number", &fields.tc_number),
        ("Phone", &fields.phone),
        ("Email", &fields.email),
        ("Emergency contact", &fields.emergency_contact),
    ];
    for (label, value) in rows {
        if !value.is_empty() {
            println!("{:<20} {}", label, value);
        }
    }
}

fn print_slots(session: &EnrollmentSession) {
    println!("\n{}", style("Documents").bold());
    println!("{}", "-".repeat(60));
    println!("{:<22} {:<15} File", "Document", "Status");
    println!("{}", "-".repeat(60));
    for (ty, slot) in session.slots().iter() {
        println!(
            "{:<22} {:<15} {}",
            ty.display_name(),
            slot.status().as_str(),
            slot.file_url().unwrap_or("-")
        );
        if let DocumentSlot::TwoSided(two_sided) = slot {
            for (label, state) in [("front", &two_sided.front), ("back", &two_sided.back)] {
                println!(
                    "  {:<20} {:<15} {}",
                    label,
                    state.status.as_str(),
                    state.url.as_deref().unwrap_or("-")
                );
            }
        }
    }
}

fn print_marksheets(session: &EnrollmentSession) {
    println!("\n{}", style("Marksheets").bold());
    println!("{}", "-".repeat(60));
    for record in &session.marksheets {
        let origin = if record.is_extracted { "extracted" } else { "manual" };
        println!(
            "[{}] {} | {} | roll {} | {}/{} | {} ({})",
            record.id,
            blank_dash(&record.class_name),
            blank_dash(&record.school_name),
            blank_dash(&record.roll_number),
            blank_dash(&record.total_obtained_marks),
            blank_dash(&record.total_max_marks),
            blank_dash(&record.result_status),
            origin
        );
        for subject in &record.subjects {
            if !subject.name.is_empty() {
                println!(
                    "    {:<20} {}/{}",
                    subject.name, subject.obtained, subject.max
                );
            }
        }
    }
}

fn blank_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
