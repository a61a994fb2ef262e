use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use nir_core::{
    apply_deadline_decision, constants::DEFAULT_REGULATION_DATA_DIR, list_records,
    pending_signals, Author, CoreConfig, DeadlineDecision, DeadlineDialog, DialogEvent,
    DialogOutcome, Initialised, RegulationService, ShardableUuid,
};
use nir_record::{RegulationRecord, RegulationRecordData, Status, SupportType};
use nir_types::{EmailAddress, NonEmptyText};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "nir")]
#[command(about = "Inter-facility transfer regulation CLI")]
struct Cli {
    /// Author name for Git commit metadata
    #[arg(long, global = true)]
    name: Option<String>,
    /// Author email for Git commit metadata
    #[arg(long, global = true)]
    email: Option<String>,
    /// Author role, e.g. "Clinician" or "Coordinator"
    #[arg(long, global = true)]
    role: Option<String>,
    /// Care location for commit metadata (defaults to NIR_FACILITY)
    #[arg(long, global = true)]
    location: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a regulation request for a patient
    Create {
        /// Patient UUID
        patient_id: String,
        /// Requested specialty, e.g. ONCOLOGIA
        support_type: String,
    },
    /// List regulation requests
    List {
        /// Include soft-deleted requests
        #[arg(long)]
        include_inactive: bool,
    },
    /// Show one regulation request in full
    Show {
        /// Regulation UUID
        id: String,
    },
    /// Soft-delete a regulation request
    Remove {
        /// Regulation UUID
        id: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Advance the request to a new status (coordinator)
    Advance {
        /// Regulation UUID
        id: String,
        /// Target status, e.g. regulado
        status: String,
        /// Justification; mandatory for the denial statuses
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Confirm the patient is ready to transfer (care team)
    Confirm {
        /// Regulation UUID
        id: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Place a clinical hold on the request (care team)
    Hold {
        /// Regulation UUID
        id: String,
        /// Why the patient cannot transfer yet
        reason: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Set the reassessment deadline on a clinical hold (coordinator)
    SetDeadline {
        /// Regulation UUID
        id: String,
        /// RFC 3339 timestamp, e.g. 2026-09-05T12:00:00Z
        deadline: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Ask the coordinator to cancel the request (care team)
    RequestCancel {
        /// Regulation UUID
        id: String,
        /// Why the request should be cancelled
        reason: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Ask the coordinator for a fresh transfer slot (care team)
    RequestRelist {
        /// Regulation UUID
        id: String,
        /// Why the request should be relisted
        reason: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// Change the requested specialty; resets the workflow (care team)
    ChangeSpecialty {
        /// Regulation UUID
        id: String,
        /// New specialty, e.g. NEUROLOGIA
        support_type: String,
        /// Why the specialty changed
        reason: String,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
    /// List requests carrying a pending team signal
    Signals,
    /// Decide what to do about an expired hold deadline
    DeadlineDecision {
        /// Regulation UUID
        id: String,
        /// confirm-transfer, request-relisting or request-cancellation
        decision: String,
        /// Justification for relisting/cancellation decisions
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        expected_revision: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    let Some(command) = cli.command.take() else {
        println!("Use 'nir --help' for commands");
        return Ok(());
    };

    let cfg = load_config()?;
    let care_location = cli
        .location
        .clone()
        .unwrap_or_else(|| cfg.facility_name().to_string());

    match command {
        Commands::Create {
            patient_id,
            support_type,
        } => {
            let author = build_author(&cli)?;
            let patient_uuid = ShardableUuid::parse(&patient_id)?;
            let support_type = SupportType::from_str(&support_type)?;
            match RegulationService::new(cfg).initialise(
                &author,
                &care_location,
                patient_uuid.uuid(),
                support_type,
            ) {
                Ok((service, _)) => {
                    println!("Created regulation request: {}", service.regulation_id())
                }
                Err(e) => eprintln!("Error creating regulation request: {}", e),
            }
        }
        Commands::List { include_inactive } => {
            let records = list_records(&cfg, include_inactive)?;
            print_record_lines(&records);
        }
        Commands::Show { id } => {
            let service = open_service(cfg, &id)?;
            let record = service.load()?;
            print!("{}", RegulationRecord::render(&record)?);
            println!("# deadline expired: {}", record.deadline_expired(Utc::now()));
        }
        Commands::Remove {
            id,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            match service.soft_delete(&author, &care_location, expected_revision) {
                Ok(_) => println!("Removed regulation request: {}", id),
                Err(e) => eprintln!("Error removing regulation request: {}", e),
            }
        }
        Commands::Advance {
            id,
            status,
            reason,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let next = Status::from_str(&status)?;
            let denial_reason = reason.as_deref().map(NonEmptyText::new).transpose()?;
            match service.advance_status(
                &author,
                &care_location,
                next,
                denial_reason,
                expected_revision,
            ) {
                Ok(record) => println!("Advanced {} to {}", id, record.status),
                Err(e) => eprintln!("Error advancing status: {}", e),
            }
        }
        Commands::Confirm {
            id,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            match service.confirm_readiness(&author, &care_location, expected_revision) {
                Ok(_) => println!("Confirmed transfer readiness for {}", id),
                Err(e) => eprintln!("Error confirming readiness: {}", e),
            }
        }
        Commands::Hold {
            id,
            reason,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let reason = NonEmptyText::new(&reason)?;
            match service.request_clinical_hold(&author, &care_location, reason, expected_revision)
            {
                Ok(_) => println!("Recorded clinical hold for {}", id),
                Err(e) => eprintln!("Error recording clinical hold: {}", e),
            }
        }
        Commands::SetDeadline {
            id,
            deadline,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let deadline = DateTime::parse_from_rfc3339(&deadline)?.with_timezone(&Utc);
            match service.set_clinical_hold_deadline(
                &author,
                &care_location,
                deadline,
                expected_revision,
            ) {
                Ok(_) => println!("Set hold deadline for {}", id),
                Err(e) => eprintln!("Error setting hold deadline: {}", e),
            }
        }
        Commands::RequestCancel {
            id,
            reason,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let reason = NonEmptyText::new(&reason)?;
            match service.request_cancellation(&author, &care_location, reason, expected_revision)
            {
                Ok(_) => println!("Recorded cancellation request for {}", id),
                Err(e) => eprintln!("Error recording cancellation request: {}", e),
            }
        }
        Commands::RequestRelist {
            id,
            reason,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let reason = NonEmptyText::new(&reason)?;
            match service.request_relisting(&author, &care_location, reason, expected_revision) {
                Ok(_) => println!("Recorded relisting request for {}", id),
                Err(e) => eprintln!("Error recording relisting request: {}", e),
            }
        }
        Commands::ChangeSpecialty {
            id,
            support_type,
            reason,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let new_type = SupportType::from_str(&support_type)?;
            let reason = NonEmptyText::new(&reason)?;
            match service.change_specialty(
                &author,
                &care_location,
                new_type,
                reason,
                expected_revision,
            ) {
                Ok(record) => println!(
                    "Changed specialty of {} to {}; back to {}",
                    id, record.support_type, record.status
                ),
                Err(e) => eprintln!("Error changing specialty: {}", e),
            }
        }
        Commands::Signals => {
            let records = pending_signals(&cfg)?;
            if records.is_empty() {
                println!("No pending team signals.");
            } else {
                print_record_lines(&records);
            }
        }
        Commands::DeadlineDecision {
            id,
            decision,
            reason,
            expected_revision,
        } => {
            let author = build_author(&cli)?;
            let service = open_service(cfg, &id)?;
            let decision = run_deadline_dialog(&service, &decision, reason.as_deref())?;
            match apply_deadline_decision(
                &service,
                &author,
                &care_location,
                decision,
                expected_revision,
            ) {
                Ok(record) => println!("Applied deadline decision to {}: {}", id, record.status),
                Err(e) => eprintln!("Error applying deadline decision: {}", e),
            }
        }
    }

    Ok(())
}

fn load_config() -> Result<Arc<CoreConfig>, Box<dyn std::error::Error>> {
    let data_dir = std::env::var("REGULATION_DATA_DIR")
        .unwrap_or_else(|_| DEFAULT_REGULATION_DATA_DIR.into());
    let facility = std::env::var("NIR_FACILITY")
        .map_err(|_| "NIR_FACILITY must be set to the facility name")?;
    Ok(Arc::new(CoreConfig::new(data_dir.into(), facility)?))
}

fn build_author(cli: &Cli) -> Result<Author, Box<dyn std::error::Error>> {
    let name = cli.name.as_deref().ok_or("--name is required")?;
    let email = cli.email.as_deref().ok_or("--email is required")?;
    let role = cli.role.as_deref().unwrap_or("Clinician");

    Ok(Author {
        name: NonEmptyText::new(name)?,
        role: NonEmptyText::new(role)?,
        email: EmailAddress::parse(email)?,
        registrations: vec![],
    })
}

fn open_service(
    cfg: Arc<CoreConfig>,
    id: &str,
) -> Result<RegulationService<Initialised>, Box<dyn std::error::Error>> {
    let uuid = ShardableUuid::parse(id)?;
    Ok(RegulationService::with_id(cfg, uuid.uuid()))
}

fn print_record_lines(records: &[RegulationRecordData]) {
    if records.is_empty() {
        println!("No regulation requests found.");
        return;
    }
    for record in records {
        println!(
            "ID: {}, Patient: {}, Status: {}, Specialty: {}, Requested: {}",
            record.regulation_id.simple(),
            record.patient_id.simple(),
            record.status,
            record.support_type,
            record.requested_at.to_rfc3339()
        );
    }
}

/// Walks the expired-deadline dialog to one of its closing decisions.
fn run_deadline_dialog(
    service: &RegulationService<Initialised>,
    decision: &str,
    reason: Option<&str>,
) -> Result<DeadlineDecision, Box<dyn std::error::Error>> {
    let record = service.load()?;
    let mut dialog = DeadlineDialog::open(&record, Utc::now())?;

    let outcome = match decision {
        "confirm-transfer" => dialog.handle(DialogEvent::ChooseConfirm)?,
        "request-relisting" | "request-cancellation" => {
            if decision == "request-relisting" {
                dialog.handle(DialogEvent::ChooseRelisting)?;
            } else {
                dialog.handle(DialogEvent::ChooseCancellation)?;
            }
            dialog.handle(DialogEvent::EditDraft(
                reason.unwrap_or_default().to_string(),
            ))?;
            dialog.handle(DialogEvent::Submit)?
        }
        other => return Err(format!("unknown deadline decision: {other}").into()),
    };

    match outcome {
        DialogOutcome::Closed(decision) => Ok(decision),
        DialogOutcome::Continue => Err("deadline dialog did not reach a decision".into()),
    }
}
