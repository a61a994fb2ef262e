//! # NIR Core
//!
//! Core business logic for the inter-facility transfer regulation system.
//!
//! This crate contains the regulation workflow and file/folder management:
//! - Regulation request creation and listing with sharded YAML storage
//! - The status transition map and its coordinator/team operations
//! - Git-based versioning of every record mutation under `REGULATION_DATA_DIR`
//! - The deadline-expiry decision dialog
//!
//! **No API concerns**: Authentication, HTTP servers, or service interfaces belong in
//! `api-rest` or `api-shared`.

pub mod author;
pub mod config;
pub mod constants;
pub mod deadline;
pub mod error;
pub mod repositories;
pub mod transitions;
pub mod uuid;
pub mod validation;

mod versioned_files;

pub use author::{Author, AuthorRegistration};
pub use config::CoreConfig;
pub use deadline::{
    apply_deadline_decision, DeadlineDecision, DeadlineDialog, DialogEvent, DialogOutcome,
    DialogState,
};
pub use error::{RegulationError, RegulationResult};
pub use repositories::{
    list_records, pending_signals, Initialised, RegulationService, Uninitialised,
};
pub use transitions::{allowed_transitions, transition, TransitionOption};
pub use uuid::ShardableUuid;
