//! Repository services for regulation request storage.

pub mod regulation;
pub(crate) mod shared;

pub use regulation::{
    list_records, pending_signals, Initialised, RegulationService, Uninitialised,
};
