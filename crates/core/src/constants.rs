//! Shared constants for the regulation core.

/// Subdirectory of the data dir that holds regulation record repositories.
pub const REGULATION_DIR_NAME: &str = "regulation";

/// Name of the versioned status file inside each record repository.
pub const REGULATION_FILE_NAME: &str = "REGULATION.yaml";

/// Default base directory when `REGULATION_DATA_DIR` is not set.
pub const DEFAULT_REGULATION_DATA_DIR: &str = "/regulation_data";
