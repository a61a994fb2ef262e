use nir_record::{RecordError, Status};

#[derive(Debug, thiserror::Error)]
pub enum RegulationError {
    // ------------------------------------------------------------------
    // Workflow errors (rejected before any store write)
    // ------------------------------------------------------------------
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: Status, to: Status },
    #[error("{operation} requires status {required}, record is {actual}")]
    WrongStatus {
        operation: &'static str,
        required: Status,
        actual: Status,
    },
    #[error("cannot set a hold deadline: no clinical hold is present")]
    HoldNotSet,
    #[error("regulation record not found: {0}")]
    NotFound(String),
    #[error("revision conflict: expected revision {expected}, record is at {actual}")]
    RevisionConflict { expected: u64, actual: u64 },

    // ------------------------------------------------------------------
    // Store errors
    // ------------------------------------------------------------------
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "initialise failed and cleanup also failed (path: {path}): init={init_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterInitialiseFailed {
        path: std::path::PathBuf,
        #[source]
        init_error: Box<RegulationError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to create/update git reference: {0}")]
    GitReference(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),

    // ------------------------------------------------------------------
    // Author / commit metadata errors
    // ------------------------------------------------------------------
    #[error("invalid Author-Registration")]
    InvalidAuthorRegistration,
    #[error("author trailer keys are reserved")]
    ReservedAuthorTrailerKey,
    #[error("invalid Care-Location")]
    InvalidCareLocation,
    #[error("missing Care-Location")]
    MissingCareLocation,
    #[error("Care-Location trailer key is reserved")]
    ReservedCareLocationTrailerKey,
}

pub type RegulationResult<T> = std::result::Result<T, RegulationError>;
