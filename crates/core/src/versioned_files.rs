//! Versioned file operations with Git-based version control.
//!
//! Each regulation request is stored as files on disk inside its own local Git
//! repository (`git2`/libgit2). This module provides the high-level services for
//! managing those versioned files:
//!
//! - **Atomic Multi-file Operations**: Write files and commit them in a single
//!   transaction with automatic rollback on failure
//! - **Consistent Commit Creation**: Structured commit messages with a controlled
//!   vocabulary across all repository operations
//! - **Immutable Audit Trail**: Nothing is ever deleted; all changes are preserved in
//!   version control history. Even a "removed" request is a soft-delete commit, never
//!   a destroyed repository.
//!
//! ## Branch Policy
//!
//! All request repositories standardise on `refs/heads/main`.
//!
//! ## Commit message format
//!
//! - Subject line: `<domain>:<action>: <summary>`
//! - Trailers: standard Git trailer lines `Key: Value`, with `Author-Name`,
//!   `Author-Role`, `Author-Registration` and `Care-Location` reserved for the
//!   structured author/facility metadata.

use crate::author::Author;
use crate::error::{RegulationError, RegulationResult};
use nir_types::NonEmptyText;
use std::fmt;
use std::path::{Path, PathBuf};

const MAIN_REF: &str = "refs/heads/main";

/// Controlled vocabulary for commit message domains.
///
/// Each commit is labelled with the part of the request it touches, so the history of a
/// repository can be scanned without parsing file diffs.
///
/// Safety/intent: Do not include patient identifiers or clinical detail in commit messages.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RegCommitDomain {
    /// The request record as a whole (creation, soft-delete).
    Record,
    /// Status movement through the workflow.
    Workflow,
    /// Care-team signals: holds, confirmations, cancel and relisting requests.
    Team,
    /// Deadline handling on a clinical hold.
    Deadline,
}

impl RegCommitDomain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Workflow => "workflow",
            Self::Team => "team",
            Self::Deadline => "deadline",
        }
    }
}

impl fmt::Display for RegCommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controlled vocabulary for commit message actions.
///
/// - **`Create`**: the initial commit of a new request repository.
/// - **`Update`**: any later mutation of the record. The previous version remains in
///   Git history.
/// - **`Remove`**: the soft-delete that clears the active flag. The repository and its
///   full history are retained.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RegCommitAction {
    Create,
    Update,
    Remove,
}

impl RegCommitAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for RegCommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single commit trailer line in standard Git trailer format.
///
/// Renders as `Key: Value`. Trailers provide additional structured metadata beyond the
/// subject line and are sorted deterministically in rendered output.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RegCommitTrailer {
    key: String,
    value: String,
}

impl RegCommitTrailer {
    /// Create a new commit trailer.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidInput` if key or value is empty, multi-line, or
    /// the key contains `:`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> RegulationResult<Self> {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();

        if key.is_empty()
            || key.contains(['\n', '\r'])
            || key.contains(':')
            || value.is_empty()
            || value.contains(['\n', '\r'])
        {
            return Err(RegulationError::InvalidInput(
                "commit trailer key/value must be non-empty and single-line (key cannot contain ':')".into()
            ));
        }

        Ok(Self { key, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A structured, predictable commit message.
///
/// Rendering rules:
///
/// - Subject line: `<domain>:<action>: <summary>`
/// - Trailers: standard Git trailer lines `Key: Value`, separated from the subject by a
///   single blank line
/// - No free-form prose paragraphs
///
/// Safety/intent: commit messages are labels and indexes; do not include patient
/// identifiers or clinical detail.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegCommitMessage {
    domain: RegCommitDomain,
    action: RegCommitAction,
    summary: NonEmptyText,
    care_location: NonEmptyText,
    trailers: Vec<RegCommitTrailer>,
}

impl RegCommitMessage {
    /// Create a new commit message with required fields.
    ///
    /// # Arguments
    ///
    /// * `domain` - The category of change (e.g., Record, Workflow)
    /// * `action` - The specific operation (Create, Update, Remove)
    /// * `summary` - Brief description of the change (single line)
    /// * `care_location` - The facility where the change was made
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidInput` if summary is empty or multi-line,
    /// `RegulationError::MissingCareLocation` if care_location is empty, and
    /// `RegulationError::InvalidCareLocation` if care_location contains newlines.
    pub fn new(
        domain: RegCommitDomain,
        action: RegCommitAction,
        summary: impl AsRef<str>,
        care_location: impl AsRef<str>,
    ) -> RegulationResult<Self> {
        let summary_str = summary.as_ref().trim();
        if summary_str.contains(['\n', '\r']) {
            return Err(RegulationError::InvalidInput(
                "commit summary must be single-line".into(),
            ));
        }
        let summary = NonEmptyText::new(summary_str).map_err(|_| {
            RegulationError::InvalidInput("commit summary must be non-empty".into())
        })?;

        let care_location_str = care_location.as_ref().trim();
        if care_location_str.contains(['\n', '\r']) {
            return Err(RegulationError::InvalidCareLocation);
        }
        let care_location = NonEmptyText::new(care_location_str)
            .map_err(|_| RegulationError::MissingCareLocation)?;

        Ok(Self {
            domain,
            action,
            summary,
            care_location,
            trailers: Vec::new(),
        })
    }

    /// Add a trailer to the commit message.
    ///
    /// Certain trailer keys are reserved (`Author-*` and `Care-Location`) and cannot be
    /// set manually.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::ReservedAuthorTrailerKey` for Author-* keys,
    /// `RegulationError::ReservedCareLocationTrailerKey` for the Care-Location key, and
    /// `RegulationError::InvalidInput` for a malformed key/value.
    pub fn with_trailer(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> RegulationResult<Self> {
        let key_str = key.into();
        if key_str.trim_start().starts_with("Author-") {
            return Err(RegulationError::ReservedAuthorTrailerKey);
        }
        if key_str.trim() == "Care-Location" {
            return Err(RegulationError::ReservedCareLocationTrailerKey);
        }
        self.trailers
            .push(RegCommitTrailer::new(key_str, value.into())?);
        Ok(self)
    }

    pub fn domain(&self) -> RegCommitDomain {
        self.domain
    }

    pub fn action(&self) -> RegCommitAction {
        self.action
    }

    pub fn summary(&self) -> &str {
        self.summary.as_str()
    }

    pub fn trailers(&self) -> &[RegCommitTrailer] {
        &self.trailers
    }

    /// Render a commit message including mandatory Author trailers.
    ///
    /// The Author trailers are rendered deterministically in the order:
    ///
    /// - `Author-Name`
    /// - `Author-Role`
    /// - `Author-Registration` (0..N; sorted)
    /// - `Care-Location`
    ///
    /// followed by the remaining trailers, sorted.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError` from author validation, or the reserved-key errors if
    /// a reserved trailer was smuggled into `trailers`.
    pub fn render_with_author(&self, author: &Author) -> RegulationResult<String> {
        author.validate_commit_author()?;

        // Author trailers are reserved and must only be emitted from the structured metadata.
        if self
            .trailers
            .iter()
            .any(|t| t.key().trim_start().starts_with("Author-"))
        {
            return Err(RegulationError::ReservedAuthorTrailerKey);
        }

        // Care-Location is reserved and must only be emitted from the structured metadata.
        if self
            .trailers
            .iter()
            .any(|t| t.key().trim() == "Care-Location")
        {
            return Err(RegulationError::ReservedCareLocationTrailerKey);
        }

        let mut rendered = format!("{}:{}: {}", self.domain, self.action, self.summary.as_str());

        // Sort registrations deterministically.
        let mut regs = author.registrations.clone();
        regs.sort_by(|a, b| {
            let a_key = (a.authority.as_str(), a.number.as_str());
            let b_key = (b.authority.as_str(), b.number.as_str());
            a_key.cmp(&b_key)
        });

        // Sort non-author trailers deterministically.
        let mut other = self.trailers.clone();
        other.sort_by(|a, b| {
            let a_key = (a.key(), a.value());
            let b_key = (b.key(), b.value());
            a_key.cmp(&b_key)
        });

        rendered.push_str("\n\n");
        rendered.push_str("Author-Name: ");
        rendered.push_str(author.name.trim());
        rendered.push('\n');
        rendered.push_str("Author-Role: ");
        rendered.push_str(author.role.trim());

        for reg in regs {
            rendered.push('\n');
            rendered.push_str("Author-Registration: ");
            rendered.push_str(reg.authority.trim());
            rendered.push(' ');
            rendered.push_str(reg.number.trim());
        }

        rendered.push('\n');
        rendered.push_str("Care-Location: ");
        rendered.push_str(self.care_location.as_str());

        for trailer in other {
            rendered.push('\n');
            rendered.push_str(trailer.key());
            rendered.push_str(": ");
            rendered.push_str(trailer.value());
        }

        Ok(rendered)
    }
}

/// Represents a file to be written and committed.
///
/// Used with [`VersionedFileService::write_and_commit_files`] to write files in a single
/// atomic commit operation.
#[derive(Debug, Clone)]
pub struct FileToWrite<'a> {
    /// The relative path to the file within the repository directory.
    pub relative_path: &'a Path,
    /// The new content to write to the file.
    pub content: &'a str,
    /// The previous file content for rollback. `None` if this is a new file.
    pub old_content: Option<&'a str>,
}

/// Service for managing versioned files with Git version control.
///
/// `VersionedFileService` provides high-level operations for working with per-request
/// Git repositories. It handles atomic file write and commit operations with automatic
/// rollback on failure.
///
/// The typical workflow is:
/// 1. Create or open a repository with [`init`](Self::init) or [`open`](Self::open)
/// 2. Prepare file changes using [`FileToWrite`] structs
/// 3. Write and commit files with [`write_and_commit_files`](Self::write_and_commit_files)
pub struct VersionedFileService {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl VersionedFileService {
    /// Create a new Git repository at the specified working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RegulationError::GitInit`] if repository initialisation fails or the
    /// repository has no working directory (bare repo).
    pub(crate) fn init(workdir: &Path) -> RegulationResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(RegulationError::GitInit)?;
        // Use the actual workdir from the repository to ensure path stripping works correctly.
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                RegulationError::GitInit(git2::Error::from_str(
                    "repository has no working directory",
                ))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Open an existing Git repository at the specified working directory.
    ///
    /// Uses the `NO_SEARCH` flag so git2 never walks parent directories looking for a
    /// `.git` folder, which matters for request repository isolation.
    ///
    /// # Errors
    ///
    /// Returns [`RegulationError::GitOpen`] if the repository does not exist, cannot be
    /// opened, or has no working directory.
    pub(crate) fn open(workdir: &Path) -> RegulationResult<Self> {
        let repo = git2::Repository::open_ext(
            workdir,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(RegulationError::GitOpen)?;
        // git2 may resolve symlinks or canonicalise paths differently.
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                RegulationError::GitOpen(git2::Error::from_str(
                    "repository has no working directory",
                ))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Ensure `HEAD` points at `refs/heads/main`.
    ///
    /// For newly initialised repositories this creates an "unborn" `main` branch that
    /// will be born when the first commit is written.
    fn ensure_main_head(&self) -> RegulationResult<()> {
        self.repo
            .set_head(MAIN_REF)
            .map_err(RegulationError::GitSetHead)?;
        Ok(())
    }

    /// Create a commit including only the provided file paths (relative to the repo workdir).
    ///
    /// # Path rules
    ///
    /// `relative_paths` may contain repo-workdir-relative paths (recommended) or absolute
    /// paths under the repo workdir (they will be normalised). Paths containing `..` are
    /// rejected.
    pub(crate) fn commit_paths(
        &self,
        author: &Author,
        message: &RegCommitMessage,
        relative_paths: &[PathBuf],
    ) -> RegulationResult<git2::Oid> {
        let rendered = message.render_with_author(author)?;
        self.commit_paths_rendered(author, &rendered, relative_paths)
    }

    /// Writes files and commits them to Git with rollback on failure.
    ///
    /// Opens an existing Git repository, creates any necessary parent directories,
    /// writes all files, and commits them in a single Git commit. On error:
    /// - Files that previously existed are restored to their previous state
    /// - New files are removed
    /// - Any directories created during this operation are removed
    ///
    /// # Errors
    ///
    /// Returns a `RegulationError` if repository opening fails, directory creation or a
    /// file write fails ([`RegulationError::FileWrite`]), or the Git commit fails.
    pub(crate) fn write_and_commit_files(
        repo_path: &Path,
        author: &Author,
        msg: &RegCommitMessage,
        files: &[FileToWrite],
    ) -> RegulationResult<()> {
        let repo = Self::open(repo_path)?;

        let mut created_dirs: Vec<PathBuf> = Vec::new();
        let mut written_files: Vec<(PathBuf, Option<String>)> = Vec::new();

        let result: RegulationResult<()> = (|| {
            // Collect all unique parent directories needed.
            let mut dirs_needed = std::collections::HashSet::new();
            for file in files {
                let full_path = repo.workdir.join(file.relative_path);
                if let Some(parent) = full_path.parent() {
                    let mut current = parent;
                    while current != repo.workdir && !current.exists() {
                        dirs_needed.insert(current.to_path_buf());
                        if let Some(parent_of_current) = current.parent() {
                            current = parent_of_current;
                        } else {
                            break;
                        }
                    }
                }
            }

            // Create directories shallowest-first.
            let mut dirs_to_create: Vec<PathBuf> = dirs_needed.into_iter().collect();
            dirs_to_create.sort_by_key(|p| p.components().count());

            for dir in &dirs_to_create {
                std::fs::create_dir(dir).map_err(RegulationError::FileWrite)?;
                created_dirs.push(dir.clone());
            }

            for file in files {
                let full_path = repo.workdir.join(file.relative_path);
                let old_content = file.old_content.map(|s| s.to_string());

                std::fs::write(&full_path, file.content).map_err(RegulationError::FileWrite)?;
                written_files.push((full_path, old_content));
            }

            let paths: Vec<PathBuf> = files
                .iter()
                .map(|f| f.relative_path.to_path_buf())
                .collect();
            repo.commit_paths(author, msg, &paths)?;

            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(write_error) => {
                // Rollback file changes (in reverse order).
                for (full_path, old_content) in written_files.iter().rev() {
                    match old_content {
                        Some(contents) => {
                            let _ = std::fs::write(full_path, contents);
                        }
                        None => {
                            let _ = std::fs::remove_file(full_path);
                        }
                    }
                }

                // Rollback newly created directories (deepest first).
                for dir in created_dirs.iter().rev() {
                    let _ = std::fs::remove_dir(dir);
                }

                Err(write_error)
            }
        }
    }

    /// Initialise a Git repository, commit initial files, and clean up on failure.
    ///
    /// This ensures atomic repository creation: either the repository is fully
    /// initialised with its initial commit, or the directory is completely removed.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if initialisation, file writes or the commit fail.
    /// On error, attempts to remove the entire `request_dir` directory; if cleanup also
    /// fails, returns [`RegulationError::CleanupAfterInitialiseFailed`] carrying both
    /// errors.
    pub(crate) fn init_and_commit(
        request_dir: &Path,
        author: &Author,
        message: &RegCommitMessage,
        files: &[FileToWrite],
    ) -> RegulationResult<()> {
        let result: RegulationResult<()> = (|| {
            let _repo = Self::init(request_dir)?;
            Self::write_and_commit_files(request_dir, author, message, files)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(init_error) => {
                if let Err(cleanup_err) = std::fs::remove_dir_all(request_dir) {
                    return Err(RegulationError::CleanupAfterInitialiseFailed {
                        path: request_dir.to_path_buf(),
                        init_error: Box::new(init_error),
                        cleanup_error: cleanup_err,
                    });
                }
                Err(init_error)
            }
        }
    }

    fn commit_paths_rendered(
        &self,
        author: &Author,
        message: &str,
        relative_paths: &[PathBuf],
    ) -> RegulationResult<git2::Oid> {
        self.ensure_main_head()?;
        let mut index = self.repo.index().map_err(RegulationError::GitIndex)?;

        for path in relative_paths {
            // `git2::Index::add_path` requires repo-workdir-relative paths.
            let rel = if path.is_absolute() {
                path.strip_prefix(&self.workdir)
                    .map_err(|_| {
                        RegulationError::InvalidInput(
                            "path is outside the repository working directory".into(),
                        )
                    })?
                    .to_path_buf()
            } else {
                path.to_path_buf()
            };

            if rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(RegulationError::InvalidInput(
                    "path must not contain parent directory references (..)".into(),
                ));
            }

            index.add_path(&rel).map_err(RegulationError::GitAdd)?;
        }

        self.commit_from_index(author, message, &mut index)
    }

    /// Create a commit from the current Git index state.
    ///
    /// Validates author information, writes the index as a tree, and creates the commit
    /// with the correct parent list for both the first commit (no parents) and
    /// subsequent commits (one parent) in a linear history.
    fn commit_from_index(
        &self,
        author: &Author,
        message: &str,
        index: &mut git2::Index,
    ) -> RegulationResult<git2::Oid> {
        // Ensure author metadata is valid before writing any objects.
        author.validate_commit_author()?;

        let tree_id = index.write_tree().map_err(RegulationError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(RegulationError::GitFindTree)?;

        let sig = git2::Signature::now(author.name.as_str(), author.email.as_str())
            .map_err(RegulationError::GitSignature)?;

        let parents = self.resolve_head_parents()?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        // Normal commit updates HEAD (and underlying ref).
        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .map_err(RegulationError::GitCommit)
    }

    /// Resolve the parent commit(s) for a new commit.
    ///
    /// If `HEAD` exists and points to a commit, that commit is the sole parent. An
    /// unborn branch or missing HEAD yields an empty parent list (first commit).
    fn resolve_head_parents(&self) -> RegulationResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(RegulationError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(RegulationError::GitHead(e)),
        }
    }

    /// The most recent commit message on `main`, if any.
    ///
    /// Used by tests and audit tooling to inspect what was recorded for the last
    /// mutation.
    pub(crate) fn head_commit_message(&self) -> RegulationResult<Option<String>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(RegulationError::GitPeel)?;
                Ok(commit.message().map(|m| m.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(RegulationError::GitHead(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nir_types::{EmailAddress, NonEmptyText};
    use tempfile::TempDir;

    fn test_author() -> Author {
        Author {
            name: NonEmptyText::new("Ana Lima").unwrap(),
            role: NonEmptyText::new("Coordinator").unwrap(),
            email: EmailAddress::parse("ana.lima@example.org").unwrap(),
            registrations: vec![],
        }
    }

    #[test]
    fn render_with_author_orders_trailers_deterministically() {
        let msg = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            "Hospital Municipal Norte",
        )
        .unwrap()
        .with_trailer("Support-Type", "NEUROLOGIA")
        .unwrap();

        assert_eq!(
            msg.render_with_author(&test_author()).unwrap(),
            "record:create: Regulation request created\n\nAuthor-Name: Ana Lima\nAuthor-Role: Coordinator\nCare-Location: Hospital Municipal Norte\nSupport-Type: NEUROLOGIA"
        );
    }

    #[test]
    fn render_with_author_includes_sorted_registrations() {
        let mut author = test_author();
        author.registrations = vec![
            crate::author::AuthorRegistration::new("CRM-SP", "99999").unwrap(),
            crate::author::AuthorRegistration::new("CRM-RJ", "11111").unwrap(),
        ];

        let msg = RegCommitMessage::new(
            RegCommitDomain::Workflow,
            RegCommitAction::Update,
            "Status advanced",
            "Hospital Municipal Norte",
        )
        .unwrap();

        let rendered = msg.render_with_author(&author).unwrap();
        let rj = rendered.find("Author-Registration: CRM-RJ 11111").unwrap();
        let sp = rendered.find("Author-Registration: CRM-SP 99999").unwrap();
        assert!(rj < sp);
    }

    #[test]
    fn rejects_multiline_summary() {
        let err = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "line1\nline2",
            "Hospital Municipal Norte",
        )
        .unwrap_err();

        assert!(matches!(err, RegulationError::InvalidInput(_)));
    }

    #[test]
    fn rejects_missing_care_location() {
        let err = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            "   ",
        )
        .unwrap_err();

        assert!(matches!(err, RegulationError::MissingCareLocation));
    }

    #[test]
    fn rejects_reserved_trailer_keys() {
        let msg = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            "Hospital Municipal Norte",
        )
        .unwrap();

        let err = msg.clone().with_trailer("Author-Name", "Evil").unwrap_err();
        assert!(matches!(err, RegulationError::ReservedAuthorTrailerKey));

        let err = msg.with_trailer("Care-Location", "Elsewhere").unwrap_err();
        assert!(matches!(err, RegulationError::ReservedCareLocationTrailerKey));
    }

    #[test]
    fn rejects_invalid_trailer_key() {
        let err = RegCommitTrailer::new("Bad:Key", "Value").unwrap_err();
        assert!(matches!(err, RegulationError::InvalidInput(_)));
    }

    #[test]
    fn init_and_commit_creates_repo_with_initial_commit() {
        let temp = TempDir::new().unwrap();
        let request_dir = temp.path().join("req");

        let msg = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            "Hospital Municipal Norte",
        )
        .unwrap();

        let files = [FileToWrite {
            relative_path: Path::new("REGULATION.yaml"),
            content: "status: aguardando_regulacao\n",
            old_content: None,
        }];

        VersionedFileService::init_and_commit(&request_dir, &test_author(), &msg, &files)
            .expect("init and commit");

        let service = VersionedFileService::open(&request_dir).expect("open repo");
        let message = service
            .head_commit_message()
            .expect("head lookup")
            .expect("one commit exists");
        assert!(message.starts_with("record:create: Regulation request created"));
        assert!(message.contains("Care-Location: Hospital Municipal Norte"));
    }

    #[test]
    fn init_and_commit_removes_dir_when_commit_fails() {
        let temp = TempDir::new().unwrap();
        let request_dir = temp.path().join("req");

        let msg = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            "Hospital Municipal Norte",
        )
        .unwrap();

        // A path escaping the workdir makes the commit step fail after init.
        let files = [FileToWrite {
            relative_path: Path::new("../escape.yaml"),
            content: "status: aguardando_regulacao\n",
            old_content: None,
        }];

        let err = VersionedFileService::init_and_commit(&request_dir, &test_author(), &msg, &files)
            .expect_err("commit must fail");
        assert!(matches!(err, RegulationError::InvalidInput(_)));
        assert!(!request_dir.exists(), "failed init must clean up directory");
    }

    #[test]
    fn write_and_commit_rolls_back_written_files_on_failure() {
        let temp = TempDir::new().unwrap();
        let request_dir = temp.path().join("req");

        let msg = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            "Hospital Municipal Norte",
        )
        .unwrap();

        let initial = [FileToWrite {
            relative_path: Path::new("REGULATION.yaml"),
            content: "revision: 1\n",
            old_content: None,
        }];
        VersionedFileService::init_and_commit(&request_dir, &test_author(), &msg, &initial)
            .expect("init");

        // Second write pairs a valid file with an escaping one; the whole batch must roll back.
        let update = [
            FileToWrite {
                relative_path: Path::new("REGULATION.yaml"),
                content: "revision: 2\n",
                old_content: Some("revision: 1\n"),
            },
            FileToWrite {
                relative_path: Path::new("../escape.yaml"),
                content: "oops",
                old_content: None,
            },
        ];

        let update_msg = RegCommitMessage::new(
            RegCommitDomain::Workflow,
            RegCommitAction::Update,
            "Status advanced",
            "Hospital Municipal Norte",
        )
        .unwrap();

        VersionedFileService::write_and_commit_files(
            &request_dir,
            &test_author(),
            &update_msg,
            &update,
        )
        .expect_err("commit must fail");

        let content = std::fs::read_to_string(request_dir.join("REGULATION.yaml")).unwrap();
        assert_eq!(content, "revision: 1\n");
    }
}
