//! Shared repository utilities.
//!
//! Directory allocation helpers used by the regulation repository service.

use crate::error::{RegulationError, RegulationResult};
use crate::uuid::ShardableUuid;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within the base records directory.
///
/// This function generates UUIDs using the provided source function and attempts to
/// create a corresponding sharded directory. It guards against UUID collisions or
/// pre-existing directories by retrying up to 5 times with different UUIDs.
///
/// # Arguments
///
/// * `base_dir` - The base records directory.
/// * `uuid_source` - A mutable closure that generates new `ShardableUuid` instances.
///
/// # Returns
///
/// A tuple of the allocated `ShardableUuid` and the `PathBuf` to the created directory.
///
/// # Errors
///
/// Returns `RegulationError::RecordDirCreation` if directory creation fails after 5
/// attempts or parent directory creation fails.
pub(crate) fn create_uuid_and_shard_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> RegulationResult<(ShardableUuid, PathBuf)> {
    // Allocate a new UUID, but guard against pathological UUID collisions (or pre-existing
    // directories from external interference) by limiting retries.
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(RegulationError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RegulationError::RecordDirCreation(e)),
        }
    }

    Err(RegulationError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_sharded_directory_for_fresh_uuid() {
        let temp = TempDir::new().unwrap();
        let (uuid, dir) =
            create_uuid_and_shard_dir(temp.path(), ShardableUuid::new).expect("allocation");

        assert!(dir.is_dir());
        assert_eq!(dir, uuid.sharded_dir(temp.path()));
    }

    #[test]
    fn retries_past_a_colliding_uuid() {
        let temp = TempDir::new().unwrap();
        let taken = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let free = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp.path())).unwrap();

        let mut sequence = vec![free.clone(), taken].into_iter();
        let (uuid, _dir) = create_uuid_and_shard_dir(temp.path(), move || {
            sequence.next().expect("source exhausted")
        })
        .expect("allocation");

        assert_eq!(uuid, free);
    }

    #[test]
    fn gives_up_when_every_candidate_collides() {
        let temp = TempDir::new().unwrap();
        let taken = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp.path())).unwrap();

        let err = create_uuid_and_shard_dir(temp.path(), || taken.clone())
            .expect_err("must give up after retries");
        assert!(matches!(err, RegulationError::RecordDirCreation(_)));
    }
}
