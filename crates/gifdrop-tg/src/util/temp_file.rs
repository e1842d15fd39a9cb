use tempfile::TempPath;

/// Allocates a collision-free path for a scratch file in the system temp
/// directory. Concurrent jobs never share a scratch filename because the
/// name is derived from a fresh nanoid.
///
/// The file (if one gets written there) is deleted when the returned
/// handle is dropped, so scratch files are cleaned up on every exit path.
pub(crate) fn scratch_path(extension: &str) -> TempPath {
    let path = std::env::temp_dir().join(format!("{}.{extension}", nanoid::nanoid!()));
    TempPath::from_path(path)
}
