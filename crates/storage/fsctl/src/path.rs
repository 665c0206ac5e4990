//! Path checks applied before a path reaches the backend

use crate::error::{FsError, FsResult};
use crate::MAX_PATH;

/// Path separator
pub const SEPARATOR: char = '/';

/// Reject paths no backend can be asked to open
pub fn validate(path: &str) -> FsResult<()> {
    if path.is_empty() || path.len() > MAX_PATH || path.contains('\0') {
        return Err(FsError::InvalidParameters);
    }
    // A bare separator names a directory, never a file
    if path.chars().all(|c| c == SEPARATOR) {
        return Err(FsError::InvalidParameters);
    }
    Ok(())
}
