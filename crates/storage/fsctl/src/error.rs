//! Controller error types

use core::fmt;

use crate::backend::BackendError;

/// Controller result type
pub type FsResult<T> = Result<T, FsError>;

/// Status returned by every failing controller operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Illegal combination of open-mode bits
    InvalidOpenMode,
    /// Null/zero/oversized argument, or an operation the handle was not opened for
    InvalidParameters,
    /// Read-only open of a path the backend does not have
    FileNotExist,
    /// Handle was never allocated or has already been closed
    FileHandleNotExist,
    /// No session slot, descriptor or buffer memory available
    NoMem,
    /// Read attempted after the session latched end-of-file
    EndOfFile,
    /// Backend accepted fewer bytes than requested; carries the accepted count
    IncompleteFileWrite(usize),
    /// Backend I/O failure
    Failed,
    /// Unclassified failure
    Unknown,
}

impl FsError {
    /// Convert to errno-style error code
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::InvalidOpenMode => -22,         // EINVAL
            FsError::InvalidParameters => -22,       // EINVAL
            FsError::FileNotExist => -2,             // ENOENT
            FsError::FileHandleNotExist => -9,       // EBADF
            FsError::NoMem => -12,                   // ENOMEM
            FsError::EndOfFile => -61,               // ENODATA
            FsError::IncompleteFileWrite(_) => -28,  // ENOSPC
            FsError::Failed => -5,                   // EIO
            FsError::Unknown => -1,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::InvalidOpenMode => f.write_str("invalid open mode"),
            FsError::InvalidParameters => f.write_str("invalid parameters"),
            FsError::FileNotExist => f.write_str("file does not exist"),
            FsError::FileHandleNotExist => f.write_str("file handle does not exist"),
            FsError::NoMem => f.write_str("out of memory"),
            FsError::EndOfFile => f.write_str("end of file"),
            FsError::IncompleteFileWrite(n) => write!(f, "incomplete write ({} bytes written)", n),
            FsError::Failed => f.write_str("backend I/O failure"),
            FsError::Unknown => f.write_str("unknown error"),
        }
    }
}

impl From<BackendError> for FsError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => FsError::FileNotExist,
            BackendError::TooManyOpenFiles | BackendError::OutOfMemory => FsError::NoMem,
            BackendError::InvalidPath => FsError::InvalidParameters,
            BackendError::NoSpace | BackendError::BadDescriptor | BackendError::Io(_) => {
                FsError::Failed
            }
            BackendError::Other => FsError::Unknown,
        }
    }
}
