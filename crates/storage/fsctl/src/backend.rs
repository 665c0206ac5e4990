//! Storage backend interface
//!
//! A backend is the raw filesystem the controller sits on: the flash
//! filesystem on the target, or the host filesystem during testing. The
//! controller only ever calls the four primitives below and never assumes a
//! line-ending convention from them.

/// Backend result type
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// Path not present
    NotFound,
    /// No descriptor slots left
    TooManyOpenFiles,
    /// Backend could not allocate memory
    OutOfMemory,
    /// No space left on device
    NoSpace,
    /// Path rejected by the backend
    InvalidPath,
    /// Descriptor is not usable for the requested operation
    BadDescriptor,
    /// Driver-level I/O error (errno style)
    Io(i32),
    /// Anything else
    Other,
}

/// Open flags handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenOptions {
    /// Read access
    pub read: bool,
    /// Write access
    pub write: bool,
    /// Create if not exists
    pub create: bool,
    /// Truncate on open
    pub truncate: bool,
    /// Every write lands at end of file
    pub append: bool,
}

/// Raw storage primitives
///
/// `read` returns `Ok(0)` at end of file. Short reads and short writes are
/// legal; the controller deals with both.
pub trait StorageBackend {
    /// Backend-owned open file state
    type Descriptor;

    /// Get backend name
    fn name(&self) -> &'static str;

    /// Open (and possibly create/truncate) a file
    fn open(&mut self, path: &str, options: OpenOptions) -> BackendResult<Self::Descriptor>;

    /// Read up to `buf.len()` bytes at the descriptor's position
    fn read(&mut self, fd: &mut Self::Descriptor, buf: &mut [u8]) -> BackendResult<usize>;

    /// Write bytes, returning how many were accepted
    fn write(&mut self, fd: &mut Self::Descriptor, data: &[u8]) -> BackendResult<usize>;

    /// Close a descriptor
    fn close(&mut self, fd: Self::Descriptor) -> BackendResult<()>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for &mut T {
    type Descriptor = T::Descriptor;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, path: &str, options: OpenOptions) -> BackendResult<Self::Descriptor> {
        (**self).open(path, options)
    }

    fn read(&mut self, fd: &mut Self::Descriptor, buf: &mut [u8]) -> BackendResult<usize> {
        (**self).read(fd, buf)
    }

    fn write(&mut self, fd: &mut Self::Descriptor, data: &[u8]) -> BackendResult<usize> {
        (**self).write(fd, data)
    }

    fn close(&mut self, fd: Self::Descriptor) -> BackendResult<()> {
        (**self).close(fd)
    }
}
