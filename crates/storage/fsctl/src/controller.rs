//! Controller facade

use alloc::vec::Vec;
use log::{debug, warn};

use crate::backend::StorageBackend;
use crate::buffer::ReadBuf;
use crate::config::ControllerConfig;
use crate::error::{FsError, FsResult};
use crate::handle::{FileHandle, HandleTable};
use crate::mode::{self, OpenMode};
use crate::path;
use crate::read::{self, Dest, ReadMode};
use crate::write;

/// Snapshot of a session's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleInfo {
    /// Mode the file was opened with
    pub mode: OpenMode,
    /// Raw backend bytes consumed by reads
    pub read_cursor: u64,
    /// Bytes accepted by the backend through this handle
    pub bytes_written: u64,
    /// End-of-file latched
    pub eof: bool,
    /// Raw bytes fetched but not yet returned
    pub buffered: usize,
}

/// File system controller
///
/// Owns the backend and every open session. Create with
/// [`init`](Self::init), tear down with [`deinit`](Self::deinit).
pub struct Controller<B: StorageBackend> {
    backend: B,
    config: ControllerConfig,
    handles: HandleTable<B::Descriptor>,
}

impl<B: StorageBackend> Controller<B> {
    /// Create a controller with the default configuration
    pub fn init(backend: B) -> Self {
        Self::with_config(backend, ControllerConfig::default())
    }

    /// Create a controller with an explicit configuration
    pub fn with_config(backend: B, config: ControllerConfig) -> Self {
        let config = config.sanitized();
        debug!(
            "{}: controller up, {} handles, {} byte blocks",
            backend.name(),
            config.max_open_files,
            config.read_block_size
        );
        Controller {
            handles: HandleTable::new(config.max_open_files),
            backend,
            config,
        }
    }

    /// Close every open file and give the backend back
    pub fn deinit(mut self) -> B {
        let failures = self.close_all();
        if !failures.is_empty() {
            warn!(
                "{}: {} descriptor(s) failed to close on deinit",
                self.backend.name(),
                failures.len()
            );
        }
        debug!("{}: controller down", self.backend.name());
        self.backend
    }

    /// Close every open file, best-effort
    ///
    /// Returns the handles whose backend close failed; those sessions are
    /// released regardless.
    pub fn close_all(&mut self) -> Vec<(FileHandle, FsError)> {
        self.handles.release_all(&mut self.backend)
    }

    // ========== Open / Close ==========

    /// Open a file
    ///
    /// A `READING`-only open requires the file to exist. Write modes create
    /// it, truncating (`OVERWRITE`) or preserving (`APPEND`) any content.
    pub fn open_file(&mut self, path: &str, mode: OpenMode) -> FsResult<FileHandle> {
        mode::validate(mode)?;
        path::validate(path)?;
        // Slot memory comes first so a failed allocation cannot strand a descriptor
        self.handles.reserve()?;

        let descriptor = self
            .backend
            .open(path, mode.to_options())
            .map_err(|e| {
                debug!("{}: open {} failed: {:?}", self.backend.name(), path, e);
                FsError::from(e)
            })?;

        let handle = self.handles.allocate(descriptor, mode)?;
        debug!("open {} {:?} -> {:#x}", path, mode, handle.as_raw());
        Ok(handle)
    }

    /// Close a file
    ///
    /// A second close of the same handle fails with
    /// [`FsError::FileHandleNotExist`].
    pub fn close_file(&mut self, handle: FileHandle) -> FsResult<()> {
        self.handles.release(handle, &mut self.backend)?;
        debug!("close {:#x}", handle.as_raw());
        Ok(())
    }

    // ========== Read / Write ==========

    /// Read into a controller-owned buffer
    ///
    /// `size_hint` is the byte count for [`ReadMode::Chunk`] and ignored
    /// otherwise. The returned view borrows the controller; its storage is
    /// reused by the next read on the same handle.
    pub fn read_file(
        &mut self,
        handle: FileHandle,
        mode: ReadMode,
        size_hint: usize,
    ) -> FsResult<ReadBuf<'_>> {
        let session = self.handles.lookup(handle)?;
        if !session.mode.can_read() {
            return Err(FsError::InvalidParameters);
        }

        let dest = Dest::Scratch {
            limit: self.config.max_buffer_size,
        };
        let n = read::read_session(
            session,
            &mut self.backend,
            self.config.read_block_size,
            mode,
            size_hint,
            dest,
        )?;
        Ok(ReadBuf::new(handle, &session.scratch[..n], session.scratch.capacity()))
    }

    /// Read into a caller-provided buffer
    ///
    /// Fails with [`FsError::NoMem`], consuming nothing, if the result would
    /// not fit in `buf`.
    pub fn read_file_into(
        &mut self,
        handle: FileHandle,
        mode: ReadMode,
        size_hint: usize,
        buf: &mut [u8],
    ) -> FsResult<usize> {
        let session = self.handles.lookup(handle)?;
        if !session.mode.can_read() {
            return Err(FsError::InvalidParameters);
        }
        if buf.is_empty() {
            return Err(FsError::InvalidParameters);
        }

        read::read_session(
            session,
            &mut self.backend,
            self.config.read_block_size,
            mode,
            size_hint,
            Dest::Caller(buf),
        )
    }

    /// Free the controller-owned buffer of a handle
    pub fn release_buffer(&mut self, handle: FileHandle) -> FsResult<()> {
        let session = self.handles.lookup(handle)?;
        session.scratch = Vec::new();
        Ok(())
    }

    /// Write the first `count` bytes of `buf`
    pub fn write_file(&mut self, handle: FileHandle, buf: &[u8], count: usize) -> FsResult<usize> {
        let session = self.handles.lookup(handle)?;
        if !session.mode.can_write() {
            return Err(FsError::InvalidParameters);
        }
        if count == 0 || count > buf.len() {
            return Err(FsError::InvalidParameters);
        }

        write::write_session(session, &mut self.backend, &buf[..count])
    }

    // ========== Introspection ==========

    /// State of an open handle
    pub fn handle_info(&self, handle: FileHandle) -> FsResult<HandleInfo> {
        let session = self.handles.get(handle)?;
        Ok(HandleInfo {
            mode: session.mode(),
            read_cursor: session.cursor(),
            bytes_written: session.written(),
            eof: session.is_eof(),
            buffered: session.lookahead.len(),
        })
    }

    /// Number of open files
    pub fn open_count(&self) -> usize {
        self.handles.len()
    }

    /// Effective configuration after clamping
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Storage backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Storage backend, for inspection and fault injection
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
