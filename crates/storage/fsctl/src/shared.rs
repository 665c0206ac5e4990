//! Controller shared between threads
//!
//! The plain [`Controller`] needs `&mut self` for everything, which is all a
//! single-threaded firmware loop needs. When several tasks share one
//! controller, wrap it here: the lock serializes allocate/lookup/release on
//! the handle table while sessions stay independent of each other.

use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

use crate::backend::StorageBackend;
use crate::controller::Controller;
use crate::error::FsResult;
use crate::handle::FileHandle;
use crate::mode::OpenMode;
use crate::read::ReadMode;

/// Lock-protected controller
pub struct SharedController<B: StorageBackend> {
    inner: Mutex<Controller<B>>,
}

impl<B: StorageBackend> SharedController<B> {
    /// Wrap a controller
    pub fn new(controller: Controller<B>) -> Self {
        SharedController {
            inner: Mutex::new(controller),
        }
    }

    /// Lock for a compound operation
    pub fn lock(&self) -> MutexGuard<'_, Controller<B>> {
        self.inner.lock()
    }

    /// Take the controller back out
    pub fn into_inner(self) -> Controller<B> {
        self.inner.into_inner()
    }

    pub fn open_file(&self, path: &str, mode: OpenMode) -> FsResult<FileHandle> {
        self.lock().open_file(path, mode)
    }

    pub fn close_file(&self, handle: FileHandle) -> FsResult<()> {
        self.lock().close_file(handle)
    }

    pub fn read_file_into(
        &self,
        handle: FileHandle,
        mode: ReadMode,
        size_hint: usize,
        buf: &mut [u8],
    ) -> FsResult<usize> {
        self.lock().read_file_into(handle, mode, size_hint, buf)
    }

    /// Read into a fresh vector
    ///
    /// The controller-owned buffer cannot outlive the lock, so its contents
    /// are copied out before the lock is dropped.
    pub fn read_to_vec(&self, handle: FileHandle, mode: ReadMode, size_hint: usize) -> FsResult<Vec<u8>> {
        let mut ctl = self.lock();
        let buf = ctl.read_file(handle, mode, size_hint)?;
        Ok(buf.as_bytes().to_vec())
    }

    pub fn write_file(&self, handle: FileHandle, buf: &[u8], count: usize) -> FsResult<usize> {
        self.lock().write_file(handle, buf, count)
    }
}
