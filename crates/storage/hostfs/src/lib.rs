//! Host filesystem backend
//!
//! Serves backend-relative paths out of a directory on the host, so firmware
//! logic can be exercised against real files during development. Files are
//! plain `std::fs` files and keep native `\n` line endings.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use log::debug;
use omega_fsctl::{BackendError, BackendResult, OpenOptions, StorageBackend};

/// Backend rooted at a host directory
#[derive(Debug, Clone)]
pub struct HostBackend {
    root: PathBuf,
}

impl HostBackend {
    /// Serve files below `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        HostBackend { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a backend path to a host path
    ///
    /// Leading separators are ignored; `..` and NUL are refused so a path
    /// can never leave the root.
    pub fn resolve(&self, path: &str) -> BackendResult<PathBuf> {
        if path.contains('\0') {
            return Err(BackendError::InvalidPath);
        }
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(BackendError::InvalidPath),
            }
        }
        if resolved == self.root {
            return Err(BackendError::InvalidPath);
        }
        Ok(resolved)
    }
}

fn io_error(err: io::Error) -> BackendError {
    match err.kind() {
        io::ErrorKind::NotFound => BackendError::NotFound,
        io::ErrorKind::OutOfMemory => BackendError::OutOfMemory,
        _ => match err.raw_os_error() {
            Some(24) => BackendError::TooManyOpenFiles, // EMFILE
            Some(28) => BackendError::NoSpace,          // ENOSPC
            Some(code) => BackendError::Io(-code),
            None => BackendError::Other,
        },
    }
}

impl StorageBackend for HostBackend {
    type Descriptor = File;

    fn name(&self) -> &'static str {
        "hostfs"
    }

    fn open(&mut self, path: &str, options: OpenOptions) -> BackendResult<File> {
        let host_path = self.resolve(path)?;
        debug!("hostfs: open {} -> {}", path, host_path.display());

        fs::OpenOptions::new()
            .read(options.read)
            .write(options.write && !options.append)
            .append(options.append)
            .create(options.create)
            .truncate(options.truncate)
            .open(&host_path)
            .map_err(io_error)
    }

    fn read(&mut self, fd: &mut File, buf: &mut [u8]) -> BackendResult<usize> {
        loop {
            match fd.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(e)),
            }
        }
    }

    fn write(&mut self, fd: &mut File, data: &[u8]) -> BackendResult<usize> {
        loop {
            match fd.write(data) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_error(e)),
            }
        }
    }

    fn close(&mut self, fd: File) -> BackendResult<()> {
        fd.sync_all().map_err(io_error)
    }
}
