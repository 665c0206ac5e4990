//! Omega content hashing
//!
//! Streams file content through SHA-256 after the controller has normalized
//! line endings, so a file hashes the same whether it came off flash
//! (`\r\n`) or the host (`\n`).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::string::String;
use log::debug;
use omega_fsctl::{Controller, FileHandle, FsError, FsResult, OpenMode, ReadMode, StorageBackend};
use sha2::{Digest as _, Sha256};

/// SHA-256 digest
pub type Digest = [u8; 32];

/// Digest length in bytes
pub const DIGEST_LEN: usize = 32;

/// Incremental SHA-256
#[derive(Clone, Default)]
pub struct HashController {
    ctx: Sha256,
    bytes: u64,
}

impl HashController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any data hashed so far
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.bytes = 0;
    }

    /// Feed bytes
    pub fn update(&mut self, data: &[u8]) {
        self.ctx.update(data);
        self.bytes += data.len() as u64;
    }

    /// Produce the digest and start over
    pub fn finish(&mut self) -> Digest {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&self.ctx.finalize_reset());
        self.bytes = 0;
        out
    }

    /// Bytes fed since the last reset
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }
}

/// How [`hash_file`] pulls content from the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    /// One line per read
    Lines,
    /// Fixed-size chunks
    Chunks(usize),
    /// The whole file in one read
    Whole,
}

impl HashStrategy {
    fn read_mode(&self) -> (ReadMode, usize) {
        match *self {
            HashStrategy::Lines => (ReadMode::Line, 0),
            HashStrategy::Chunks(n) => (ReadMode::Chunk, n),
            HashStrategy::Whole => (ReadMode::All, 0),
        }
    }
}

/// Hash the normalized content of `path`
///
/// The handle is closed on every path out, including read failures.
pub fn hash_file<B: StorageBackend>(
    ctl: &mut Controller<B>,
    path: &str,
    strategy: HashStrategy,
) -> FsResult<Digest> {
    let handle = ctl.open_file(path, OpenMode::READING)?;
    let mut hasher = HashController::new();

    let fed = feed(ctl, handle, strategy, &mut hasher);
    let closed = ctl.close_file(handle);
    fed?;
    closed?;

    debug!("hashed {}: {} bytes", path, hasher.bytes_hashed());
    Ok(hasher.finish())
}

fn feed<B: StorageBackend>(
    ctl: &mut Controller<B>,
    handle: FileHandle,
    strategy: HashStrategy,
    hasher: &mut HashController,
) -> FsResult<()> {
    let (mode, size_hint) = strategy.read_mode();
    loop {
        match ctl.read_file(handle, mode, size_hint) {
            Ok(buf) => hasher.update(&buf),
            Err(FsError::EndOfFile) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Lowercase hex rendering of a digest
pub fn to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}
