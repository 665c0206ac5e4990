//! RAM-backed storage backend
//!
//! Stands in for the flash filesystem on the host. Can be told to store line
//! endings the way the flash driver does (`\r\n`) and to misbehave on demand
//! (short reads, short writes, I/O errors, descriptor exhaustion).

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::backend::{BackendError, BackendResult, OpenOptions, StorageBackend};

/// How `\n` is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// Stored as written
    Lf,
    /// Every `\n` written is stored as `\r\n`
    Crlf,
}

/// Backend call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub opens: usize,
    pub reads: usize,
    pub writes: usize,
    pub closes: usize,
}

impl BackendStats {
    /// Total number of backend calls
    pub fn total(&self) -> usize {
        self.opens + self.reads + self.writes + self.closes
    }
}

/// Open file on a [`RamBackend`]
#[derive(Debug)]
pub struct RamDescriptor {
    path: String,
    pos: usize,
    options: OpenOptions,
}

/// In-memory backend
#[derive(Debug)]
pub struct RamBackend {
    files: BTreeMap<String, Vec<u8>>,
    line_ending: LineEnding,
    open_descriptors: usize,
    max_descriptors: usize,
    write_limit: Option<usize>,
    read_granularity: Option<usize>,
    fail_reads: bool,
    fail_writes: bool,
    fail_closes: bool,
    stats: BackendStats,
}

impl RamBackend {
    /// Create an empty backend storing `\n` unchanged
    pub fn new() -> Self {
        RamBackend {
            files: BTreeMap::new(),
            line_ending: LineEnding::Lf,
            open_descriptors: 0,
            max_descriptors: usize::MAX,
            write_limit: None,
            read_granularity: None,
            fail_reads: false,
            fail_writes: false,
            fail_closes: false,
            stats: BackendStats::default(),
        }
    }

    /// Flash-style backend storing `\n` as `\r\n`
    pub fn flash() -> Self {
        Self::new().with_line_ending(LineEnding::Crlf)
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_max_descriptors(mut self, n: usize) -> Self {
        self.max_descriptors = n;
        self
    }

    // ========== Fault injection ==========

    /// Accept at most `n` caller bytes per write call
    pub fn set_write_limit(&mut self, n: Option<usize>) {
        self.write_limit = n;
    }

    /// Return at most `n` bytes per read call
    pub fn set_read_granularity(&mut self, n: Option<usize>) {
        self.read_granularity = n;
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn set_fail_closes(&mut self, fail: bool) {
        self.fail_closes = fail;
    }

    // ========== Inspection ==========

    /// Store a file verbatim, bypassing line-ending translation
    pub fn insert_file(&mut self, path: &str, data: &[u8]) {
        self.files.insert(String::from(path), data.to_vec());
    }

    /// Stored bytes of a file
    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|data| data.as_slice())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Descriptors currently open
    pub fn open_descriptors(&self) -> usize {
        self.open_descriptors
    }

    pub fn stats(&self) -> BackendStats {
        self.stats
    }
}

impl Default for RamBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for RamBackend {
    type Descriptor = RamDescriptor;

    fn name(&self) -> &'static str {
        match self.line_ending {
            LineEnding::Lf => "ramfs",
            LineEnding::Crlf => "flashfs",
        }
    }

    fn open(&mut self, path: &str, options: OpenOptions) -> BackendResult<RamDescriptor> {
        self.stats.opens += 1;

        if self.open_descriptors >= self.max_descriptors {
            return Err(BackendError::TooManyOpenFiles);
        }

        match self.files.get_mut(path) {
            Some(data) => {
                if options.truncate {
                    data.clear();
                }
            }
            None if options.create => {
                self.files.insert(String::from(path), Vec::new());
            }
            None => return Err(BackendError::NotFound),
        }

        self.open_descriptors += 1;
        Ok(RamDescriptor {
            path: String::from(path),
            pos: 0,
            options,
        })
    }

    fn read(&mut self, fd: &mut RamDescriptor, buf: &mut [u8]) -> BackendResult<usize> {
        self.stats.reads += 1;

        if !fd.options.read {
            return Err(BackendError::BadDescriptor);
        }
        if self.fail_reads {
            return Err(BackendError::Io(-5));
        }

        let data = self.files.get(&fd.path).ok_or(BackendError::BadDescriptor)?;
        let remaining = data.len().saturating_sub(fd.pos);
        let mut n = buf.len().min(remaining);
        if let Some(granularity) = self.read_granularity {
            n = n.min(granularity);
        }
        if n == 0 {
            return Ok(0);
        }

        buf[..n].copy_from_slice(&data[fd.pos..fd.pos + n]);
        fd.pos += n;
        Ok(n)
    }

    fn write(&mut self, fd: &mut RamDescriptor, data: &[u8]) -> BackendResult<usize> {
        self.stats.writes += 1;

        if !fd.options.write {
            return Err(BackendError::BadDescriptor);
        }
        if self.fail_writes {
            return Err(BackendError::Io(-5));
        }

        let accepted = match self.write_limit {
            Some(limit) => data.len().min(limit),
            None => data.len(),
        };
        let line_ending = self.line_ending;

        let file = self.files.get_mut(&fd.path).ok_or(BackendError::BadDescriptor)?;
        if fd.options.append {
            fd.pos = file.len();
        }

        let mut stored = Vec::with_capacity(accepted);
        for &b in &data[..accepted] {
            if b == b'\n' && line_ending == LineEnding::Crlf {
                stored.push(b'\r');
            }
            stored.push(b);
        }

        let end = fd.pos + stored.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[fd.pos..end].copy_from_slice(&stored);
        fd.pos = end;
        Ok(accepted)
    }

    fn close(&mut self, _fd: RamDescriptor) -> BackendResult<()> {
        self.stats.closes += 1;
        self.open_descriptors -= 1;

        if self.fail_closes {
            return Err(BackendError::Io(-5));
        }
        Ok(())
    }
}
