//! Read-mode engine
//!
//! Every read runs in two phases. The fetch phase pulls raw blocks from the
//! backend into the session's lookahead until the request can be answered;
//! it is the only phase that can fail, and bytes it fetched stay buffered for
//! the next attempt. The consume phase then moves normalized bytes out of the
//! lookahead and advances the cursor. A failed read therefore never moves the
//! cursor.
//!
//! Normalization turns any run of `\r` that ends in `\n` into a single `\n`.
//! A `\r` run followed by anything else is ordinary data. A `\r` run at the
//! tail of the lookahead is held back until the next byte (or end of file)
//! decides it, so a chunk edge never splits a terminator.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use log::{trace, warn};

use crate::backend::StorageBackend;
use crate::error::{FsError, FsResult};
use crate::handle::Session;

/// Read strategy for a single [`read_file`](crate::Controller::read_file) call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Up to and including the next line terminator
    Line,
    /// Up to `size_hint` bytes
    Chunk,
    /// Everything from the cursor to end of file
    All,
}

/// Where the consume phase puts its output
pub(crate) enum Dest<'a> {
    /// The session's scratch buffer, capped at `limit` bytes
    Scratch { limit: usize },
    /// A caller-provided slice
    Caller(&'a mut [u8]),
}

impl Dest<'_> {
    fn limit(&self) -> usize {
        match self {
            Dest::Scratch { limit } => *limit,
            Dest::Caller(buf) => buf.len(),
        }
    }
}

/// How much of the lookahead one request will take
#[derive(Debug, Default, PartialEq, Eq)]
struct Scan {
    /// Raw bytes covered
    raw: usize,
    /// Normalized bytes they produce
    out: usize,
    /// A line terminator was covered
    terminated: bool,
}

impl Scan {
    /// Extend the scan over newly fetched bytes
    fn advance(&mut self, buf: &VecDeque<u8>, exhausted: bool, mode: ReadMode, want: usize) {
        while self.raw < buf.len() && self.out < want {
            if mode == ReadMode::Line && self.terminated {
                break;
            }
            match buf[self.raw] {
                b'\r' => {
                    // A run of `\r` ending in `\n` is one terminator
                    let run = buf.iter().skip(self.raw).take_while(|&&b| b == b'\r').count();
                    match buf.get(self.raw + run) {
                        Some(b'\n') => {
                            self.raw += run + 1;
                            self.terminated = true;
                        }
                        Some(_) => self.raw += 1,
                        None if exhausted => self.raw += 1,
                        None => break,
                    }
                }
                b'\n' => {
                    self.raw += 1;
                    self.terminated = true;
                }
                _ => self.raw += 1,
            }
            self.out += 1;
        }
    }

    fn satisfied(&self, mode: ReadMode, want: usize) -> bool {
        match mode {
            ReadMode::Line => self.terminated,
            ReadMode::Chunk => self.out >= want,
            ReadMode::All => false,
        }
    }
}

/// Run one read against a session
///
/// Returns the number of normalized bytes produced into `dest`.
pub(crate) fn read_session<B: StorageBackend>(
    session: &mut Session<B::Descriptor>,
    backend: &mut B,
    block_size: usize,
    mode: ReadMode,
    size_hint: usize,
    mut dest: Dest<'_>,
) -> FsResult<usize> {
    if session.eof {
        return Err(FsError::EndOfFile);
    }

    let limit = dest.limit();
    let want = match mode {
        ReadMode::Chunk => {
            if size_hint == 0 {
                return Err(FsError::InvalidParameters);
            }
            if size_hint > limit {
                return Err(FsError::NoMem);
            }
            size_hint
        }
        ReadMode::Line | ReadMode::All => usize::MAX,
    };

    let scan = fetch(session, backend, block_size, mode, want, limit)?;

    if scan.out == 0 && mode != ReadMode::All {
        // Nothing left at all
        session.eof = true;
        return Err(FsError::EndOfFile);
    }

    let produced = match &mut dest {
        Dest::Caller(buf) => consume(&mut session.lookahead, scan.raw, &mut buf[..scan.out]),
        Dest::Scratch { .. } => {
            session.scratch.clear();
            session
                .scratch
                .try_reserve_exact(scan.out)
                .map_err(|_| FsError::NoMem)?;
            session.scratch.resize(scan.out, 0);
            consume(&mut session.lookahead, scan.raw, &mut session.scratch)
        }
    };
    session.cursor += scan.raw as u64;

    session.eof = match mode {
        ReadMode::All => true,
        ReadMode::Line => !scan.terminated,
        ReadMode::Chunk => produced < want,
    };

    trace!(
        "read {:?}: {} bytes ({} raw), cursor {}, eof {}",
        mode,
        produced,
        scan.raw,
        session.cursor,
        session.eof
    );
    Ok(produced)
}

/// Fill the lookahead until `mode` can be answered or the backend runs dry
fn fetch<B: StorageBackend>(
    session: &mut Session<B::Descriptor>,
    backend: &mut B,
    block_size: usize,
    mode: ReadMode,
    want: usize,
    limit: usize,
) -> FsResult<Scan> {
    let mut scan = Scan::default();
    let mut block: Vec<u8> = Vec::new();

    loop {
        scan.advance(&session.lookahead, session.exhausted, mode, want);
        if scan.out > limit {
            return Err(FsError::NoMem);
        }
        if scan.satisfied(mode, want) || (session.exhausted && scan.raw == session.lookahead.len()) {
            return Ok(scan);
        }

        if block.is_empty() {
            block.try_reserve_exact(block_size).map_err(|_| FsError::NoMem)?;
            block.resize(block_size, 0);
        }

        let n = backend.read(&mut session.descriptor, &mut block).map_err(|e| {
            warn!("{}: read failed: {:?}", backend.name(), e);
            FsError::from(e)
        })?;
        if n == 0 {
            session.exhausted = true;
            continue;
        }

        session
            .lookahead
            .try_reserve(n)
            .map_err(|_| FsError::NoMem)?;
        session.lookahead.extend(&block[..n]);
    }
}

/// Move `raw` bytes out of the lookahead, normalized into `out`
fn consume(lookahead: &mut VecDeque<u8>, raw: usize, out: &mut [u8]) -> usize {
    let mut produced = 0;
    let mut pending_cr = 0;
    for b in lookahead.drain(..raw) {
        match b {
            b'\r' => pending_cr += 1,
            b'\n' => {
                pending_cr = 0;
                out[produced] = b;
                produced += 1;
            }
            _ => {
                for _ in 0..pending_cr {
                    out[produced] = b'\r';
                    produced += 1;
                }
                pending_cr = 0;
                out[produced] = b;
                produced += 1;
            }
        }
    }
    for _ in 0..pending_cr {
        out[produced] = b'\r';
        produced += 1;
    }
    produced
}
