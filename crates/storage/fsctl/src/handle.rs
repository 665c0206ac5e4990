//! File handles, sessions and the handle table
//!
//! Sessions live in a dense arena. A [`FileHandle`] packs the slot index with
//! the slot's generation, so a handle that outlives its session can never
//! address whatever session reuses the slot later.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use log::warn;

use crate::backend::StorageBackend;
use crate::error::{FsError, FsResult};
use crate::mode::OpenMode;

/// Opaque file handle; zero is never issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileHandle(u64);

impl FileHandle {
    /// Invalid/unopened handle
    pub const INVALID: FileHandle = FileHandle(0);

    /// Rebuild a handle from its raw value
    pub const fn from_raw(raw: u64) -> Self {
        FileHandle(raw)
    }

    /// Raw value, suitable for passing across an FFI or IPC boundary
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Check if handle is valid
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    fn new(index: u32, generation: u32) -> Self {
        FileHandle(((generation as u64) << 32) | index as u64)
    }

    fn index(&self) -> usize {
        (self.0 & 0xFFFF_FFFF) as usize
    }

    fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl Default for FileHandle {
    fn default() -> Self {
        FileHandle::INVALID
    }
}

/// State of one open file
pub struct Session<D> {
    /// Backend descriptor
    pub(crate) descriptor: D,
    /// Mode the file was opened with
    pub(crate) mode: OpenMode,
    /// Raw backend bytes consumed by reads
    pub(crate) cursor: u64,
    /// Bytes accepted by the backend through this session
    pub(crate) written: u64,
    /// Sticky end-of-file latch
    pub(crate) eof: bool,
    /// Backend returned 0 from a read
    pub(crate) exhausted: bool,
    /// Raw bytes fetched from the backend but not yet consumed
    pub(crate) lookahead: VecDeque<u8>,
    /// Controller-owned result buffer
    pub(crate) scratch: Vec<u8>,
}

impl<D> Session<D> {
    fn new(descriptor: D, mode: OpenMode) -> Self {
        Session {
            descriptor,
            mode,
            cursor: 0,
            written: 0,
            eof: false,
            exhausted: false,
            lookahead: VecDeque::new(),
            scratch: Vec::new(),
        }
    }

    /// Mode the session was opened with
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Read cursor in raw backend bytes
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Bytes written through this session
    pub fn written(&self) -> u64 {
        self.written
    }

    /// End-of-file latched
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

struct Slot<D> {
    generation: u32,
    session: Option<Session<D>>,
}

/// Table of open sessions
pub struct HandleTable<D> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
}

impl<D> HandleTable<D> {
    /// Create a table holding at most `capacity` sessions
    pub fn new(capacity: usize) -> Self {
        HandleTable {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
        }
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.live
    }

    /// No live sessions
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// A further allocation would succeed
    pub fn has_room(&self) -> bool {
        self.live < self.capacity
    }

    /// Make sure the next [`allocate`](Self::allocate) cannot fail
    ///
    /// Fails with [`FsError::NoMem`] when the table is full or a new slot
    /// cannot be allocated.
    pub fn reserve(&mut self) -> FsResult<()> {
        if !self.has_room() {
            return Err(FsError::NoMem);
        }
        if self.free.is_empty() {
            u32::try_from(self.slots.len()).map_err(|_| FsError::NoMem)?;
            self.slots.try_reserve(1).map_err(|_| FsError::NoMem)?;
        }
        Ok(())
    }

    /// Store a new session and hand out its handle
    pub fn allocate(&mut self, descriptor: D, mode: OpenMode) -> FsResult<FileHandle> {
        if !self.has_room() {
            return Err(FsError::NoMem);
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| FsError::NoMem)?;
                self.slots.try_reserve(1).map_err(|_| FsError::NoMem)?;
                self.slots.push(Slot {
                    generation: 0,
                    session: None,
                });
                index
            }
        };

        let slot = &mut self.slots[index as usize];
        // Generation 0 is never handed out, so every handle is nonzero
        slot.generation += 1;
        slot.session = Some(Session::new(descriptor, mode));
        self.live += 1;
        Ok(FileHandle::new(index, slot.generation))
    }

    /// Find the session behind a handle
    pub fn lookup(&mut self, handle: FileHandle) -> FsResult<&mut Session<D>> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.session.as_mut())
            .ok_or(FsError::FileHandleNotExist)
    }

    /// Read-only variant of [`lookup`](Self::lookup)
    pub fn get(&self, handle: FileHandle) -> FsResult<&Session<D>> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.session.as_ref())
            .ok_or(FsError::FileHandleNotExist)
    }

    /// Detach a session from the table without closing its descriptor
    pub fn remove(&mut self, handle: FileHandle) -> FsResult<Session<D>> {
        let index = handle.index();
        let slot = self
            .slots
            .get_mut(index)
            .filter(|slot| slot.generation == handle.generation())
            .ok_or(FsError::FileHandleNotExist)?;
        let session = slot.session.take().ok_or(FsError::FileHandleNotExist)?;

        // A slot whose generation is exhausted is retired for good
        if slot.generation != u32::MAX {
            self.free.push(index as u32);
        }
        self.live -= 1;
        Ok(session)
    }

    /// Remove a session and close its descriptor
    ///
    /// The session is gone even if the backend close fails.
    pub fn release<B>(&mut self, handle: FileHandle, backend: &mut B) -> FsResult<()>
    where
        B: StorageBackend<Descriptor = D>,
    {
        let session = self.remove(handle)?;
        backend.close(session.descriptor).map_err(|e| {
            warn!("{}: close of {:#x} failed: {:?}", backend.name(), handle.as_raw(), e);
            FsError::from(e)
        })
    }

    /// Close every live session, collecting failures
    pub fn release_all<B>(&mut self, backend: &mut B) -> Vec<(FileHandle, FsError)>
    where
        B: StorageBackend<Descriptor = D>,
    {
        let mut failures = Vec::new();
        for handle in self.handles() {
            if let Err(e) = self.release(handle, backend) {
                failures.push((handle, e));
            }
        }
        failures
    }

    /// Handles of all live sessions
    pub fn handles(&self) -> Vec<FileHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.session.is_some())
            .map(|(index, slot)| FileHandle::new(index as u32, slot.generation))
            .collect()
    }
}
