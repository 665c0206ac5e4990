//! Read result buffers

use core::ops::Deref;

use crate::handle::FileHandle;

/// View of a controller-owned read result
///
/// The bytes live in the session's scratch buffer. The borrow ends before
/// the next controller call, which is when the storage gets reused; call
/// [`Controller::release_buffer`](crate::Controller::release_buffer) to hand
/// the memory back outright.
#[derive(Debug, Clone, Copy)]
pub struct ReadBuf<'a> {
    handle: FileHandle,
    data: &'a [u8],
    capacity: usize,
}

impl<'a> ReadBuf<'a> {
    pub(crate) fn new(handle: FileHandle, data: &'a [u8], capacity: usize) -> Self {
        debug_assert!(data.len() <= capacity);
        ReadBuf {
            handle,
            data,
            capacity,
        }
    }

    /// Handle the bytes were read from
    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    /// Bytes produced
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Size of the backing allocation
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Deref for ReadBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}
