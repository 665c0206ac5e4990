//! Write path

use log::{trace, warn};

use crate::backend::StorageBackend;
use crate::error::{FsError, FsResult};
use crate::handle::Session;

/// Hand `data` to the backend in a single write call
///
/// A short write is reported as [`FsError::IncompleteFileWrite`] carrying the
/// accepted count; the session's write counter includes those bytes. A
/// backend error leaves the counter untouched.
pub(crate) fn write_session<B: StorageBackend>(
    session: &mut Session<B::Descriptor>,
    backend: &mut B,
    data: &[u8],
) -> FsResult<usize> {
    let written = backend.write(&mut session.descriptor, data).map_err(|e| {
        warn!("{}: write failed: {:?}", backend.name(), e);
        FsError::from(e)
    })?;

    // Never trust a backend that claims more than it was given
    let written = written.min(data.len());
    session.written += written as u64;

    if written < data.len() {
        warn!(
            "{}: short write, {} of {} bytes accepted",
            backend.name(),
            written,
            data.len()
        );
        return Err(FsError::IncompleteFileWrite(written));
    }

    trace!("write: {} bytes, {} total", written, session.written);
    Ok(written)
}
