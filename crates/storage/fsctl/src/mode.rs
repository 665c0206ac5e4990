//! Open-mode bits and their validation

use bitflags::bitflags;

use crate::backend::OpenOptions;
use crate::error::{FsError, FsResult};

bitflags! {
    /// File open mode
    ///
    /// Only five combinations are legal, see [`validate`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        /// Read access; on its own the file must already exist
        const READING = 1 << 0;
        /// Write access; creates the file if absent
        const WRITING = 1 << 1;
        /// Preserve content, writes land at end of file
        const APPEND = 1 << 2;
        /// Truncate existing content
        const OVERWRITE = 1 << 3;
    }
}

/// Every legal open-mode combination
pub const LEGAL_MODES: [OpenMode; 5] = [
    OpenMode::READING,
    OpenMode::WRITING.union(OpenMode::OVERWRITE),
    OpenMode::WRITING.union(OpenMode::APPEND),
    OpenMode::READING.union(OpenMode::WRITING).union(OpenMode::OVERWRITE),
    OpenMode::READING.union(OpenMode::WRITING).union(OpenMode::APPEND),
];

/// Check that `mode` is one of the legal combinations
///
/// Bits outside the four defined flags are rejected too.
pub fn validate(mode: OpenMode) -> FsResult<()> {
    if LEGAL_MODES.iter().any(|legal| legal.bits() == mode.bits()) {
        Ok(())
    } else {
        Err(FsError::InvalidOpenMode)
    }
}

impl OpenMode {
    /// Session may be read
    pub fn can_read(&self) -> bool {
        self.contains(OpenMode::READING)
    }

    /// Session may be written
    pub fn can_write(&self) -> bool {
        self.contains(OpenMode::WRITING)
    }

    /// Backend flags for a validated mode
    pub fn to_options(&self) -> OpenOptions {
        let write = self.can_write();
        OpenOptions {
            read: self.can_read(),
            write,
            create: write,
            truncate: write && self.contains(OpenMode::OVERWRITE),
            append: write && self.contains(OpenMode::APPEND),
        }
    }
}
