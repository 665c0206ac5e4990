//! Controller configuration

use log::warn;

/// Default number of simultaneously open files
pub const DEFAULT_MAX_OPEN_FILES: usize = 64;

/// Default backend read granularity
pub const DEFAULT_READ_BLOCK_SIZE: usize = 512;

/// Default cap on a single read result (64KB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Tunables for a [`Controller`](crate::Controller)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Handle table capacity
    pub max_open_files: usize,
    /// Bytes requested per backend read
    pub read_block_size: usize,
    /// Largest result a single read may produce
    pub max_buffer_size: usize,
}

impl ControllerConfig {
    /// Default configuration
    pub const fn new() -> Self {
        ControllerConfig {
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// Set the handle table capacity
    pub const fn with_max_open_files(mut self, n: usize) -> Self {
        self.max_open_files = n;
        self
    }

    /// Set the bytes requested per backend read
    pub const fn with_read_block_size(mut self, n: usize) -> Self {
        self.read_block_size = n;
        self
    }

    /// Set the cap on a single read result
    pub const fn with_max_buffer_size(mut self, n: usize) -> Self {
        self.max_buffer_size = n;
        self
    }

    /// Clamp zero-sized fields to 1
    pub(crate) fn sanitized(mut self) -> Self {
        for (name, field) in [
            ("max_open_files", &mut self.max_open_files),
            ("read_block_size", &mut self.read_block_size),
            ("max_buffer_size", &mut self.max_buffer_size),
        ] {
            if *field == 0 {
                warn!("config: {} is zero, using 1", name);
                *field = 1;
            }
        }
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}
