//! Omega File System Controller
//!
//! One handle-based API for opening, reading, writing and closing files,
//! whatever storage backend sits underneath (the flash filesystem on the
//! target, the host filesystem during testing).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │      Firmware / hashing pipeline     │
//! └──────────────────┬───────────────────┘
//!                    │ open/read/write/close
//! ┌──────────────────▼───────────────────┐
//! │           Controller facade          │
//! │  - Open-mode validation              │
//! │  - Handle table (generation tagged)  │
//! │  - Read engine (line/chunk/all)      │
//! │  - Write path                        │
//! └──────────────────┬───────────────────┘
//!                    │ StorageBackend trait
//! ┌─────────┬────────┴────────┬──────────┐
//! │ flashfs │     hostfs      │   ramfs  │
//! └─────────┴─────────────────┴──────────┘
//! ```
//!
//! The two real backends disagree on line endings. Every read result is
//! normalized so that `\r\n` surfaces as `\n`, which keeps content hashes
//! independent of the backend a file came from.
//!
//! ```
//! use omega_fsctl::{Controller, OpenMode, RamBackend, ReadMode};
//!
//! let mut ctl = Controller::init(RamBackend::flash());
//! let fh = ctl.open_file("boot.cfg", OpenMode::WRITING | OpenMode::OVERWRITE).unwrap();
//! ctl.write_file(fh, b"mode=fast\n", 10).unwrap();
//! ctl.close_file(fh).unwrap();
//!
//! let fh = ctl.open_file("boot.cfg", OpenMode::READING).unwrap();
//! assert_eq!(&*ctl.read_file(fh, ReadMode::Line, 0).unwrap(), b"mode=fast\n");
//! ctl.close_file(fh).unwrap();
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod backend;
pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod handle;
pub mod mode;
pub mod path;
pub mod ram;
pub mod read;
pub mod shared;
mod write;

pub use backend::{BackendError, BackendResult, OpenOptions, StorageBackend};
pub use buffer::ReadBuf;
pub use config::ControllerConfig;
pub use controller::{Controller, HandleInfo};
pub use error::{FsError, FsResult};
pub use handle::{FileHandle, HandleTable, Session};
pub use mode::{validate as validate_open_mode, OpenMode, LEGAL_MODES};
pub use ram::{BackendStats, LineEnding, RamBackend, RamDescriptor};
pub use read::ReadMode;
pub use shared::SharedController;

/// Maximum path length
pub const MAX_PATH: usize = 256;
