//! # Persistent store abstraction
//!
//! This module defines the narrow file-system contract the log store relies
//! on, plus two implementations of it. The contract is deliberately smaller
//! than a real file system: a flat namespace of named, append-only files.
//!
//! # Design Philosophy
//!
//! - **Open, write, close**: callers never hold a file across ticks. Every
//!   append is a complete [`open`](FileStore::open) / [`append`](StoreFile::append)
//!   / [`close`](StoreFile::close) sequence, so a reset can at worst lose the
//!   line being written.
//! - **Technology Agnostic**: LittleFS, FAT on SD, SPIFFS or a host directory
//!   all fit behind [`FileStore`].
//! - **Embedded-First**: no allocation; listing is done through a visitor so
//!   the number of files is not bounded by a buffer.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │    Log Store    │    │  Log Browser    │    │   Bulk Clear    │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!           │                        │                        │
//!           ▼                        ▼                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                FileStore / StoreFile (this module)              │
//! └─────────────────────────────────────────────────────────────────┘
//!           │                                                 │
//!           ▼                                                 ▼
//! ┌───────────────────────┐                     ┌───────────────────────┐
//! │  MemStore (RAM, any)  │                     │  DirStore (std only)  │
//! └───────────────────────┘                     └───────────────────────┘
//! ```
//!
//! # Usage Examples
//!
//! ```rust
//! use presslog::storage::{FileStore, MemStore, OpenMode, StoreFile};
//!
//! let mut store: MemStore<4, 256> = MemStore::new();
//! let mut file = store.open("log-unknown.txt", OpenMode::Append).unwrap();
//! file.append(b"unknown-time Blue\n").unwrap();
//! file.close().unwrap();
//!
//! let mut names = 0;
//! store.list("log-", &mut |_name: &str| names += 1).unwrap();
//! assert_eq!(names, 1);
//! ```

#![allow(missing_docs)]
#![deny(unsafe_code)]

pub mod error;

mod mem;

#[cfg(feature = "std")]
mod dir;


pub use mem::{MemFile, MemStore};

#[cfg(feature = "std")]
pub use dir::{DirFile, DirStore};

/// Longest file name any store must support.
pub const MAX_NAME_LEN: usize = 32;

/// A file name in the store's flat namespace.
pub type FileName = heapless::String<MAX_NAME_LEN>;

pub mod prelude {
    pub use super::{FileStore, OpenMode, StoreFile};
}

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Sequential reads from the start. The file must exist.
    Read,
    /// Writes go to the end. The file is created if missing.
    Append,
}

/// An open file.
pub trait StoreFile {
    type Error: core::fmt::Debug;

    /// Append bytes at the end of the file.
    fn append(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read the next bytes. Returns `Ok(0)` at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Current size in bytes.
    fn size(&self) -> usize;

    /// Commit and release the file.
    fn close(self) -> Result<(), Self::Error>;
}

/// A flat namespace of named files.
pub trait FileStore {
    type Error: core::fmt::Debug;

    type File<'a>: StoreFile<Error = Self::Error>
    where
        Self: 'a;

    /// Bring the medium up. Called once at startup; nothing else may be
    /// used if it fails.
    fn mount(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::File<'_>, Self::Error>;

    fn exists(&mut self, name: &str) -> bool;

    fn remove(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Call `visit` with every file name starting with `prefix`.
    fn list(&mut self, prefix: &str, visit: &mut dyn FnMut(&str)) -> Result<(), Self::Error>;
}

/// Names must be non-empty, fit [`MAX_NAME_LEN`] and stay inside the
/// flat namespace.
pub(crate) fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name != "."
        && name != ".."
        && !name.contains(&['/', '\\'][..])
}
