//! Fixed-capacity RAM store.
//!
//! Useful on boards without a file system and as the reference store in
//! tests. Contents are lost on reset.

use heapless::Vec;

use super::error::Error;
use super::{FileName, FileStore, OpenMode, StoreFile, valid_name};

struct Entry<const BYTES: usize> {
    name: FileName,
    data: Vec<u8, BYTES>,
}

/// Up to `FILES` files of at most `BYTES` bytes each.
pub struct MemStore<const FILES: usize, const BYTES: usize> {
    files: Vec<Entry<BYTES>, FILES>,
}

impl<const FILES: usize, const BYTES: usize> core::fmt::Debug for MemStore<FILES, BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.files.iter().map(|e| (e.name.as_str(), e.data.len())))
            .finish()
    }
}

impl<const FILES: usize, const BYTES: usize> Default for MemStore<FILES, BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const FILES: usize, const BYTES: usize> MemStore<FILES, BYTES> {
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Raw contents of a file, for inspection.
    pub fn contents(&self, name: &str) -> Option<&[u8]> {
        self.position(name).map(|i| &self.files[i].data[..])
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|e| e.name.as_str() == name)
    }
}

/// Handle to one [`MemStore`] file.
#[derive(Debug)]
pub struct MemFile<'a, const BYTES: usize> {
    data: &'a mut Vec<u8, BYTES>,
    mode: OpenMode,
    cursor: usize,
}

impl<const BYTES: usize> StoreFile for MemFile<'_, BYTES> {
    type Error = Error;

    fn append(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.mode != OpenMode::Append {
            return Err(Error::WriteError);
        }
        // All or nothing, like a journaled write.
        self.data.extend_from_slice(bytes).map_err(|_| Error::Full)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.mode != OpenMode::Read {
            return Err(Error::ReadError);
        }
        let remaining = &self.data[self.cursor..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        Ok(n)
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<const FILES: usize, const BYTES: usize> FileStore for MemStore<FILES, BYTES> {
    type Error = Error;
    type File<'a> = MemFile<'a, BYTES>;

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::File<'_>, Self::Error> {
        if !valid_name(name) {
            return Err(Error::InvalidName);
        }
        let index = match (self.position(name), mode) {
            (Some(i), _) => i,
            (None, OpenMode::Read) => return Err(Error::NotFound),
            (None, OpenMode::Append) => {
                let entry = Entry {
                    name: FileName::try_from(name).map_err(|_| Error::InvalidName)?,
                    data: Vec::new(),
                };
                self.files.push(entry).map_err(|_| Error::Full)?;
                self.files.len() - 1
            }
        };
        Ok(MemFile {
            data: &mut self.files[index].data,
            mode,
            cursor: 0,
        })
    }

    fn exists(&mut self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
        let index = self.position(name).ok_or(Error::NotFound)?;
        self.files.swap_remove(index);
        Ok(())
    }

    fn list(&mut self, prefix: &str, visit: &mut dyn FnMut(&str)) -> Result<(), Self::Error> {
        self.files
            .iter()
            .filter(|e| e.name.starts_with(prefix))
            .for_each(|e| visit(&e.name));
        Ok(())
    }
}
