//! Directory-backed store for hosted targets.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use super::error::Error;
use super::{FileStore, OpenMode, StoreFile, valid_name};

/// Stores each file as a regular file inside one directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Files live directly under `root`, which is created by `mount()`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> Result<PathBuf, Error> {
        if !valid_name(name) {
            return Err(Error::InvalidName);
        }
        Ok(self.root.join(name))
    }
}

#[derive(Debug)]
pub struct DirFile {
    file: File,
    size: usize,
}

impl StoreFile for DirFile {
    type Error = Error;

    fn append(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.file.write_all(bytes).map_err(|_| Error::WriteError)?;
        self.size += bytes.len();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.file.read(buf).map_err(|_| Error::ReadError)
    }

    fn size(&self) -> usize {
        self.size
    }

    fn close(mut self) -> Result<(), Self::Error> {
        self.file.flush().map_err(|_| Error::WriteError)?;
        self.file.sync_data().map_err(|_| Error::WriteError)
    }
}

impl FileStore for DirStore {
    type Error = Error;
    type File<'a> = DirFile;

    fn mount(&mut self) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root).map_err(|_| Error::NotMounted)
    }

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::File<'_>, Self::Error> {
        let path = self.path(name)?;
        let file = match mode {
            OpenMode::Read => File::open(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotFound,
                _ => Error::OpenError,
            })?,
            OpenMode::Append => OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|_| Error::OpenError)?,
        };
        let len = file.metadata().map_err(|_| Error::OpenError)?.len();
        let size = usize::try_from(len).map_err(|_| Error::OpenError)?;
        Ok(DirFile { file, size })
    }

    fn exists(&mut self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
        fs::remove_file(self.path(name)?).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound,
            _ => Error::RemoveError,
        })
    }

    fn list(&mut self, prefix: &str, visit: &mut dyn FnMut(&str)) -> Result<(), Self::Error> {
        let mut names: std::vec::Vec<std::string::String> = fs::read_dir(&self.root)
            .map_err(|_| Error::ReadError)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        names.iter().for_each(|name| visit(name));
        Ok(())
    }
}
