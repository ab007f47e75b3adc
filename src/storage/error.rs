//! Common error types for storage operations

/// A common error type for storage operations.
///
/// This enum defines a set of common errors that can occur when working with
/// a file store. It is designed to be simple and portable for `no_std`
/// environments.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The medium could not be mounted or formatted.
    NotMounted,
    /// The named file does not exist.
    NotFound,
    /// The name is empty, too long, or leaves the flat namespace.
    InvalidName,
    /// An error occurred while opening a file.
    OpenError,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// An error occurred while removing a file.
    RemoveError,
    /// No space left for the data or for another file.
    Full,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::NotMounted => "store not mounted",
            Error::NotFound => "file not found",
            Error::InvalidName => "invalid file name",
            Error::OpenError => "open failed",
            Error::WriteError => "write failed",
            Error::ReadError => "read failed",
            Error::RemoveError => "remove failed",
            Error::Full => "store full",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotMounted => defmt::write!(f, "NotMounted"),
            Error::NotFound => defmt::write!(f, "NotFound"),
            Error::InvalidName => defmt::write!(f, "InvalidName"),
            Error::OpenError => defmt::write!(f, "OpenError"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::RemoveError => defmt::write!(f, "RemoveError"),
            Error::Full => defmt::write!(f, "Full"),
        }
    }
}
