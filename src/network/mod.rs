//! Network abstraction layer for the event-logging agent.
//!
//! The agent never talks to a socket directly. Everything it needs from the
//! network is expressed as a small set of traits that a board support crate
//! (or the TCP adapters behind the `std` feature) implements:
//!
//! - [`Read`], [`Write`], [`Close`] and [`Connection`] model a byte stream.
//! - [`Connect`] opens outbound streams (used by the MQTT channel).
//! - [`Bind`] accepts inbound streams (used by the HTTP log browser).
//! - [`Connectivity`] reports whether the device has joined a network at all.
//!
//! Protocol implementations built on top of these live in [`application`].

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application layer protocols (HTTP server side, MQTT client).
pub mod application;

/// TCP adapters for hosted targets.
#[cfg(feature = "std")]
pub mod tcp;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Bind, Close, Connect, Connection, Connectivity, Read, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection.
    ///
    /// Returns `Ok(0)` when no data is currently available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write the whole buffer, looping over short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<(), error::Error> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(error::Error::ConnectionClosed),
                Ok(n) => buf = &buf[n..],
                Err(_) => return Err(error::Error::WriteError),
            }
        }
        Ok(())
    }
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// A synchronous binder (server)
pub trait Bind {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Poll for a pending inbound connection on the bound address.
    ///
    /// Returns `Ok(None)` when nobody is waiting, so the caller can keep
    /// running its tick loop.
    fn accept(&mut self) -> Result<Option<Self::Connection>, Self::Error>;
}

/// Network join state of the device.
///
/// Implemented by whatever owns the Wi-Fi/Ethernet stack. The agent only
/// asks the question; joining and address acquisition happen elsewhere.
pub trait Connectivity {
    /// `true` once the device has an address and can open connections.
    fn is_connected(&self) -> bool;
}

/// Connectivity for targets that are always attached (tests, hosted runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

impl Connectivity for AlwaysConnected {
    fn is_connected(&self) -> bool {
        true
    }
}
