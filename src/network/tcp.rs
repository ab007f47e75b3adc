//! `std::net` adapters for hosted targets.
//!
//! [`Read::read`](super::Read::read) must return `Ok(0)` when nothing is
//! available, so every stream carries a read timeout and a timeout is
//! reported as an empty read. End of stream is an error, since a closed
//! peer is not the same thing as a quiet one.

use std::io::{self, ErrorKind};
use std::net::{TcpListener as StdListener, TcpStream};
use std::time::Duration;

use super::error::Error;
use super::{Bind, Close, Connect, Connection, Read, Write};

/// Read timeout for outbound (MQTT) streams. Kept short so `poll()` is
/// effectively non-blocking.
pub const CLIENT_READ_TIMEOUT: Duration = Duration::from_millis(5);

/// Read timeout for accepted (HTTP) streams, long enough for a request head
/// to arrive.
pub const SERVER_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// A connected TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    fn new(stream: TcpStream, read_timeout: Duration) -> Result<Self, Error> {
        stream.set_nonblocking(false).map_err(|_| Error::NotOpen)?;
        stream
            .set_read_timeout(Some(read_timeout))
            .map_err(|_| Error::NotOpen)?;
        let _ = stream.set_nodelay(true);
        Ok(Self { stream })
    }
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match io::Read::read(&mut self.stream, buf) {
            Ok(0) if !buf.is_empty() => Err(Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(0),
            Err(_) => Err(Error::ReadError),
        }
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.stream, buf).map_err(|_| Error::WriteError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.stream).map_err(|_| Error::WriteError)
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        match self.stream.shutdown(std::net::Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already gone.
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(_) => Err(Error::ConnectionClosed),
        }
    }
}

impl Connection for TcpConnection {}

/// Opens outbound TCP streams to `host:port` addresses.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl TcpConnector {
    /// Give up on a connection attempt after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connect for TcpConnector {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        use std::net::ToSocketAddrs;

        let addr = remote
            .to_socket_addrs()
            .map_err(|_| Error::InvalidAddress)?
            .next()
            .ok_or(Error::InvalidAddress)?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(|e| {
            match e.kind() {
                ErrorKind::TimedOut => Error::Timeout,
                _ => Error::ConnectionRefused,
            }
        })?;
        TcpConnection::new(stream, CLIENT_READ_TIMEOUT)
    }
}

/// A non-blocking listening socket.
#[derive(Debug)]
pub struct TcpListener {
    listener: StdListener,
}

impl TcpListener {
    /// Bind to `addr`, e.g. `0.0.0.0:80`.
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let listener = StdListener::bind(addr).map_err(|_| Error::InvalidAddress)?;
        listener
            .set_nonblocking(true)
            .map_err(|_| Error::NotOpen)?;
        Ok(Self { listener })
    }

    /// Address actually bound, useful after binding port 0.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, Error> {
        self.listener.local_addr().map_err(|_| Error::NotOpen)
    }
}

impl Bind for TcpListener {
    type Connection = TcpConnection;
    type Error = Error;

    fn accept(&mut self) -> Result<Option<Self::Connection>, Self::Error> {
        match self.listener.accept() {
            Ok((stream, _peer)) => TcpConnection::new(stream, SERVER_READ_TIMEOUT).map(Some),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(_) => Err(Error::ReadError),
        }
    }
}
