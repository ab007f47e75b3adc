use core::fmt::Write as _;

use crate::network::Write;
use crate::network::error::Error;

/// Response status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
}

impl Status {
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

/// Streams one response onto a connection.
///
/// The head (status line and headers) is written by [`start`](Self::start);
/// the body follows through any number of [`body`](Self::body) calls. A
/// handler that finishes without starting a response leaves
/// [`status`](Self::status) at `None` and the server answers 500 for it.
pub struct Responder<'a, W: Write> {
    out: &'a mut W,
    status: Option<Status>,
    head_only: bool,
}

impl<W: Write> core::fmt::Debug for Responder<'_, W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Responder")
            .field("status", &self.status)
            .field("head_only", &self.head_only)
            .finish()
    }
}

impl<'a, W: Write> Responder<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self {
            out,
            status: None,
            head_only: false,
        }
    }

    /// Suppress body bytes, for answering `HEAD`.
    pub(crate) fn head_only(mut self) -> Self {
        self.head_only = true;
        self
    }

    /// Status of the response started so far, if any.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// Write the status line and headers.
    ///
    /// `content_length` of `None` means the body is delimited by closing the
    /// connection. `extra` headers are written verbatim after the standard ones.
    pub fn start(
        &mut self,
        status: Status,
        content_type: &str,
        content_length: Option<usize>,
        extra: &[(&str, &str)],
    ) -> Result<(), Error> {
        if self.status.is_some() {
            return Err(Error::ProtocolError);
        }
        let mut head = HeadWriter {
            out: &mut *self.out,
            result: Ok(()),
        };
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n",
            status.code(),
            status.reason(),
            content_type
        );
        if let Some(len) = content_length {
            let _ = write!(head, "Content-Length: {}\r\n", len);
        }
        for (name, value) in extra {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
        let _ = head.write_str("\r\n");
        head.result?;

        self.status = Some(status);
        Ok(())
    }

    /// Append body bytes. Must follow [`start`](Self::start).
    pub fn body(&mut self, chunk: &[u8]) -> Result<(), Error> {
        if self.status.is_none() {
            return Err(Error::ProtocolError);
        }
        if self.head_only {
            return Ok(());
        }
        self.out.write_all(chunk)
    }

    /// Start a response and write a complete body in one go.
    pub fn send(&mut self, status: Status, content_type: &str, body: &[u8]) -> Result<(), Error> {
        self.start(status, content_type, Some(body.len()), &[])?;
        self.body(body)
    }

    /// Plain-text response, for errors and confirmations.
    pub fn text(&mut self, status: Status, message: &str) -> Result<(), Error> {
        self.send(status, "text/plain", message.as_bytes())
    }

    pub fn finish(&mut self) -> Result<(), Error> {
        self.out.flush().map_err(|_| Error::WriteError)
    }
}

/// Bridges `core::fmt` formatting onto a connection, keeping the first error.
struct HeadWriter<'a, W: Write> {
    out: &'a mut W,
    result: Result<(), Error>,
}

impl<W: Write> core::fmt::Write for HeadWriter<'_, W> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if self.result.is_ok() {
            self.result = self.out.write_all(s.as_bytes());
        }
        self.result.map_err(|_| core::fmt::Error)
    }
}
