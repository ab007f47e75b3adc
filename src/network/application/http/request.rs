use crate::network::Read;
use crate::network::error::Error;
use heapless::{String, Vec};

/// Maximum number of request headers kept after parsing.
pub const MAX_HEADERS: usize = 16;
/// Largest request head (request line + headers) accepted.
pub const MAX_REQUEST_SIZE: usize = 1024;
/// Consecutive empty reads tolerated before a half-sent request head is abandoned.
/// Each one is a full `SERVER_READ_TIMEOUT` on the host TCP adapter.
pub const MAX_IDLE_READS: u32 = 2;

/// HTTP request methods understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "POST" => Some(Method::Post),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// A parsed request head, borrowing from the receive buffer.
#[derive(Debug)]
pub struct Request<'a> {
    /// `None` when the client used a method the server does not implement.
    pub method: Option<Method>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: Vec<Header<'a>, MAX_HEADERS>,
}

impl<'a> Request<'a> {
    /// Parse a request head. The body, if any, is ignored.
    pub fn parse(data: &'a [u8]) -> Result<Self, Error> {
        let head_end = find_slice(data, b"\r\n\r\n").unwrap_or(data.len());
        let head = core::str::from_utf8(&data[..head_end]).map_err(|_| Error::ProtocolError)?;
        let mut lines = head.split("\r\n");

        // Request line
        let request_line = lines.next().ok_or(Error::ProtocolError)?;
        let mut parts = request_line.splitn(3, ' ');
        let method = Method::parse(parts.next().ok_or(Error::ProtocolError)?);
        let target = parts.next().ok_or(Error::ProtocolError)?;
        let version = parts.next().ok_or(Error::ProtocolError)?;
        if !version.starts_with("HTTP/1.") || !target.starts_with('/') {
            return Err(Error::ProtocolError);
        }

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        // Headers
        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or(Error::ProtocolError)?;
            headers
                .push(Header {
                    name: name.trim(),
                    value: value.trim(),
                })
                .map_err(|_| Error::BufferOverflow)?;
        }

        Ok(Request {
            method,
            path,
            query,
            headers,
        })
    }

    /// Raw (still percent-encoded) value of a query parameter.
    ///
    /// A parameter present without `=` yields `Some("")`.
    pub fn query_param(&self, name: &str) -> Option<&'a str> {
        self.query?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then_some(value)
        })
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value)
    }
}

/// Read from `connection` until the end of the request head.
///
/// Returns the number of bytes placed in `buf`.
pub(crate) fn read_head<R: Read>(connection: &mut R, buf: &mut [u8]) -> Result<usize, Error> {
    let mut total_read = 0;
    let mut idle = 0;
    loop {
        if total_read >= buf.len() {
            return Err(Error::BufferOverflow);
        }
        match connection.read(&mut buf[total_read..]) {
            Ok(0) => {
                idle += 1;
                if idle > MAX_IDLE_READS {
                    return Err(Error::Timeout);
                }
            }
            Ok(n) => {
                idle = 0;
                // Only the tail can complete the terminator.
                let scan_from = total_read.saturating_sub(3);
                total_read += n;
                if find_slice(&buf[scan_from..total_read], b"\r\n\r\n").is_some() {
                    return Ok(total_read);
                }
            }
            Err(_) => return Err(Error::ReadError),
        }
    }
}

/// Decode `%XX` escapes and `+` in a query value.
pub fn percent_decode<const N: usize>(raw: &str) -> Result<String<N>, Error> {
    let mut out: Vec<u8, N> = Vec::new();
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let byte = match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or(Error::ProtocolError)?;
                i += 2;
                (hex_value(hex[0])? << 4) | hex_value(hex[1])?
            }
            b'+' => b' ',
            other => other,
        };
        out.push(byte).map_err(|_| Error::BufferOverflow)?;
        i += 1;
    }
    String::from_utf8(out).map_err(|_| Error::ProtocolError)
}

fn hex_value(digit: u8) -> Result<u8, Error> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(Error::ProtocolError),
    }
}

fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
