//! HTTP log browser.
//!
//! | Route                      | Answer                                      |
//! |----------------------------|---------------------------------------------|
//! | `GET /`                    | HTML list of log files with links           |
//! | `GET /log?file=<name>`     | raw file bytes, `ETag` = CRC-32, else 404   |
//! | `GET /clear-log?file=<name>` | deletes the file, 200 or 404              |
//! | `GET /status`              | JSON health summary                         |
//!
//! A missing or malformed `file` parameter is answered with 400. A
//! well-formed name that is not a log file, or does not exist, is 404.
//! There is no authentication: anyone who can reach the device can read
//! and delete its logs.

use heapless::String;
use serde::Serialize;

use crate::logbook::{LogError, LogStore};
use crate::network::application::http::{
    Method, Request, Responder, Router, Status, percent_decode, serve,
};
use crate::network::error::Error;
use crate::network::{Read, Write};
use crate::storage::{FileName, FileStore, MAX_NAME_LEN, StoreFile};

/// Number of registered routes.
pub const ROUTE_COUNT: usize = 4;

/// Health flags reported by `GET /status`, snapshotted by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    /// Forwarding channel connected.
    pub channel: bool,
    /// Clock produced a valid time on the last resolution.
    pub clock: bool,
}

/// State shared by the handlers for one request.
#[derive(Debug)]
pub struct RetrievalContext<'a, S> {
    /// The log store being browsed.
    pub log: &'a mut LogStore<S>,
    /// Health snapshot.
    pub health: Health,
}

#[derive(Serialize)]
struct StatusDoc {
    files: usize,
    channel: bool,
    clock: bool,
    store: bool,
}

/// Route table for the log browser.
pub fn routes<'a, S: FileStore, W: Write>()
-> Result<Router<RetrievalContext<'a, S>, W, ROUTE_COUNT>, Error> {
    let mut router = Router::new();
    router.route(Method::Get, "/", list_files::<S, W>)?;
    router.route(Method::Get, "/log", get_file::<S, W>)?;
    router.route(Method::Get, "/clear-log", clear_file::<S, W>)?;
    router.route(Method::Get, "/status", status::<S, W>)?;
    Ok(router)
}

/// Answer one request arriving on `connection`.
pub fn serve_request<S: FileStore, C: Read + Write>(
    log: &mut LogStore<S>,
    health: Health,
    connection: &mut C,
) -> Result<Status, Error> {
    let router = routes::<S, C>()?;
    let mut ctx = RetrievalContext { log, health };
    serve(&router, connection, &mut ctx)
}

/// Validated `file` query parameter.
///
/// Missing, empty, longer than [`MAX_NAME_LEN`], containing a path
/// separator, `..` or a control/non-ASCII byte: 400.
fn file_param(request: &Request<'_>) -> Result<FileName, Status> {
    let raw = request.query_param("file").ok_or(Status::BadRequest)?;
    let name: String<MAX_NAME_LEN> = percent_decode(raw).map_err(|_| Status::BadRequest)?;
    let malformed = name.is_empty()
        || name.contains(&['/', '\\'][..])
        || name.contains("..")
        || name.bytes().any(|b| !(0x20..0x7f).contains(&b));
    if malformed {
        return Err(Status::BadRequest);
    }
    Ok(name)
}

fn bad_request<W: Write>(res: &mut Responder<'_, W>) -> Result<(), Error> {
    res.text(Status::BadRequest, "Missing or invalid file parameter")
}

fn list_files<S: FileStore, W: Write>(
    _request: &Request<'_>,
    ctx: &mut RetrievalContext<'_, S>,
    res: &mut Responder<'_, W>,
) -> Result<(), Error> {
    if !ctx.log.is_mounted() {
        return res.text(Status::InternalServerError, "Storage unavailable");
    }

    res.start(Status::Ok, "text/html; charset=utf-8", None, &[])?;
    res.body(b"<!DOCTYPE html><html><head><title>Logs</title></head><body><h1>Log files</h1><ul>")?;

    let mut written: Result<(), Error> = Ok(());
    let listed = ctx.log.list_log_files(|name: &str| {
        if written.is_err() {
            return;
        }
        // Log names are `[a-z0-9.-]` only, so no escaping is needed.
        written = [
            "<li><a href=\"/log?file=",
            name,
            "\">",
            name,
            "</a> <a href=\"/clear-log?file=",
            name,
            "\">delete</a></li>",
        ]
        .iter()
        .try_for_each(|part| res.body(part.as_bytes()));
    });
    written?;
    listed.map_err(|_| Error::ReadError)?;

    res.body(b"</ul></body></html>")
}

fn get_file<S: FileStore, W: Write>(
    request: &Request<'_>,
    ctx: &mut RetrievalContext<'_, S>,
    res: &mut Responder<'_, W>,
) -> Result<(), Error> {
    let Ok(name) = file_param(request) else {
        return bad_request(res);
    };

    // First pass for the checksum and length, second to stream.
    let (len, crc) = match checksum(ctx.log, &name) {
        Ok(summary) => summary,
        Err(LogError::NotFound) => return res.text(Status::NotFound, "File not found"),
        Err(_) => return res.text(Status::InternalServerError, "Read failed"),
    };
    let mut file = match ctx.log.open(&name) {
        Ok(file) => file,
        Err(_) => return res.text(Status::InternalServerError, "Read failed"),
    };

    let mut etag: String<10> = String::new();
    let _ = core::fmt::Write::write_fmt(&mut etag, format_args!("\"{:08x}\"", crc));
    res.start(
        Status::Ok,
        "text/plain; charset=utf-8",
        Some(len),
        &[("ETag", etag.as_str())],
    )?;

    let mut buf = [0u8; 256];
    let mut sent = 0;
    while sent < len {
        let n = file.read(&mut buf).map_err(|_| Error::ReadError)?;
        if n == 0 {
            break;
        }
        let n = n.min(len - sent);
        res.body(&buf[..n])?;
        sent += n;
    }
    let _ = file.close();
    Ok(())
}

/// Length and CRC-32 of a log file.
fn checksum<S: FileStore>(log: &mut LogStore<S>, name: &str) -> Result<(usize, u32), LogError> {
    let mut file = log.open(name)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut len = 0;
    let mut buf = [0u8; 256];
    loop {
        let n = file.read(&mut buf).map_err(|_| LogError::Read)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        len += n;
    }
    let _ = file.close();
    Ok((len, hasher.finalize()))
}

fn clear_file<S: FileStore, W: Write>(
    request: &Request<'_>,
    ctx: &mut RetrievalContext<'_, S>,
    res: &mut Responder<'_, W>,
) -> Result<(), Error> {
    let Ok(name) = file_param(request) else {
        return bad_request(res);
    };
    match ctx.log.remove(&name) {
        Ok(()) => {
            info!("deleted {} over http", name.as_str());
            res.text(Status::Ok, "File deleted")
        }
        Err(LogError::NotFound) => res.text(Status::NotFound, "File not found"),
        Err(_) => {
            warn!("could not delete {}", name.as_str());
            res.text(Status::InternalServerError, "Delete failed")
        }
    }
}

fn status<S: FileStore, W: Write>(
    _request: &Request<'_>,
    ctx: &mut RetrievalContext<'_, S>,
    res: &mut Responder<'_, W>,
) -> Result<(), Error> {
    let doc = StatusDoc {
        files: ctx.log.count().unwrap_or(0),
        channel: ctx.health.channel,
        clock: ctx.health.clock,
        store: ctx.log.is_mounted(),
    };
    let mut buf = [0u8; 96];
    let len = serde_json_core::to_slice(&doc, &mut buf).map_err(|_| Error::BufferOverflow)?;
    res.send(Status::Ok, "application/json", &buf[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(target: &str) -> Result<FileName, Status> {
        let mut raw: heapless::Vec<u8, 128> = heapless::Vec::new();
        raw.extend_from_slice(b"GET ").unwrap();
        raw.extend_from_slice(target.as_bytes()).unwrap();
        raw.extend_from_slice(b" HTTP/1.1\r\n\r\n").unwrap();
        let request = Request::parse(&raw).unwrap();
        file_param(&request)
    }

    #[test]
    fn test_file_param_validation() {
        assert_eq!(param("/log?file=log-unknown.txt").unwrap().as_str(), "log-unknown.txt");
        assert_eq!(param("/log?file=log%2D2024-01-01.txt").unwrap().as_str(), "log-2024-01-01.txt");

        for bad in [
            "/log",
            "/log?file",
            "/log?file=",
            "/log?file=../secret",
            "/log?file=a%2Fb",
            "/log?file=a%5Cb",
            "/log?file=%00",
            "/log?file=%zz",
            "/log?file=0123456789012345678901234567890123",
        ] {
            assert_eq!(param(bad), Err(Status::BadRequest), "{bad}");
        }

        // Well-formed but not a log name: left for the 404 path.
        assert!(param("/log?file=config.json").is_ok());
    }
}
