use heapless::Vec;

use super::request::{MAX_REQUEST_SIZE, Method, Request, read_head};
use super::response::{Responder, Status};
use crate::network::error::Error;
use crate::network::{Read, Write};

/// Request handler: inspects the request, uses the shared context, and
/// answers through the responder.
pub type Handler<Ctx, W> = fn(&Request<'_>, &mut Ctx, &mut Responder<'_, W>) -> Result<(), Error>;

struct Route<Ctx, W: Write> {
    method: Method,
    path: &'static str,
    handler: Handler<Ctx, W>,
}

/// Fixed-capacity route table for compile-time known endpoints.
///
/// `Ctx` is whatever state the handlers share; it is passed in per request,
/// so the router itself holds nothing but function pointers.
pub struct Router<Ctx, W: Write, const N: usize> {
    routes: Vec<Route<Ctx, W>, N>,
}

impl<Ctx, W: Write, const N: usize> core::fmt::Debug for Router<Ctx, W, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| (r.method, r.path)))
            .finish()
    }
}

impl<Ctx, W: Write, const N: usize> Default for Router<Ctx, W, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx, W: Write, const N: usize> Router<Ctx, W, N> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a handler for `method` on `path`.
    pub fn route(
        &mut self,
        method: Method,
        path: &'static str,
        handler: Handler<Ctx, W>,
    ) -> Result<(), Error> {
        self.routes
            .push(Route {
                method,
                path,
                handler,
            })
            .map_err(|_| Error::BufferOverflow)
    }

    /// Route one parsed request.
    ///
    /// Unknown paths answer 404; a known path with the wrong method answers
    /// 405. `HEAD` falls back to the `GET` handler with the body suppressed.
    pub fn dispatch(
        &self,
        request: &Request<'_>,
        ctx: &mut Ctx,
        responder: &mut Responder<'_, W>,
    ) -> Result<(), Error> {
        let mut path_known = false;
        let mut fallback = None;
        for route in self.routes.iter().filter(|r| r.path == request.path) {
            path_known = true;
            if Some(route.method) == request.method {
                return (route.handler)(request, ctx, responder);
            }
            if route.method == Method::Get && request.method == Some(Method::Head) {
                fallback = Some(route.handler);
            }
        }

        match (fallback, path_known) {
            (Some(handler), _) => handler(request, ctx, responder),
            (None, true) => responder.text(Status::MethodNotAllowed, "Method not allowed"),
            (None, false) => responder.text(Status::NotFound, "Not found"),
        }
    }
}

/// Serve exactly one request on `connection`.
///
/// Reads the request head, dispatches it and flushes the response. A head
/// that cannot be parsed is answered with 400. Returns the status that was
/// sent.
pub fn serve<Ctx, C: Read + Write, const N: usize>(
    router: &Router<Ctx, C, N>,
    connection: &mut C,
    ctx: &mut Ctx,
) -> Result<Status, Error> {
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let parsed = read_head(connection, &mut buf);

    let request = parsed.and_then(|len| Request::parse(&buf[..len]));
    let mut responder = match &request {
        Ok(req) if req.method == Some(Method::Head) => Responder::new(connection).head_only(),
        _ => Responder::new(connection),
    };

    match request {
        Ok(request) => {
            let outcome = router.dispatch(&request, ctx, &mut responder);
            match (outcome, responder.status()) {
                (Ok(()), None) => {
                    responder.text(Status::InternalServerError, "No response")?;
                }
                (Err(e), None) => {
                    responder.text(Status::InternalServerError, "Handler failed")?;
                    responder.finish()?;
                    return Err(e);
                }
                // Head already on the wire; nothing sensible left to send.
                (Err(e), Some(_)) => return Err(e),
                (Ok(()), Some(_)) => {}
            }
        }
        Err(Error::ConnectionClosed | Error::ReadError) => return Err(Error::ConnectionClosed),
        Err(Error::Timeout) => return Err(Error::Timeout),
        Err(_) => responder.text(Status::BadRequest, "Bad request")?,
    }

    responder.finish()?;
    Ok(responder.status().unwrap_or(Status::InternalServerError))
}
