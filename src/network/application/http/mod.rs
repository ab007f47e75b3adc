//! HTTP/1.1 server side for embedded systems.
//!
//! This module provides just enough of HTTP/1.1 to serve a handful of
//! read-mostly endpoints from a microcontroller: a request-head parser that
//! borrows from the receive buffer, a [`Responder`] that streams status line,
//! headers and body straight onto the connection, and a fixed-capacity
//! [`Router`] mapping `(method, path)` pairs to plain function handlers.
//!
//! # Features
//!
//! - Zero-copy request parsing into a caller-provided buffer
//! - Query-string lookup with percent-decoding
//! - Streaming responses with or without `Content-Length`
//! - One request per connection (`Connection: close`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use presslog::network::application::http::{Method, Router, Status, serve};
//!
//! fn hello(_req: &Request<'_>, _ctx: &mut (), res: &mut Responder<'_, Conn>) -> Result<(), Error> {
//!     res.send(Status::Ok, "text/plain", b"hello")
//! }
//!
//! let mut router: Router<(), Conn, 4> = Router::new();
//! router.route(Method::Get, "/", hello)?;
//! serve(&router, &mut connection, &mut ())?;
//! ```

mod request;
mod response;
mod router;

pub use request::{Header, MAX_HEADERS, MAX_REQUEST_SIZE, Method, Request, percent_decode};
pub use response::{Responder, Status};
pub use router::{Handler, Router, serve};
