#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use presslog::forward::ChannelClient;
use presslog::input::{InputPins, Level};
use presslog::network::error::Error;
use presslog::network::{Bind, Close, Connect, Connection, Connectivity, Read, Write};

/// Bytes the peer will send, and bytes we sent, shared with the test body.
#[derive(Default)]
pub struct Wire {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub closed: bool,
    pub fail_writes: bool,
    /// Deliver inbound bytes at most this many per read, with an empty
    /// read before each, like a slow peer.
    pub trickle: Option<usize>,
    gap: bool,
}

/// In-memory connection over a shared [`Wire`].
#[derive(Clone, Default)]
pub struct MockConnection {
    pub wire: Rc<RefCell<Wire>>,
}

impl MockConnection {
    pub fn with_request(request: &str) -> Self {
        let conn = Self::default();
        conn.wire
            .borrow_mut()
            .inbound
            .extend(request.as_bytes().iter().copied());
        conn
    }

    /// A connection whose peer trickles bytes in `chunk`-sized pieces.
    pub fn trickle(chunk: usize) -> Self {
        let conn = Self::default();
        conn.wire.borrow_mut().trickle = Some(chunk);
        conn
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.wire.borrow_mut().inbound.extend(bytes.iter().copied());
    }

    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.wire.borrow_mut().outbound)
    }

    pub fn output_string(&self) -> String {
        String::from_utf8(self.wire.borrow().outbound.clone()).unwrap()
    }
}

impl Read for MockConnection {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        let limit = match wire.trickle {
            Some(chunk) => {
                wire.gap = !wire.gap;
                if wire.gap {
                    return Ok(0);
                }
                chunk.min(buf.len())
            }
            None => buf.len(),
        };
        let mut n = 0;
        while n < limit {
            match wire.inbound.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockConnection {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail_writes {
            return Err(());
        }
        wire.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = ();

    fn close(self) -> Result<(), Self::Error> {
        self.wire.borrow_mut().closed = true;
        Ok(())
    }
}

impl Connection for MockConnection {}

/// Hands out one pre-built connection per `connect`, or refuses.
#[derive(Default)]
pub struct MockConnector {
    pub pending: VecDeque<MockConnection>,
    pub attempts: usize,
    pub last_remote: Option<String>,
}

impl Connect for MockConnector {
    type Connection = MockConnection;
    type Error = ();

    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error> {
        self.attempts += 1;
        self.last_remote = Some(remote.to_string());
        self.pending.pop_front().ok_or(())
    }
}

/// Listener with an optional waiting client.
#[derive(Default)]
pub struct MockListener {
    pub waiting: Option<MockConnection>,
    /// Returned once by the next `accept`.
    pub failure: Option<Error>,
}

impl Bind for MockListener {
    type Connection = MockConnection;
    type Error = Error;

    fn accept(&mut self) -> Result<Option<Self::Connection>, Self::Error> {
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(self.waiting.take()),
        }
    }
}

/// Pins indexed by line id.
#[derive(Clone)]
pub struct MockPins {
    pub levels: [Level; 16],
}

impl Default for MockPins {
    fn default() -> Self {
        // Pull-ups: idle high.
        Self {
            levels: [Level::High; 16],
        }
    }
}

impl MockPins {
    pub fn press(&mut self, line: u8) {
        self.levels[line as usize] = Level::Low;
    }

    pub fn release(&mut self, line: u8) {
        self.levels[line as usize] = Level::High;
    }
}

impl InputPins for MockPins {
    fn read(&mut self, line_id: u8) -> Level {
        self.levels[line_id as usize]
    }
}

/// Connectivity that the test can flip.
#[derive(Clone, Copy)]
pub struct Link(pub bool);

impl Connectivity for Link {
    fn is_connected(&self) -> bool {
        self.0
    }
}

/// Channel client recording what was published.
#[derive(Default)]
pub struct RecordingChannel {
    pub reachable: bool,
    pub connected: bool,
    pub attempts: usize,
    pub published: Vec<(String, Vec<u8>)>,
}

impl RecordingChannel {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.published
            .iter()
            .map(|(_, p)| String::from_utf8(p.clone()).unwrap())
            .collect()
    }
}

impl ChannelClient for RecordingChannel {
    type Error = ();

    fn connect(&mut self) -> Result<(), ()> {
        self.attempts += 1;
        self.connected = self.reachable;
        if self.reachable { Ok(()) } else { Err(()) }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ()> {
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self, _now_ms: u64) -> Result<(), ()> {
        Ok(())
    }
}

/// Two active-low buttons on lines 4 and 5, cleared together.
pub const CONFIG: &str = r#"{
    "lines": [
        {"label": "Blue", "line": 4},
        {"label": "Yellow", "line": 5},
        {"label": "Green", "line": 6}
    ],
    "clear_pair": [4, 5],
    "broker": "broker.test:1883",
    "client_id": "presslog-test",
    "topic": "nursery/events"
}"#;

/// 2024-01-01T08:00:00Z
pub const NEW_YEAR_8AM: i64 = 1_704_096_000;
