//! MQTT 3.1.1 client implementation for embedded systems.
//!
//! This module provides a lightweight MQTT client designed for `no_std` environments
//! and embedded systems. It implements the subset of MQTT 3.1.1 a telemetry
//! publisher needs: CONNECT/CONNACK, PUBLISH, PINGREQ/PINGRESP and DISCONNECT.
//!
//! # Features
//!
//! - Quality of Service 0 and 1 publishing
//! - Clean session support
//! - Keep-alive handled from [`Client::poll`], driven by the caller's clock
//! - Fixed-size buffers for predictable memory usage
//! - Connection agnostic (works with any transport)
//!
//! # Time
//!
//! The client never reads a clock itself. [`Client::poll`] takes the current
//! monotonic time in milliseconds and uses it to decide when a PINGREQ is due
//! and whether the broker has gone quiet for too long.
//!
//! # Examples
//!
//! ```rust,ignore
//! use presslog::network::application::mqtt::{Client, Options, QoS};
//!
//! let options = Options {
//!     client_id: "nursery_logger",
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//! };
//!
//! let mut client = Client::connect(tcp_connection, options)?;
//! client.publish("nursery/events", b"2024-01-01 08:00:00 Blue", QoS::AtMostOnce)?;
//!
//! loop {
//!     client.poll(now_ms())?;
//! }
//! ```

use crate::network::error::Error;
use crate::network::{Close, Connection, Read, Write};
use heapless::Vec;

// MQTT Control Packet types - these are the fixed header packet type values
/// MQTT CONNECT packet type identifier.
const CONNECT: u8 = 0x10;
/// MQTT CONNACK packet type identifier.
const CONNACK: u8 = 0x20;
/// MQTT PUBLISH packet type identifier.
const PUBLISH: u8 = 0x30;
/// MQTT PUBACK packet type identifier.
const PUBACK: u8 = 0x40;
/// MQTT PINGREQ packet type identifier.
const PINGREQ: u8 = 0xC0;
/// MQTT PINGRESP packet type identifier.
const PINGRESP: u8 = 0xD0;
/// MQTT DISCONNECT packet type identifier.
const DISCONNECT: u8 = 0xE0;

// Protocol constants defined by MQTT 3.1.1 specification
/// MQTT protocol name as defined in the specification.
const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

/// Largest PUBLISH variable header + payload the client will build.
pub const MAX_PACKET_SIZE: usize = 512;

/// Consecutive empty reads tolerated while waiting for the rest of a started packet or
/// for CONNACK. The host TCP adapter blocks `CLIENT_READ_TIMEOUT` (5 ms) per
/// empty read, so this is about three seconds there.
pub const MAX_IDLE_READS: u32 = 600;

/// Quality of Service levels for MQTT messages.
///
/// Only the two levels a fire-and-forget publisher can honour are offered.
/// QoS 1 PUBACKs are read and discarded by [`Client::poll`]; the client keeps
/// no retransmission state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum QoS {
    /// **QoS 0**: At most once delivery.
    ///
    /// Messages are delivered according to the best effort of the underlying network.
    AtMostOnce = 0,

    /// **QoS 1**: At least once delivery.
    ///
    /// The broker acknowledges with PUBACK. Duplicates can occur.
    AtLeastOnce = 1,
}

/// Configuration options for MQTT client connection.
///
/// # Examples
///
/// ```rust
/// use presslog::network::application::mqtt::Options;
///
/// let options = Options {
///     client_id: "nursery_logger",
///     keep_alive_seconds: 60,
///     clean_session: true,
/// };
/// assert_eq!(options.keep_alive_seconds, 60);
/// ```
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    ///
    /// # Constraints
    /// - Must be 1-23 UTF-8 encoded bytes
    /// - Should be unique per broker
    pub client_id: &'a str,

    /// The keep-alive time interval in seconds.
    ///
    /// A value of 0 disables keep-alive.
    pub keep_alive_seconds: u16,

    /// Whether to start a clean session.
    pub clean_session: bool,
}

/// Kind of packet consumed by a call to [`Client::poll`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Incoming {
    /// Reply to one of our PINGREQs.
    PingResp,
    /// Acknowledgement of a QoS 1 publish, carrying its packet identifier.
    PubAck(u16),
    /// A PUBLISH from the broker. The payload is discarded.
    Publish,
    /// Any other packet type, identified by its fixed header byte.
    Other(u8),
}

/// An MQTT 3.1.1 client for publishing.
///
/// # Type Parameters
///
/// * `C` - The connection type implementing [`Connection`]
pub struct Client<C: Connection> {
    connection: C,
    keep_alive_ms: u64,
    next_packet_id: u16,
    last_sent_ms: Option<u64>,
    sent_since_poll: bool,
    ping_sent_at: Option<u64>,
}

impl<C: Connection> core::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("keep_alive_ms", &self.keep_alive_ms)
            .field("ping_outstanding", &self.ping_sent_at.is_some())
            .finish()
    }
}

impl<C: Connection> Client<C> {
    /// Establish an MQTT connection with the broker.
    ///
    /// This function performs the MQTT connection handshake by sending a CONNECT
    /// packet and waiting for a CONNACK response.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send CONNECT packet
    /// * [`Error::ReadError`] - Failed to read CONNACK response
    /// * [`Error::ConnectionClosed`] - Connection closed during handshake
    /// * [`Error::Timeout`] - No CONNACK within [`MAX_IDLE_READS`] empty reads
    /// * [`Error::ConnectionRefused`] - Broker refused the connection
    /// * [`Error::ProtocolError`] - Invalid CONNACK packet received
    pub fn connect(mut connection: C, options: Options) -> Result<Self, Error> {
        let client_id_bytes = options.client_id.as_bytes();
        if client_id_bytes.is_empty() || client_id_bytes.len() > 23 {
            return Err(Error::ProtocolError);
        }

        // --- Variable Header ---
        let mut vh: Vec<u8, 10> = Vec::new();
        vh.extend_from_slice(&(PROTOCOL_NAME.len() as u16).to_be_bytes())
            .map_err(|_| Error::BufferOverflow)?;
        vh.extend_from_slice(PROTOCOL_NAME)
            .map_err(|_| Error::BufferOverflow)?;
        vh.push(PROTOCOL_LEVEL).map_err(|_| Error::BufferOverflow)?;

        let mut connect_flags = 0;
        if options.clean_session {
            connect_flags |= 0x02;
        }
        vh.push(connect_flags).map_err(|_| Error::BufferOverflow)?;
        vh.extend_from_slice(&options.keep_alive_seconds.to_be_bytes())
            .map_err(|_| Error::BufferOverflow)?;

        // --- Payload ---
        let mut payload: Vec<u8, 32> = Vec::new();
        payload
            .extend_from_slice(&(client_id_bytes.len() as u16).to_be_bytes())
            .map_err(|_| Error::BufferOverflow)?;
        payload
            .extend_from_slice(client_id_bytes)
            .map_err(|_| Error::BufferOverflow)?;

        let remaining_len = vh.len() + payload.len();

        // --- Fixed Header ---
        let mut fixed_header: Vec<u8, 5> = Vec::new();
        fixed_header.push(CONNECT).map_err(|_| Error::BufferOverflow)?;
        encode_remaining_length(&mut fixed_header, remaining_len)?;

        connection.write_all(&fixed_header)?;
        connection.write_all(&vh)?;
        connection.write_all(&payload)?;
        connection.flush().map_err(|_| Error::WriteError)?;

        // Wait for and parse CONNACK
        let mut connack_buf = [0u8; 4];
        read_exact(&mut connection, &mut connack_buf)?;

        if connack_buf[0] != CONNACK || connack_buf[1] != 2 {
            return Err(Error::ProtocolError);
        }

        match connack_buf[3] {
            0 => Ok(Self {
                connection,
                keep_alive_ms: u64::from(options.keep_alive_seconds) * 1000,
                next_packet_id: 1,
                last_sent_ms: None,
                sent_since_poll: false,
                ping_sent_at: None,
            }),
            1..=5 => Err(Error::ConnectionRefused),
            _ => Err(Error::ProtocolError),
        }
    }

    /// Publish a message to a specific topic.
    ///
    /// The message is written and flushed before returning; no acknowledgement
    /// is awaited even at [`QoS::AtLeastOnce`].
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send the publish packet
    /// * [`Error::BufferOverflow`] - Topic and payload exceed [`MAX_PACKET_SIZE`]
    /// * [`Error::ProtocolError`] - Empty topic or topic containing wildcards
    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), Error> {
        if topic.is_empty() || topic.contains(&['+', '#'][..]) {
            return Err(Error::ProtocolError);
        }

        let mut fixed_header: Vec<u8, 5> = Vec::new();
        let mut packet: Vec<u8, MAX_PACKET_SIZE> = Vec::new();

        // --- Variable Header ---
        let topic_bytes = topic.as_bytes();
        packet
            .extend_from_slice(&(topic_bytes.len() as u16).to_be_bytes())
            .map_err(|_| Error::BufferOverflow)?;
        packet
            .extend_from_slice(topic_bytes)
            .map_err(|_| Error::BufferOverflow)?;
        if qos == QoS::AtLeastOnce {
            let packet_id = self.take_packet_id();
            packet
                .extend_from_slice(&packet_id.to_be_bytes())
                .map_err(|_| Error::BufferOverflow)?;
        }

        // --- Payload ---
        packet
            .extend_from_slice(payload)
            .map_err(|_| Error::BufferOverflow)?;

        // --- Fixed Header ---
        let flags = PUBLISH | ((qos as u8) << 1);
        fixed_header.push(flags).map_err(|_| Error::BufferOverflow)?;
        encode_remaining_length(&mut fixed_header, packet.len())?;

        self.connection.write_all(&fixed_header)?;
        self.connection.write_all(&packet)?;
        self.connection.flush().map_err(|_| Error::WriteError)?;
        self.sent_since_poll = true;

        Ok(())
    }

    /// Service the connection.
    ///
    /// Consumes at most one inbound packet and runs the keep-alive timer:
    /// a PINGREQ goes out once `keep_alive_seconds` pass without any outbound
    /// packet, and if its PINGRESP has not arrived one further keep-alive
    /// interval later the connection is reported dead with [`Error::Timeout`].
    ///
    /// # Returns
    ///
    /// * `Ok(Some(kind))` - A packet was read and handled
    /// * `Ok(None)` - No data available at this time
    /// * `Err(error)` - The connection should be considered lost
    ///
    /// # Non-blocking Behavior
    ///
    /// Returns `Ok(None)` immediately when the connection has nothing to read.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<Incoming>, Error> {
        if self.sent_since_poll || self.last_sent_ms.is_none() {
            self.last_sent_ms = Some(now_ms);
            self.sent_since_poll = false;
        }

        let incoming = self.read_packet()?;
        if incoming == Some(Incoming::PingResp) {
            self.ping_sent_at = None;
        }

        if self.keep_alive_ms == 0 {
            return Ok(incoming);
        }

        match self.ping_sent_at {
            Some(sent) if now_ms.saturating_sub(sent) >= self.keep_alive_ms => {
                return Err(Error::Timeout);
            }
            Some(_) => {}
            None => {
                let idle = now_ms.saturating_sub(self.last_sent_ms.unwrap_or(now_ms));
                if idle >= self.keep_alive_ms {
                    self.send_control(PINGREQ)?;
                    self.ping_sent_at = Some(now_ms);
                    self.last_sent_ms = Some(now_ms);
                }
            }
        }

        Ok(incoming)
    }

    /// Send DISCONNECT and close the underlying connection.
    pub fn disconnect(mut self) -> Result<(), Error> {
        self.send_control(DISCONNECT)?;
        self.connection.close().map_err(|_| Error::ConnectionClosed)
    }

    /// `true` while a PINGREQ is waiting for its PINGRESP.
    pub fn ping_outstanding(&self) -> bool {
        self.ping_sent_at.is_some()
    }

    fn take_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        // Packet identifier 0 is reserved.
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        id
    }

    fn send_control(&mut self, packet_type: u8) -> Result<(), Error> {
        self.connection.write_all(&[packet_type, 0])?;
        self.connection.flush().map_err(|_| Error::WriteError)
    }

    fn read_packet(&mut self) -> Result<Option<Incoming>, Error> {
        let mut header_buf = [0u8; 1];
        match self.connection.read(&mut header_buf) {
            Ok(0) => return Ok(None),
            Ok(_) => {}
            Err(_) => return Err(Error::ReadError),
        }
        let header = header_buf[0];
        let remaining_len = decode_remaining_length(&mut self.connection)?;

        match header & 0xF0 {
            PINGRESP => {
                skip_bytes(&mut self.connection, remaining_len)?;
                Ok(Some(Incoming::PingResp))
            }
            PUBACK => {
                if remaining_len != 2 {
                    return Err(Error::ProtocolError);
                }
                let mut id = [0u8; 2];
                read_exact(&mut self.connection, &mut id)?;
                Ok(Some(Incoming::PubAck(u16::from_be_bytes(id))))
            }
            PUBLISH => {
                skip_bytes(&mut self.connection, remaining_len)?;
                Ok(Some(Incoming::Publish))
            }
            _ => {
                skip_bytes(&mut self.connection, remaining_len)?;
                Ok(Some(Incoming::Other(header)))
            }
        }
    }
}

/// Encode the remaining length field for an MQTT packet.
///
/// The encoding uses up to 4 bytes where each byte encodes 7 bits of the length
/// value. The most significant bit indicates if another byte follows.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), Error> {
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.push(byte).map_err(|_| Error::ProtocolError)?;
        if len == 0 {
            break;
        }
    }
    Ok(())
}

fn decode_remaining_length<R: Read>(connection: &mut R) -> Result<usize, Error> {
    let mut remaining_len = 0usize;
    let mut multiplier = 1usize;
    for _ in 0..4 {
        let mut byte = [0u8; 1];
        read_exact(connection, &mut byte)?;
        remaining_len += (byte[0] as usize & 127) * multiplier;
        if byte[0] & 0x80 == 0 {
            return Ok(remaining_len);
        }
        multiplier *= 128;
    }
    Err(Error::ProtocolError)
}

/// Fill `buf`, giving up after more than [`MAX_IDLE_READS`] empty reads in a row.
fn read_exact<R: Read>(connection: &mut R, buf: &mut [u8]) -> Result<(), Error> {
    let mut total_read = 0;
    let mut idle = 0;
    while total_read < buf.len() {
        match connection.read(&mut buf[total_read..]) {
            Ok(0) => {
                idle += 1;
                if idle > MAX_IDLE_READS {
                    return Err(Error::Timeout);
                }
            }
            Ok(n) => {
                idle = 0;
                total_read += n;
            }
            Err(_) => return Err(Error::ReadError),
        }
    }
    Ok(())
}

fn skip_bytes<R: Read>(connection: &mut R, mut len: usize) -> Result<(), Error> {
    let mut scratch = [0u8; 64];
    while len > 0 {
        let chunk = len.min(scratch.len());
        read_exact(connection, &mut scratch[..chunk])?;
        len -= chunk;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_length_boundaries() {
        let mut buf: Vec<u8, 5> = Vec::new();
        encode_remaining_length(&mut buf, 127).unwrap();
        assert_eq!(&buf[..], &[0x7F]);

        buf.clear();
        encode_remaining_length(&mut buf, 128).unwrap();
        assert_eq!(&buf[..], &[0x80, 0x01]);

        buf.clear();
        encode_remaining_length(&mut buf, 16_383).unwrap();
        assert_eq!(&buf[..], &[0xFF, 0x7F]);
    }

    struct Bytes<'a>(&'a [u8]);

    impl Read for Bytes<'_> {
        type Error = ();
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_decode_remaining_length() {
        assert_eq!(decode_remaining_length(&mut Bytes(&[0x00])), Ok(0));
        assert_eq!(decode_remaining_length(&mut Bytes(&[0x80, 0x01])), Ok(128));
        assert_eq!(
            decode_remaining_length(&mut Bytes(&[0xFF, 0xFF, 0xFF, 0xFF])),
            Err(Error::ProtocolError)
        );
        assert_eq!(
            decode_remaining_length(&mut Bytes(&[0x80])),
            Err(Error::Timeout)
        );
    }

    /// Hands out one byte per read with an empty read before each.
    struct Stuttering<'a> {
        bytes: &'a [u8],
        gap: bool,
    }

    impl Read for Stuttering<'_> {
        type Error = ();

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            self.gap = !self.gap;
            if self.gap || self.bytes.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[0];
            self.bytes = &self.bytes[1..];
            Ok(1)
        }
    }

    #[test]
    fn test_read_exact_waits_out_empty_reads() {
        let mut conn = Stuttering {
            bytes: &[0x40, 2, 0, 7],
            gap: false,
        };
        let mut buf = [0u8; 4];
        assert_eq!(read_exact(&mut conn, &mut buf), Ok(()));
        assert_eq!(buf, [0x40, 2, 0, 7]);

        assert_eq!(read_exact(&mut conn, &mut buf[..1]), Err(Error::Timeout));
    }
}
