//! # Application Layer Network Protocols
//!
//! The two protocols the agent speaks on top of the core network traits:
//!
//! - **[`http`]**: the server side of HTTP/1.1, used by the log browser to
//!   list, download and delete rotation files
//! - **[`mqtt`]**: an MQTT 3.1.1 client used to mirror log lines to a broker
//!
//! ## Design Principles
//!
//! - **Connection Agnostic**: Work with any type implementing [`Connection`](crate::network::Connection)
//! - **No-std Compatible**: Designed for embedded systems without heap allocation
//! - **Resource Conscious**: Use fixed-size buffers and minimal memory
//! - **Non-blocking**: Nothing here waits indefinitely; the tick loop keeps running

/// HTTP/1.1 server-side implementation.
///
/// Parses requests, writes responses and dispatches them through a small
/// fixed-capacity [`Router`](http::Router).
pub mod http;

/// MQTT client implementation.
///
/// Provides an MQTT 3.1.1 client for lightweight publish-subscribe messaging
/// and [`MqttChannel`](mqtt::MqttChannel), the reconnecting adapter the
/// forwarding channel drives.
pub mod mqtt;
