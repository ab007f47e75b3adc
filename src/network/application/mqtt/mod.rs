//! MQTT 3.1.1 protocol implementation for embedded systems.
//!
//! MQTT uses a publish-subscribe pattern where publishers send messages to
//! topics and a broker routes them to subscribers. The agent only ever
//! publishes: every log line it persists is mirrored, verbatim, to one fixed
//! topic so a dashboard or phone can follow along live.
//!
//! # Layers
//!
//! - [`Client`] speaks the wire protocol over one [`Connection`](crate::network::Connection).
//!   It is consumed by [`Client::disconnect`] and is useless after an I/O error.
//! - [`MqttChannel`] owns a [`Connect`](crate::network::Connect)or and the
//!   broker address, creates a fresh [`Client`] on every `connect()` and drops
//!   it as soon as the connection fails. It implements
//!   [`ChannelClient`](crate::forward::ChannelClient), which is what the
//!   forwarding channel drives.

/// MQTT client implementation and supporting types.
pub mod client;

mod channel;

pub use channel::MqttChannel;
pub use client::{Client, Incoming, Options, QoS};
