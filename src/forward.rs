//! Best-effort forwarding of log lines to a publish/subscribe channel.
//!
//! The channel is a mirror, not a record. A line published while the link
//! is down is dropped, never queued; the log store alone is durable.
//! Reconnection is retried on a fixed interval from [`ForwardingChannel::tick`]
//! and never blocks the caller beyond one connection attempt.

use crate::network::Connectivity;

/// Default pause between connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 5000;

/// Remote publish/subscribe transport.
///
/// [`MqttChannel`](crate::network::application::mqtt::MqttChannel) is the
/// stock implementation.
pub trait ChannelClient {
    /// Transport error.
    type Error: core::fmt::Debug;

    /// Open a session. Replaces any existing one.
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Whether a session is currently believed to be up.
    fn is_connected(&self) -> bool;

    /// Send `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Service keep-alives and drain inbound traffic.
    fn poll(&mut self, now_ms: u64) -> Result<(), Self::Error>;
}

/// Fate of one published line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Handed to the transport.
    Sent,
    /// Not sent: the channel was down or the send failed.
    Dropped,
}

/// What [`ForwardingChannel::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Nothing changed.
    Idle,
    /// The network itself is down; no attempt was made.
    Offline,
    /// A connection attempt succeeded.
    Connected,
    /// A connection attempt failed; the next one waits a full interval.
    ConnectFailed,
    /// An established session died while being serviced.
    Lost,
}

/// Connection state machine around a [`ChannelClient`].
#[derive(Debug)]
pub struct ForwardingChannel<C> {
    client: C,
    topic: &'static str,
    reconnect_interval_ms: u64,
    last_attempt_at: Option<u64>,
}

impl<C: ChannelClient> ForwardingChannel<C> {
    /// Forward to `topic` through `client`, retrying every
    /// `reconnect_interval_ms` while disconnected.
    pub fn new(client: C, topic: &'static str, reconnect_interval_ms: u64) -> Self {
        Self {
            client,
            topic,
            reconnect_interval_ms,
            last_attempt_at: None,
        }
    }

    /// Run once per scheduler tick.
    ///
    /// While connected the client is polled. While disconnected, and only if
    /// `network` reports a link, a connection is attempted when at least the
    /// reconnect interval has passed since the previous attempt. The attempt
    /// time is recorded whatever the outcome. A tick skipped for lack of a
    /// network is not an attempt.
    pub fn tick(&mut self, now_ms: u64, network: &impl Connectivity) -> LinkEvent {
        if self.client.is_connected() {
            return match self.client.poll(now_ms) {
                Ok(()) => LinkEvent::Idle,
                Err(_) => {
                    warn!("channel lost");
                    LinkEvent::Lost
                }
            };
        }

        if !network.is_connected() {
            return LinkEvent::Offline;
        }

        let due = self
            .last_attempt_at
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.reconnect_interval_ms);
        if !due {
            return LinkEvent::Idle;
        }

        self.last_attempt_at = Some(now_ms);
        match self.client.connect() {
            Ok(()) => {
                info!("channel connected");
                LinkEvent::Connected
            }
            Err(_) => {
                warn!("channel connect failed; retrying in {} ms", self.reconnect_interval_ms);
                LinkEvent::ConnectFailed
            }
        }
    }

    /// Publish one line, fire-and-forget.
    pub fn publish(&mut self, line: &[u8]) -> Delivery {
        if !self.client.is_connected() {
            debug!("channel down; line dropped");
            return Delivery::Dropped;
        }
        match self.client.publish(self.topic, line) {
            Ok(()) => Delivery::Sent,
            Err(_) => {
                warn!("publish failed; line dropped");
                Delivery::Dropped
            }
        }
    }

    /// Whether the client reports a live session.
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Monotonic time of the most recent connection attempt.
    pub fn last_attempt_at(&self) -> Option<u64> {
        self.last_attempt_at
    }

    /// Topic lines are published on.
    pub fn topic(&self) -> &'static str {
        self.topic
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The wrapped client, mutably.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}
