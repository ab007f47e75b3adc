use heapless::String;

use super::client::{Client, Options, QoS};
use crate::forward::ChannelClient;
use crate::network::Connect;
use crate::network::error::Error;

/// Longest broker address accepted, e.g. `broker.local:1883`.
pub const MAX_BROKER_LEN: usize = 64;
/// MQTT 3.1.1 limits client identifiers to 23 bytes.
pub const MAX_CLIENT_ID_LEN: usize = 23;

/// Reconnecting MQTT publisher.
///
/// Holds at most one live [`Client`]. Any write or keep-alive failure drops
/// it, after which [`is_connected`](ChannelClient::is_connected) reports
/// `false` until the next successful [`connect`](ChannelClient::connect).
pub struct MqttChannel<N: Connect> {
    network: N,
    broker: String<MAX_BROKER_LEN>,
    client_id: String<MAX_CLIENT_ID_LEN>,
    keep_alive_seconds: u16,
    qos: QoS,
    client: Option<Client<N::Connection>>,
}

impl<N: Connect> core::fmt::Debug for MqttChannel<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MqttChannel")
            .field("broker", &self.broker)
            .field("client_id", &self.client_id)
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl<N: Connect> MqttChannel<N> {
    /// Create a disconnected channel. Nothing is sent until `connect()`.
    pub fn new(
        network: N,
        broker: &str,
        client_id: &str,
        keep_alive_seconds: u16,
    ) -> Result<Self, Error> {
        Ok(Self {
            network,
            broker: String::try_from(broker).map_err(|_| Error::InvalidAddress)?,
            client_id: String::try_from(client_id).map_err(|_| Error::ProtocolError)?,
            keep_alive_seconds,
            qos: QoS::AtMostOnce,
            client: None,
        })
    }

    /// Publish at the given QoS instead of the default [`QoS::AtMostOnce`].
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Send DISCONNECT to the broker, if connected.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        match self.client.take() {
            Some(client) => client.disconnect(),
            None => Ok(()),
        }
    }
}

impl<N: Connect> ChannelClient for MqttChannel<N> {
    type Error = Error;

    fn connect(&mut self) -> Result<(), Self::Error> {
        // A half-dead session is never reused.
        if let Some(stale) = self.client.take() {
            let _ = stale.disconnect();
        }

        let connection = self
            .network
            .connect(&self.broker)
            .map_err(|_| Error::ConnectionRefused)?;
        let options = Options {
            client_id: &self.client_id,
            keep_alive_seconds: self.keep_alive_seconds,
            clean_session: true,
        };
        self.client = Some(Client::connect(connection, options)?);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let client = self.client.as_mut().ok_or(Error::NotOpen)?;
        let result = client.publish(topic, payload, self.qos);
        if matches!(result, Err(Error::WriteError | Error::ConnectionClosed)) {
            self.client = None;
        }
        result
    }

    fn poll(&mut self, now_ms: u64) -> Result<(), Self::Error> {
        let Some(client) = self.client.as_mut() else {
            return Ok(());
        };
        // Drain a bounded number of packets so a chatty broker can't stall a tick.
        for _ in 0..4 {
            match client.poll(now_ms) {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    self.client = None;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
