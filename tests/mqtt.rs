mod common;

use common::{Link, MockConnection, MockConnector};
use presslog::forward::{ChannelClient, Delivery, ForwardingChannel, LinkEvent};
use presslog::network::application::mqtt::{Client, Incoming, MqttChannel, Options, QoS};
use presslog::network::error::Error;

const CONNACK_OK: [u8; 4] = [0x20, 2, 0, 0];

fn broker_session() -> MockConnection {
    let conn = MockConnection::default();
    conn.feed(&CONNACK_OK);
    conn
}

fn channel_with(sessions: &[MockConnection], keep_alive: u16) -> MqttChannel<MockConnector> {
    let mut network = MockConnector::default();
    network.pending.extend(sessions.iter().cloned());
    MqttChannel::new(network, "broker.test:1883", "presslog-test", keep_alive).unwrap()
}

#[test]
fn test_connect_sends_connect_packet() {
    let session = broker_session();
    let mut channel = channel_with(&[session.clone()], 1);

    channel.connect().unwrap();
    assert!(channel.is_connected());

    let mut expected = vec![0x10, 25, 0, 4, b'M', b'Q', b'T', b'T', 4, 0x02, 0, 1, 0, 13];
    expected.extend_from_slice(b"presslog-test");
    assert_eq!(session.take_output(), expected);
}

#[test]
fn test_publish_frames_line_verbatim() {
    let session = broker_session();
    let mut channel = channel_with(&[session.clone()], 60);
    channel.connect().unwrap();
    session.take_output();

    channel.publish("t/ex", b"hi").unwrap();
    assert_eq!(
        session.take_output(),
        [0x30, 8, 0, 4, b't', b'/', b'e', b'x', b'h', b'i']
    );
}

#[test]
fn test_publish_rejects_wildcard_topics_without_dropping_session() {
    let session = broker_session();
    let mut channel = channel_with(&[session], 60);
    channel.connect().unwrap();

    assert_eq!(channel.publish("events/#", b"x"), Err(Error::ProtocolError));
    assert!(channel.is_connected());
}

#[test]
fn test_keep_alive_ping_and_timeout() {
    let session = broker_session();
    let mut channel = channel_with(&[session.clone()], 1);
    channel.connect().unwrap();
    session.take_output();

    channel.poll(0).unwrap();
    channel.poll(999).unwrap();
    assert!(session.take_output().is_empty());

    channel.poll(1_000).unwrap();
    assert_eq!(session.take_output(), [0xC0, 0]);

    // Answered: the timer restarts from the ping.
    session.feed(&[0xD0, 0]);
    channel.poll(1_500).unwrap();
    assert!(session.take_output().is_empty());
    channel.poll(2_000).unwrap();
    assert_eq!(session.take_output(), [0xC0, 0]);

    // Unanswered for a full interval: dead.
    channel.poll(2_500).unwrap();
    assert_eq!(channel.poll(3_000), Err(Error::Timeout));
    assert!(!channel.is_connected());
}

/// A broker whose bytes arrive one at a time with pauses in between.
fn slow_broker_session() -> MockConnection {
    let conn = MockConnection::trickle(1);
    conn.feed(&CONNACK_OK);
    conn
}

#[test]
fn test_slow_broker_connect_and_keep_alive() {
    let session = slow_broker_session();
    let mut channel = channel_with(&[session.clone()], 1);

    channel.connect().unwrap();
    assert!(channel.is_connected());
    session.take_output();

    channel.publish("t/ex", b"hi").unwrap();
    assert_eq!(session.take_output()[0], 0x30);

    channel.poll(0).unwrap();
    channel.poll(1_000).unwrap();
    assert_eq!(session.take_output(), [0xC0, 0]);

    // A PINGRESP split by pauses still counts as an answer.
    session.feed(&[0xD0, 0]);
    for now in 1_100..1_104 {
        channel.poll(now).unwrap();
    }
    assert!(channel.is_connected());
    channel.poll(2_000).unwrap();
    assert_eq!(session.take_output(), [0xC0, 0]);
    assert!(channel.is_connected());
}

#[test]
fn test_slow_broker_puback() {
    let session = slow_broker_session();
    let options = Options {
        client_id: "presslog-test",
        keep_alive_seconds: 0,
        clean_session: true,
    };
    let mut client = Client::connect(session.clone(), options).unwrap();
    client.publish("t", b"x", QoS::AtLeastOnce).unwrap();

    session.feed(&[0x40, 2, 0, 1]);
    let incoming: Vec<Incoming> = (0..4).filter_map(|_| client.poll(0).unwrap()).collect();
    assert_eq!(incoming, [Incoming::PubAck(1)]);
}

#[test]
fn test_silent_broker_times_out_connect() {
    let mut channel = channel_with(&[MockConnection::default()], 60);
    assert_eq!(channel.connect(), Err(Error::Timeout));
    assert!(!channel.is_connected());
}

#[cfg(feature = "std")]
#[test]
fn test_tcp_broker_with_delayed_replies() {
    use presslog::network::tcp::TcpConnector;
    use std::io::{Read, Write};
    use std::time::Duration;

    let broker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = broker.local_addr().unwrap().to_string();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = broker.accept().unwrap();
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        stream.write_all(&CONNACK_OK).unwrap();

        // PINGRESP split across two segments.
        stream.write_all(&[0xD0]).unwrap();
        stream.flush().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        stream.write_all(&[0]).unwrap();

        // Hold the session open until the client hangs up.
        while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
    });

    let mut channel =
        MqttChannel::new(TcpConnector::default(), &address, "presslog-test", 60).unwrap();
    channel.connect().unwrap();
    for now in 0..20 {
        channel.poll(now).unwrap();
    }
    assert!(channel.is_connected());
    channel.disconnect().unwrap();
    handle.join().unwrap();
}

#[test]
fn test_refused_connect_leaves_channel_down() {
    let refused = MockConnection::default();
    refused.feed(&[0x20, 2, 0, 5]);
    let mut channel = channel_with(&[refused], 60);

    assert_eq!(channel.connect(), Err(Error::ConnectionRefused));
    assert!(!channel.is_connected());

    // No more sessions on offer: the connector itself refuses.
    assert_eq!(channel.connect(), Err(Error::ConnectionRefused));
}

#[test]
fn test_write_failure_drops_session() {
    let session = broker_session();
    let mut channel = channel_with(&[session.clone()], 60);
    channel.connect().unwrap();

    session.wire.borrow_mut().fail_writes = true;
    assert_eq!(channel.publish("t", b"x"), Err(Error::WriteError));
    assert!(!channel.is_connected());
    assert_eq!(channel.publish("t", b"x"), Err(Error::NotOpen));
}

#[test]
fn test_disconnect_sends_disconnect_and_closes() {
    let session = broker_session();
    let mut channel = channel_with(&[session.clone()], 60);
    channel.connect().unwrap();
    session.take_output();

    channel.disconnect().unwrap();
    assert_eq!(session.take_output(), [0xE0, 0]);
    assert!(session.wire.borrow().closed);
    assert!(!channel.is_connected());
    assert_eq!(channel.disconnect(), Ok(()));
}

#[test]
fn test_qos1_publish_and_puback() {
    let session = broker_session();
    let options = Options {
        client_id: "presslog-test",
        keep_alive_seconds: 0,
        clean_session: true,
    };
    let mut client = Client::connect(session.clone(), options).unwrap();
    session.take_output();

    client.publish("t", b"x", QoS::AtLeastOnce).unwrap();
    assert_eq!(session.take_output(), [0x32, 6, 0, 1, b't', 0, 1, b'x']);

    session.feed(&[0x40, 2, 0, 1]);
    assert_eq!(client.poll(0), Ok(Some(Incoming::PubAck(1))));
    assert_eq!(client.poll(10_000), Ok(None));
}

#[test]
fn test_forwarding_retries_on_fixed_interval() {
    // First attempt refused, the one five seconds later accepted.
    let refused = MockConnection::default();
    refused.feed(&[0x20, 2, 0, 3]);
    let mut forward = ForwardingChannel::new(
        channel_with(&[refused, broker_session()], 60),
        "nursery/events",
        5_000,
    );
    let link = Link(true);

    assert_eq!(forward.tick(0, &link), LinkEvent::ConnectFailed);
    assert_eq!(forward.publish(b"dropped\n"), Delivery::Dropped);
    assert_eq!(forward.tick(4_999, &link), LinkEvent::Idle);
    assert_eq!(forward.tick(5_000, &link), LinkEvent::Connected);
    assert_eq!(forward.publish(b"sent\n"), Delivery::Sent);
    assert_eq!(forward.last_attempt_at(), Some(5_000));
}

#[cfg(feature = "std")]
#[test]
#[ignore = "needs a reachable MQTT broker"]
fn test_live_broker_publish() {
    use presslog::network::tcp::TcpConnector;

    dotenvy::dotenv().ok();
    let address =
        std::env::var("TEST_MQTT_ADDRESS").unwrap_or("test.mosquitto.org:1883".to_string());
    let mut channel =
        MqttChannel::new(TcpConnector::default(), &address, "presslog-live-test", 10).unwrap();

    channel.connect().expect("Failed to connect to broker");
    channel
        .publish("presslog/test", b"2024-01-01 08:00:00 Blue\n")
        .expect("Failed to publish");
    channel.poll(0).expect("Failed to poll");
    channel.disconnect().expect("Failed to disconnect");
}
