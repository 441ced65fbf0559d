//! End-to-end scenarios over the loopback interface.

use std::thread;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use tidewire::prelude::*;

fn listener() -> (TcpListenerV4, u16) {
    let mut listener = TcpListenerV4::bind(0).unwrap();
    listener.listen().unwrap();
    let port = listener.port();
    (listener, port)
}

fn client(port: u16, timeout_ms: u64) -> TcpV4 {
    let mut tcp = TcpV4::new().unwrap();
    tcp.set_timeout(TimeoutPolicy::from_millis(timeout_ms));
    tcp.set_address("127.0.0.1", port).unwrap();
    tcp
}

/// Send `payload` one way and return what the far side read.
fn carry(payload: Vec<u8>) -> Vec<u8> {
    let (listener, port) = listener();
    let len = payload.len();
    let server = thread::spawn(move || {
        let mut peer = listener.accept().unwrap();
        peer.set_timeout(TimeoutPolicy::from_millis(5_000));
        peer.receive(len).unwrap()
    });

    let mut tcp = client(port, 5_000);
    tcp.connect().unwrap();
    assert_eq!(tcp.send(&payload).unwrap(), len);
    let received = server.join().unwrap();
    tcp.close();
    received
}

#[test]
fn test_echo_ping() {
    let (listener, port) = listener();
    let server = thread::spawn(move || {
        let mut peer = listener.accept().unwrap();
        peer.set_timeout(TimeoutPolicy::from_millis(2_000));
        let data = peer.receive(4).unwrap();
        peer.send(&data).unwrap();
    });

    let mut tcp = client(port, 2_000);
    tcp.connect().unwrap();
    assert_eq!(tcp.send(b"ping").unwrap(), 4);
    assert_eq!(tcp.receive(4).unwrap(), b"ping");
    server.join().unwrap();
}

#[test]
fn test_ten_mebibytes_arrive_intact() {
    let payload: Vec<u8> = (0..10 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let received = carry(payload.clone());
    assert_eq!(received.len(), payload.len());
    assert!(received == payload);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_payload_integrity(payload in prop::collection::vec(any::<u8>(), 1..200_000)) {
        let received = carry(payload.clone());
        prop_assert_eq!(received, payload);
    }
}

#[test]
fn test_connect_timeout_is_bounded() {
    // Unroutable in most environments; an immediate rejection is also fine.
    let mut tcp = TcpV4::new().unwrap();
    tcp.set_timeout(TimeoutPolicy::from_millis(200));
    tcp.set_address("10.255.255.1", 9).unwrap();

    let start = Instant::now();
    let err = tcp.connect().unwrap_err();
    assert!(start.elapsed() < Duration::from_millis(200) + Duration::from_secs(1));
    assert!(err.is_connect_failure(), "unexpected error: {err}");
    assert!(!tcp.is_open());
}

#[test]
fn test_refused_connect_closes_handle() {
    let port = {
        let (listener, port) = listener();
        drop(listener);
        port
    };
    let mut tcp = client(port, 1_000);
    let err = tcp.connect().unwrap_err();
    assert!(err.is_connect_failure());
    assert!(!tcp.is_open());
    assert!(matches!(tcp.send(b"x"), Err(TransportError::NotOpen)));
}

#[test]
fn test_short_read_when_peer_closes() {
    let (listener, port) = listener();
    let server = thread::spawn(move || {
        let mut peer = listener.accept().unwrap();
        peer.send(b"abc").unwrap();
        peer.close();
    });

    let mut tcp = client(port, 2_000);
    tcp.connect().unwrap();
    server.join().unwrap();
    assert_eq!(tcp.receive(10).unwrap(), b"abc");
}

#[test]
fn test_receive_timeout_on_silent_peer() {
    let (listener, port) = listener();
    let mut tcp = client(port, 50);
    tcp.connect().unwrap();
    let _peer = listener.accept().unwrap();

    let start = Instant::now();
    let err = tcp.receive(1).unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(!tcp.is_open());
}

#[test]
fn test_datagram_reports_source() {
    let mut receiver = UdpV4::bind(0).unwrap();
    receiver.set_timeout(TimeoutPolicy::from_millis(2_000));
    let port = receiver.local_addr().unwrap().port();

    let mut sender = UdpV4::bind(0).unwrap();
    let sender_port = sender.local_addr().unwrap().port();
    sender.set_address("127.0.0.1", port).unwrap();
    assert_eq!(sender.send(b"hello").unwrap(), 5);

    let (data, from) = receiver.receive_from().unwrap();
    assert_eq!(data, b"hello");
    assert_eq!(from.port(), sender_port);
    assert!(from.ip().is_loopback());
}

#[test]
fn test_double_close_is_noop() {
    let mut tcp = TcpV4::new().unwrap();
    assert!(tcp.is_open());
    tcp.close();
    tcp.close();
    assert!(!tcp.is_open());
    assert!(tcp.raw_fd().is_none());

    let mut udp = UdpV4::new().unwrap();
    udp.close();
    udp.close();
    assert!(!udp.is_open());
}

#[test]
fn test_ipv4_literal_rejected_by_ipv6_transport() {
    let mut tcp = TcpV6::new().unwrap();
    assert!(matches!(
        tcp.set_address("127.0.0.1", 80),
        Err(TransportError::FamilyMismatch { .. })
    ));
    assert!(matches!(
        tcp.set_address("not-an-ip", 80),
        Err(TransportError::InvalidAddress(_))
    ));
    assert!(tcp.is_open());
}

#[test]
fn test_http_literal_response() {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut conn, _) = server.accept().unwrap();
        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        while !seen.ends_with(b"\r\n\r\n") {
            let n = conn.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            seen.extend_from_slice(&buf[..n]);
        }
        conn.write_all(b"HTTP/1.1 200 OK\r\n\r\nOK").unwrap();
    });

    let resolver = StaticResolver::new(vec!["127.0.0.1:0".parse().unwrap()]);
    let mut http = HttpClient::<Inet4, _>::with_resolver("localhost", resolver).unwrap();
    http.set_port(port);
    http.set_timeout(TimeoutPolicy::from_millis(2_000));
    http.connect().unwrap();
    http.get("/", "").unwrap();
    http.receive_response().unwrap();
    handle.join().unwrap();

    assert_eq!(http.response(), b"HTTP/1.1 200 OK\r\n\r\nOK");
}

#[test]
fn test_echo_over_ipv6() {
    let mut listener = TcpListenerV6::bind(0).unwrap();
    listener.listen().unwrap();
    let port = listener.port();
    let server = thread::spawn(move || {
        let mut peer = listener.accept().unwrap();
        peer.set_timeout(TimeoutPolicy::from_millis(2_000));
        let from = peer.peer_addr().unwrap();
        let data = peer.receive(4).unwrap();
        peer.send(&data).unwrap();
        from
    });

    let mut tcp = TcpV6::new().unwrap();
    tcp.set_timeout(TimeoutPolicy::from_millis(2_000));
    tcp.set_address("::1", port).unwrap();
    tcp.connect().unwrap();
    assert_eq!(tcp.send(b"ping").unwrap(), 4);
    assert_eq!(tcp.receive(4).unwrap(), b"ping");

    let from = server.join().unwrap();
    assert!(from.is_ipv6());
    assert_eq!(from.port(), tcp.local_addr().unwrap().port());
}

#[test]
fn test_datagram_over_ipv6_reports_source() {
    let mut receiver = UdpV6::bind(0).unwrap();
    receiver.set_timeout(TimeoutPolicy::from_millis(2_000));
    let port = receiver.local_addr().unwrap().port();

    let mut sender = UdpV6::bind(0).unwrap();
    sender.set_timeout(TimeoutPolicy::from_millis(2_000));
    let sender_port = sender.local_addr().unwrap().port();
    sender.set_address("::1", port).unwrap();
    assert_eq!(sender.send(b"hello6").unwrap(), 6);

    let (data, from) = receiver.receive_from().unwrap();
    assert_eq!(data, b"hello6");
    assert!(from.is_ipv6());
    assert!(from.ip().is_loopback());
    assert_eq!(from.port(), sender_port);

    receiver.send_to(b"back", from).unwrap();
    assert_eq!(sender.receive(16).unwrap(), b"back");
}

#[test]
fn test_http_response_over_ipv6() {
    use std::io::{Read, Write};
    use std::net::TcpListener;

    let server = TcpListener::bind("[::1]:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut conn, _) = server.accept().unwrap();
        let mut seen = Vec::new();
        let mut buf = [0u8; 256];
        while !seen.ends_with(b"\r\n\r\n") {
            let n = conn.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            seen.extend_from_slice(&buf[..n]);
        }
        conn.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").unwrap();
    });

    let resolver = StaticResolver::new(vec!["[::1]:0".parse().unwrap()]);
    let mut http = HttpClient::<Inet6, _>::with_resolver("localhost", resolver).unwrap();
    http.set_port(port);
    http.set_timeout(TimeoutPolicy::from_millis(2_000));
    http.connect().unwrap();
    http.head("/", "").unwrap();
    http.receive_response().unwrap();
    handle.join().unwrap();

    assert_eq!(http.response(), b"HTTP/1.1 204 No Content\r\n\r\n");
}
