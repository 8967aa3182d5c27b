//! End-to-end scenarios against the in-memory mock broker, covering the
//! seed suite in spec.md §8.

use stomp_sync::mock::MockTransport;
use stomp_sync::{AckMode, Client, ConnectionParams, StompError};

fn connect_with(extra_inbound: &[u8]) -> Client<MockTransport> {
    connect_with_uri("stomp://test:test@h/vh", extra_inbound)
}

fn connect_with_uri(uri: &str, extra_inbound: &[u8]) -> Client<MockTransport> {
    let mut transport = MockTransport::new();
    transport.push_inbound(b"CONNECTED\r\nserver:mock\r\n\r\n\x00");
    transport.push_inbound(extra_inbound);
    let params = ConnectionParams::parse(uri).unwrap();
    let mut client = Client::new(transport, params);
    client.connect().unwrap();
    client
}

#[test]
fn scenario_a_connect_captures_server_metadata() {
    let client = connect_with(b"");
    assert!(client.is_connected());
    assert_eq!(client.server_header("server"), Some("mock"));
}

#[test]
fn scenario_b_send_produces_exact_wire_bytes() {
    let mut client = connect_with(b"");
    client
        .send("/q", b"Hello world!", Some("text/plain"))
        .unwrap();
    assert_eq!(
        client.transport().outbound_str(),
        "SEND\r\ndestination:/q\r\ncontent-length:12\r\ncontent-type:text/plain\r\n\r\nHello world!\x00"
    );
}

#[test]
fn scenario_c_message_parsed_with_case_insensitive_header_lookup() {
    let mut client = connect_with(
        b"MESSAGE\r\ncontent-type:text/plain\r\ncontent-length:7\r\n\r\nDumb.\n\n\x00",
    );
    client.on_message(|_client, msg| {
        assert_eq!(msg.payload_str(), "Dumb.\n\n");
        assert_eq!(msg.get("Content-Type"), Some("text/plain"));
    });
    client.wait_for_messages(false).unwrap();
}

#[test]
fn scenario_d_missed_heartbeat_disconnects_by_default() {
    let mut client = connect_with_uri("stomp://test:test@h/vh?heartbeat=1", b"");
    client.transport_mut().force_timeout = true;
    let err = client.wait_for_messages(false).unwrap_err();
    assert!(matches!(err, StompError::HeartbeatTimeout { .. }));
    assert!(!client.is_connected());
}

#[test]
fn scenario_d_custom_missed_heartbeat_handler_does_not_raise() {
    let mut client = connect_with_uri("stomp://test:test@h/vh?heartbeat=1", b"");
    client.transport_mut().force_timeout = true;
    let mut fired = false;
    client.on_missed_heartbeat(move |c| {
        fired = true;
        c.disconnect().unwrap();
    });
    client.wait_for_messages(false).unwrap();
    assert!(!client.is_connected());
}

#[test]
fn scenario_e_commit_clears_single_open_transaction() {
    let mut client = connect_with(b"");
    client.begin("t1").unwrap();
    client.send("/q", b"x", None).unwrap();
    assert!(client
        .transport()
        .outbound_str()
        .contains("transaction:t1"));
    client.commit(None).unwrap();
    assert!(client.transactions().is_empty());
}

#[test]
fn scenario_f_auto_attach_disabled_with_two_open_transactions() {
    let mut client = connect_with(b"");
    client.begin("t1").unwrap();
    client.begin("t2").unwrap();
    client.send("/q", b"x", None).unwrap();
    let sent = client.transport().outbound_str().to_string();
    let send_frame = sent.rsplit("SEND").next().unwrap();
    assert!(!send_frame.contains("transaction:"));
}

#[test]
fn unsubscribe_tombstones_slot_and_preserves_ids() {
    let mut client = connect_with(b"");
    let id_a = client.subscribe("/a", AckMode::Auto, None).unwrap();
    let id_b = client.subscribe("/b", AckMode::Auto, None).unwrap();
    assert_eq!(id_a, "0");
    assert_eq!(id_b, "1");

    client.unsubscribe("/a").unwrap();
    assert_eq!(client.subscriptions(), &["".to_string(), "/b".to_string()]);

    let id_c = client.subscribe("/c", AckMode::Auto, None).unwrap();
    assert_eq!(id_c, "2");
}

#[test]
fn disconnect_is_idempotent() {
    let mut client = connect_with(b"");
    client.disconnect().unwrap();
    assert!(!client.is_connected());
    client.disconnect().unwrap();
    assert!(!client.is_connected());
}

#[test]
fn send_without_connection_fails() {
    let transport = MockTransport::new();
    let params = ConnectionParams::parse("stomp://h/vh").unwrap();
    let mut client = Client::new(transport, params);
    let err = client.send("/q", b"x", None).unwrap_err();
    assert!(matches!(err, StompError::NotConnected));
}

#[test]
fn non_connected_reply_to_connect_is_protocol_error() {
    let mut transport = MockTransport::new();
    transport.push_inbound(b"ERROR\r\nmessage:bad credentials\r\n\r\n\x00");
    let params = ConnectionParams::parse("stomp://h/vh").unwrap();
    let mut client = Client::new(transport, params);
    let err = client.connect().unwrap_err();
    match err {
        StompError::Protocol { message, .. } => assert_eq!(message, "bad credentials"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!client.is_connected());
}

#[test]
fn connect_routes_non_connected_reply_through_custom_error_handler() {
    let mut transport = MockTransport::new();
    transport.push_inbound(b"ERROR\r\nmessage:bad credentials\r\n\r\n\x00");
    let params = ConnectionParams::parse("stomp://h/vh").unwrap();
    let mut client = Client::new(transport, params);
    let mut fired = false;
    client.on_error(move |_client, resp| {
        fired = true;
        assert_eq!(resp.get("message"), Some("bad credentials"));
    });
    client.connect().unwrap();
    assert!(!client.is_connected());
}

#[test]
fn ack_and_nack_auto_attach_single_transaction() {
    let mut client = connect_with(b"");
    client.begin("tx").unwrap();
    client.ack("m1").unwrap();
    let sent = client.transport().outbound_str().to_string();
    let ack_frame = sent.rsplit("ACK").next().unwrap();
    assert!(ack_frame.contains("transaction:tx"));
}
