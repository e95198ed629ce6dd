//! Integration tests for ApexDNS
//!
//! These tests run the UDP server on a loopback port and talk to it the way a
//! resolver would.

use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use apexdns::dns::authority::Authority;
use apexdns::dns::buffer::BytePacketBuffer;
use apexdns::dns::config::default_records;
use apexdns::dns::context::ServerContext;
use apexdns::dns::protocol::{DnsPacket, DnsQuestion, MessageType, OpCode, ResultCode};
use apexdns::dns::query_type::RecordType;
use apexdns::dns::server::{DnsServer, DnsUdpServer};

fn start_server() -> (Arc<ServerContext>, SocketAddr) {
    let context = Arc::new(ServerContext::new(
        Authority::new("kausm.in", default_records()),
        SocketAddr::from(([127, 0, 0, 1], 0)),
        2,
    ));

    let server = DnsUdpServer::new(context.clone(), context.thread_count);
    let addr = server.run_server().expect("Failed to start server");

    (context, addr)
}

fn client_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    socket
}

fn exchange(socket: &UdpSocket, server: SocketAddr, request: &mut DnsPacket) -> DnsPacket {
    socket.send_to(&request.to_bytes().unwrap(), server).unwrap();

    let mut buffer = BytePacketBuffer::new();
    let (len, _) = socket.recv_from(&mut buffer.buf).unwrap();
    buffer.len = len;

    DnsPacket::from_buffer(&mut buffer).unwrap()
}

fn query(id: u16, name: &str, qtype: RecordType) -> DnsPacket {
    let mut packet = DnsPacket::new();
    packet.header.id = id;
    packet.header.recursion_desired = true;
    packet
        .questions
        .push(DnsQuestion::new(name.to_string(), qtype));
    packet
}

/// Test a complete exchange for a record inside the zone
#[test]
fn test_udp_query_answered() {
    let (context, addr) = start_server();
    let socket = client_socket();

    let response = exchange(&socket, addr, &mut query(4242, "test.kausm.in", RecordType::A));

    assert_eq!(4242, response.header.id);
    assert_eq!(MessageType::Response, response.header.message_type);
    assert!(response.header.authoritative_answer);
    assert!(response.header.recursion_desired);
    assert!(!response.header.recursion_available);
    assert_eq!(ResultCode::NoError, response.header.rescode);
    assert_eq!(1, response.answers.len());
    assert_eq!("test.kausm.in", response.answers[0].domain);
    assert_eq!(vec![134, 209, 148, 50], response.answers[0].data);

    assert!(context.statistics.get_udp_query_count() >= 1);
}

#[test]
fn test_udp_name_error_and_out_of_zone() {
    let (_context, addr) = start_server();
    let socket = client_socket();

    let response = exchange(&socket, addr, &mut query(1, "missing.kausm.in", RecordType::A));
    assert_eq!(ResultCode::NameError, response.header.rescode);
    assert!(response.header.authoritative_answer);
    assert!(response.answers.is_empty());

    let response = exchange(&socket, addr, &mut query(2, "example.com", RecordType::A));
    assert_eq!(ResultCode::NoError, response.header.rescode);
    assert!(!response.header.authoritative_answer);
    assert!(response.answers.is_empty());
}

#[test]
fn test_udp_not_implemented() {
    let (_context, addr) = start_server();
    let socket = client_socket();

    let mut request = query(42, "test.kausm.in", RecordType::A);
    request.header.opcode = OpCode::Status;

    let response = exchange(&socket, addr, &mut request);
    assert_eq!(42, response.header.id);
    assert_eq!(OpCode::Status, response.header.opcode);
    assert_eq!(ResultCode::NotImplemented, response.header.rescode);
    assert!(response.questions.is_empty());
    assert!(response.answers.is_empty());
}

/// A malformed datagram gets no reply, and the server keeps serving
#[test]
fn test_udp_malformed_request_dropped() {
    let (context, addr) = start_server();
    let socket = client_socket();

    socket.send_to(&[0x00, 0x01, 0x01], addr).unwrap();

    let response = exchange(&socket, addr, &mut query(7, "kausm.in", RecordType::Soa));
    assert_eq!(7, response.header.id);
    assert_eq!(1, response.answers.len());
    assert_eq!(RecordType::Soa, response.answers[0].rtype);

    // Workers may finish out of order
    let mut dropped = 0;
    for _ in 0..100 {
        dropped = context.statistics.get_dropped_count();
        if dropped > 0 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(1, dropped);
}
