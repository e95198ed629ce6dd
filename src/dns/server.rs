//! UDP server implementation for DNS

use std::collections::VecDeque;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::Builder;

use derive_more::{Display, Error, From};

use crate::dns::authority::Authority;
use crate::dns::buffer::{BytePacketBuffer, MAX_PACKET_SIZE};
use crate::dns::context::ServerContext;
use crate::dns::errors::{DecodeError, ProtocolError};
use crate::dns::protocol::{
    DnsHeader, DnsPacket, DnsQuestion, MessageType, OpCode, ResultCode,
};

/// Datagrams waiting for a worker beyond this are dropped
pub const DEFAULT_QUEUE_LIMIT: usize = 1024;

#[derive(Debug, Display, From, Error)]
pub enum ServerError {
    Io(std::io::Error),
}

type Result<T> = std::result::Result<T, ServerError>;

macro_rules! return_or_report {
    ( $x:expr, $message:expr ) => {
        match $x {
            Ok(res) => res,
            Err(e) => {
                log::info!("{}: {}", $message, e);
                return;
            }
        }
    };
}

macro_rules! ignore_or_report {
    ( $x:expr, $message:expr ) => {
        match $x {
            Ok(_) => {}
            Err(e) => {
                log::info!("{}: {}", $message, e);
                return;
            }
        };
    };
}

/// Common trait for DNS servers
pub trait DnsServer {
    /// Initialize the server and start listenening
    ///
    /// This method should _NOT_ block. Rather, servers are expected to spawn a new
    /// thread to handle requests and return immediately with the address they
    /// are bound to.
    fn run_server(self) -> Result<SocketAddr>;
}

/// Build the initial response packet with common headers
///
/// Only the id, the opcode and the recursion desired flag are carried over
/// from the request.
fn build_response_packet(request: &DnsHeader) -> DnsPacket {
    let mut packet = DnsPacket::new();
    packet.header.id = request.id;
    packet.header.message_type = MessageType::Response;
    packet.header.opcode = request.opcode;
    packet.header.recursion_desired = request.recursion_desired;
    packet.header.recursion_available = false;
    packet.header.truncated_message = false;
    packet.header.authoritative_answer = false;
    packet.header.rescode = ResultCode::NoError;
    packet
}

/// Decode a request and resolve all of its questions
///
/// Anything in the request past the questions is ignored. A decode error
/// means there is nothing sensible to answer.
pub fn resolve_request(
    authority: &Authority,
    request: &[u8],
) -> std::result::Result<DnsPacket, DecodeError> {
    let mut req_buffer = BytePacketBuffer::from_bytes(request);
    let header = DnsHeader::read(&mut req_buffer)?;

    let mut packet = build_response_packet(&header);

    if header.message_type != MessageType::Query || header.opcode != OpCode::Query {
        log::debug!(
            "NOTIMP: {:?} with opcode {:?}",
            header.message_type,
            header.opcode
        );
        packet.header.rescode = ResultCode::NotImplemented;
        return Ok(packet);
    }

    let mut all_authoritative = header.questions > 0;
    for i in 0..header.questions {
        let question = DnsQuestion::read(&mut req_buffer).map_err(|e| {
            log::debug!(
                "failed to read question {} of {}: {}",
                i + 1,
                header.questions,
                e
            );
            e
        })?;

        let resolution = authority.resolve(&question);
        if resolution.authoritative {
            if resolution.answers.is_empty() {
                packet.header.rescode = ResultCode::NameError;
            }
        } else {
            all_authoritative = false;
        }

        packet.questions.push(question);
        packet.answers.extend(resolution.answers);
        packet.authorities.extend(resolution.authorities);
        packet.resources.extend(resolution.resources);
    }

    packet.header.authoritative_answer = all_authoritative;

    Ok(packet)
}

/// Perform the actual work for a query
///
/// Takes the raw request datagram and returns the exact bytes to send back.
/// A request that cannot be decoded, or a response that does not fit in a
/// single 512 octet datagram, produces an error and nothing should be sent.
pub fn execute_query(
    context: &ServerContext,
    request: &[u8],
) -> std::result::Result<Vec<u8>, ProtocolError> {
    let mut packet = resolve_request(&context.authority, request)?;

    log::debug!(
        "response {} with {} answer(s), rescode {:?}",
        packet.header.id,
        packet.answers.len(),
        packet.header.rescode
    );

    Ok(packet.to_bytes()?)
}

/// The UDP server
///
/// Accepts DNS queries through UDP, and uses the `ServerContext` to determine
/// how to service the request. Datagrams are read on a single thread and
/// queued for a fixed pool of worker threads.
pub struct DnsUdpServer {
    context: Arc<ServerContext>,
    request_queue: Arc<Mutex<VecDeque<(SocketAddr, Vec<u8>)>>>,
    request_cond: Arc<Condvar>,
    thread_count: usize,
    queue_limit: usize,
}

impl DnsUdpServer {
    pub fn new(context: Arc<ServerContext>, thread_count: usize) -> DnsUdpServer {
        DnsUdpServer {
            context,
            request_queue: Arc::new(Mutex::new(VecDeque::new())),
            request_cond: Arc::new(Condvar::new()),
            thread_count: thread_count.max(1),
            queue_limit: DEFAULT_QUEUE_LIMIT,
        }
    }
}

impl DnsUdpServer {
    /// Process a single datagram and send the response
    fn process_request(
        socket: &UdpSocket,
        context: &ServerContext,
        src: SocketAddr,
        request: &[u8],
    ) {
        let data = match execute_query(context, request) {
            Ok(data) => data,
            Err(ProtocolError::Decode(e)) => {
                log::info!("Failed to parse UDP query packet from {}: {}", src, e);
                context
                    .statistics
                    .dropped_count
                    .fetch_add(1, Ordering::Release);
                return;
            }
            Err(ProtocolError::Encode(e)) => {
                log::warn!("Failed to build response for {}: {}", src, e);
                context
                    .statistics
                    .dropped_count
                    .fetch_add(1, Ordering::Release);
                return;
            }
        };

        ignore_or_report!(
            socket.send_to(&data, src),
            "Failed to send response packet"
        );
        context
            .statistics
            .response_count
            .fetch_add(1, Ordering::Release);
    }

    /// Spawn a worker thread to handle DNS requests
    fn spawn_request_handler(
        &self,
        thread_id: usize,
        socket: UdpSocket,
    ) -> std::io::Result<()> {
        let context = self.context.clone();
        let request_cond = self.request_cond.clone();
        let request_queue = self.request_queue.clone();

        let name = format!("DnsUdpServer-request-{}", thread_id);

        Builder::new().name(name).spawn(move || loop {
            let (src, request) = {
                let mut queue =
                    return_or_report!(request_queue.lock(), "Request queue poisoned");
                loop {
                    if let Some(item) = queue.pop_front() {
                        break item;
                    }
                    queue =
                        return_or_report!(request_cond.wait(queue), "Request queue poisoned");
                }
            };

            Self::process_request(&socket, &context, src, &request);
        })?;

        Ok(())
    }

    /// Spawn the main incoming request handler thread
    fn spawn_incoming_handler(self, socket: UdpSocket) -> std::io::Result<()> {
        Builder::new()
            .name("DnsUdpServer-incoming".into())
            .spawn(move || {
                let mut buf = [0u8; MAX_PACKET_SIZE];
                loop {
                    let (len, src) = match socket.recv_from(&mut buf) {
                        Ok(x) => x,
                        Err(e) => {
                            log::info!("Failed to read from UDP socket: {:?}", e);
                            continue;
                        }
                    };

                    self.context
                        .statistics
                        .udp_query_count
                        .fetch_add(1, Ordering::Release);

                    self.enqueue_request(src, buf[..len].to_vec());
                }
            })?;

        Ok(())
    }

    /// Add a request to the queue and notify a waiting worker
    ///
    /// When the queue is full the datagram is dropped.
    fn enqueue_request(&self, src: SocketAddr, request: Vec<u8>) {
        match self.request_queue.lock() {
            Ok(mut queue) => {
                if queue.len() >= self.queue_limit {
                    log::info!("Request queue full, dropping datagram from {}", src);
                    self.context
                        .statistics
                        .dropped_count
                        .fetch_add(1, Ordering::Release);
                    return;
                }
                queue.push_back((src, request));
                self.request_cond.notify_one();
            }
            Err(e) => {
                log::info!("Failed to send UDP request for processing: {}", e);
            }
        }
    }
}

impl DnsServer for DnsUdpServer {
    /// Launch the server
    ///
    /// This method takes ownership of the server, preventing the method from
    /// being called multiple times.
    fn run_server(self) -> Result<SocketAddr> {
        let socket = UdpSocket::bind(self.context.listen)?;
        let local_addr = socket.local_addr()?;

        for thread_id in 0..self.thread_count {
            let socket_clone = socket.try_clone()?;
            self.spawn_request_handler(thread_id, socket_clone)?;
        }

        self.spawn_incoming_handler(socket)?;

        log::info!("Listening for DNS queries on {}", local_addr);

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {

    use std::net::Ipv4Addr;

    use super::*;
    use crate::dns::context::tests::create_test_context;
    use crate::dns::errors::EncodeError;
    use crate::dns::protocol::ResourceRecord;
    use crate::dns::query_type::RecordType;

    fn build_query(id: u16, questions: &[(&str, RecordType)]) -> Vec<u8> {
        let mut packet = DnsPacket::new();
        packet.header.id = id;
        packet.header.recursion_desired = true;
        for (name, qtype) in questions {
            packet
                .questions
                .push(DnsQuestion::new(name.to_string(), *qtype));
        }
        packet.to_bytes().unwrap()
    }

    fn decode(data: &[u8]) -> DnsPacket {
        let mut buffer = BytePacketBuffer::from_bytes(data);
        DnsPacket::from_buffer(&mut buffer).unwrap()
    }

    fn run_query(
        context: &ServerContext,
        id: u16,
        questions: &[(&str, RecordType)],
    ) -> DnsPacket {
        decode(&execute_query(context, &build_query(id, questions)).unwrap())
    }

    #[test]
    fn test_execute_query() {
        let context = create_test_context();

        // A record inside the zone
        let res = run_query(&context, 42, &[("test.kausm.in", RecordType::A)]);
        assert_eq!(42, res.header.id);
        assert_eq!(MessageType::Response, res.header.message_type);
        assert!(res.header.recursion_desired);
        assert!(!res.header.recursion_available);
        assert!(res.header.authoritative_answer);
        assert_eq!(ResultCode::NoError, res.header.rescode);
        assert_eq!(1, res.questions.len());
        assert_eq!(1, res.answers.len());
        assert_eq!(vec![134, 209, 148, 50], res.answers[0].data);
        assert_eq!(600, res.answers[0].ttl);

        // Missing name inside the zone
        let res = run_query(&context, 43, &[("nope.kausm.in", RecordType::A)]);
        assert!(res.header.authoritative_answer);
        assert_eq!(ResultCode::NameError, res.header.rescode);
        assert!(res.answers.is_empty());

        // Existing name, other type
        let res = run_query(&context, 44, &[("test.kausm.in", RecordType::Mx)]);
        assert_eq!(ResultCode::NameError, res.header.rescode);

        // Outside the zone
        let res = run_query(&context, 45, &[("google.com", RecordType::A)]);
        assert!(!res.header.authoritative_answer);
        assert_eq!(ResultCode::NoError, res.header.rescode);
        assert!(res.answers.is_empty());
        assert_eq!(1, res.questions.len());
    }

    #[test]
    fn test_execute_query_soa() {
        let context = create_test_context();

        let res = run_query(&context, 7, &[("KAUSM.IN", RecordType::Soa)]);
        assert!(res.header.authoritative_answer);
        assert_eq!(1, res.answers.len());
        assert_eq!(RecordType::Soa, res.answers[0].rtype);
        assert_eq!("kausm.in", res.answers[0].domain);
        assert_eq!("KAUSM.IN", res.questions[0].name);
    }

    #[test]
    fn test_execute_query_multiple_questions() {
        let context = create_test_context();

        let res = run_query(
            &context,
            9,
            &[("test.kausm.in", RecordType::A), ("kausm.in", RecordType::Soa)],
        );
        assert!(res.header.authoritative_answer);
        assert_eq!(ResultCode::NoError, res.header.rescode);
        assert_eq!(2, res.questions.len());
        assert_eq!(RecordType::A, res.answers[0].rtype);
        assert_eq!(RecordType::Soa, res.answers[1].rtype);

        let res = run_query(
            &context,
            10,
            &[("test.kausm.in", RecordType::A), ("nope.kausm.in", RecordType::A)],
        );
        assert!(res.header.authoritative_answer);
        assert_eq!(ResultCode::NameError, res.header.rescode);
        assert_eq!(1, res.answers.len());
    }

    #[test]
    fn test_execute_query_mixed_zones_clear_aa() {
        let context = create_test_context();

        // In-zone question last
        let res = run_query(
            &context,
            11,
            &[("example.com", RecordType::A), ("test.kausm.in", RecordType::A)],
        );
        assert!(!res.header.authoritative_answer);
        assert_eq!(ResultCode::NoError, res.header.rescode);
        assert_eq!(1, res.answers.len());

        // In-zone question first
        let res = run_query(
            &context,
            12,
            &[("test.kausm.in", RecordType::A), ("example.com", RecordType::A)],
        );
        assert!(!res.header.authoritative_answer);
        assert_eq!(ResultCode::NoError, res.header.rescode);
        assert_eq!(1, res.answers.len());

        // An in-zone miss still sets NameError
        let res = run_query(
            &context,
            13,
            &[("example.com", RecordType::A), ("nope.kausm.in", RecordType::A)],
        );
        assert!(!res.header.authoritative_answer);
        assert_eq!(ResultCode::NameError, res.header.rescode);
    }

    #[test]
    fn test_execute_query_not_implemented() {
        let context = create_test_context();

        let mut request = DnsPacket::new();
        request.header.id = 42;
        request.header.opcode = OpCode::InverseQuery;
        request.header.recursion_desired = true;
        request
            .questions
            .push(DnsQuestion::new("test.kausm.in".to_string(), RecordType::A));

        let data = execute_query(&context, &request.to_bytes().unwrap()).unwrap();
        assert_eq!(
            vec![0x00, 0x2a, 0x89, 0x04, 0, 0, 0, 0, 0, 0, 0, 0],
            data
        );

        // A response is never answered with records either
        let mut request = DnsPacket::new();
        request.header.message_type = MessageType::Response;
        request
            .questions
            .push(DnsQuestion::new("test.kausm.in".to_string(), RecordType::A));

        let res = decode(&execute_query(&context, &request.to_bytes().unwrap()).unwrap());
        assert_eq!(ResultCode::NotImplemented, res.header.rescode);
        assert!(res.questions.is_empty());
        assert!(res.answers.is_empty());
    }

    #[test]
    fn test_execute_query_without_questions() {
        let context = create_test_context();

        let data = execute_query(&context, &build_query(1, &[])).unwrap();
        assert_eq!(vec![0x00, 0x01, 0x81, 0x00, 0, 0, 0, 0, 0, 0, 0, 0], data);

        let res = decode(&data);
        assert_eq!(ResultCode::NoError, res.header.rescode);
        assert!(!res.header.authoritative_answer);
        assert!(res.questions.is_empty());
        assert!(res.answers.is_empty());
    }

    #[test]
    fn test_execute_query_echoes_binary_labels() {
        let context = create_test_context();

        let mut request = vec![0x00, 0x2a, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        request.extend_from_slice(b"\x01\xff\x05kausm\x02in\x00\x00\x01\x00\x01");

        let data = execute_query(&context, &request).unwrap();
        assert_eq!(&request[12..], &data[12..]);
        assert_eq!(0x85, data[2]);
        assert_eq!(0x03, data[3]);

        // Long labels of escaped octets still fit once encoded again
        let mut request = vec![0x00, 0x2b, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        request.push(40);
        request.extend(std::iter::repeat(0xffu8).take(40));
        request.extend_from_slice(b"\x05kausm\x02in\x00\x00\x01\x00\x01");

        let data = execute_query(&context, &request).unwrap();
        assert_eq!(&request[12..], &data[12..]);

        // A dot inside a label stays inside it
        let mut request = vec![0x00, 0x2c, 0x01, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        request.extend_from_slice(b"\x06test.k\x05kausm\x02in\x00\x00\x01\x00\x01");

        let data = execute_query(&context, &request).unwrap();
        assert_eq!(&request[12..], &data[12..]);
    }

    #[test]
    fn test_request_queue_is_bounded() {
        let context = create_test_context();
        let mut server = DnsUdpServer::new(context.clone(), 1);
        server.queue_limit = 2;

        let src = SocketAddr::from((Ipv4Addr::LOCALHOST, 5300));
        for _ in 0..3 {
            server.enqueue_request(src, vec![0; 12]);
        }

        assert_eq!(2, server.request_queue.lock().unwrap().len());
        assert_eq!(1, context.statistics.get_dropped_count());
    }

    #[test]
    fn test_execute_query_drops_malformed_requests() {
        let context = create_test_context();

        // Truncated header
        assert!(matches!(
            execute_query(&context, &[0x00, 0x2a, 0x01]),
            Err(ProtocolError::Decode(DecodeError::EndOfBuffer))
        ));

        // Opcode 4 is outside the supported range
        assert!(matches!(
            execute_query(&context, &[0x00, 0x2a, 0x20, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::Decode(DecodeError::InvalidOpCode(4)))
        ));

        // Question count larger than what was sent
        let mut data = build_query(2, &[("test.kausm.in", RecordType::A)]);
        data[5] = 2;
        assert!(matches!(
            execute_query(&context, &data),
            Err(ProtocolError::Decode(DecodeError::EndOfBuffer))
        ));
    }

    #[test]
    fn test_execute_query_response_too_large() {
        let records = (0..20)
            .map(|i| {
                ResourceRecord::new(
                    format!("big{}.kausm.in", i),
                    RecordType::Txt,
                    60,
                    vec![b'x'; 100],
                )
            })
            .collect::<Vec<_>>();

        let context = ServerContext::new(
            Authority::new("kausm.in", records),
            SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            1,
        );

        let query = |count: usize| {
            let mut packet = DnsPacket::new();
            for i in 0..count {
                packet
                    .questions
                    .push(DnsQuestion::new(format!("big{}.kausm.in", i), RecordType::Txt));
            }
            packet.to_bytes().unwrap()
        };

        assert!(execute_query(&context, &query(3)).is_ok());
        assert!(matches!(
            execute_query(&context, &query(6)),
            Err(ProtocolError::Encode(EncodeError::BufferTooSmall { .. }))
        ));
    }
}
