//! UDP and TCP server implementations for DNS

use std::collections::VecDeque;
use std::io::Write;
use std::net::SocketAddr;
use std::net::{Shutdown, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::Builder;
use std::time::Duration;

use derive_more::{Display, Error, From};
use rand::random;

use crate::dns::buffer::{BytePacketBuffer, PacketBuffer, StreamPacketBuffer, VectorPacketBuffer};
use crate::dns::context::ServerContext;
use crate::dns::netutil::{read_packet_length, write_packet_length};
use crate::dns::protocol::{DnsPacket, DnsRecord, ResultCode};
use crate::dns::shutdown::ShutdownCoordinator;

#[derive(Debug, Display, From, Error)]
pub enum ServerError {
    Io(std::io::Error),
}

type Result<T> = std::result::Result<T, ServerError>;

macro_rules! return_or_report {
    ( $x:expr, $message:expr ) => {
        match $x {
            Ok(res) => res,
            Err(_) => {
                log::info!($message);
                return;
            }
        }
    };
}

macro_rules! ignore_or_report {
    ( $x:expr, $message:expr ) => {
        match $x {
            Ok(_) => {}
            Err(_) => {
                log::info!($message);
                return;
            }
        };
    };
}

/// Common trait for DNS servers
pub trait DnsServer {
    /// Initialize the server and start listening
    ///
    /// This method should _NOT_ block. Rather, servers are expected to spawn a new
    /// thread to handle requests and return immediately.
    fn run_server(self) -> Result<()>;
}

/// Build the response packet for a request; always returns a valid packet,
/// even on a malformed or unanswerable request, since we still want to send
/// something back to the client.
fn execute_query(context: &Arc<ServerContext>, request: &DnsPacket, client_addr: SocketAddr) -> DnsPacket {
    if request.questions.is_empty() {
        let mut packet = DnsPacket::new();
        packet.header.id = request.header.id;
        packet.header.response = true;
        packet.header.rescode = ResultCode::FORMERR;
        return packet;
    }

    context.handler.handle_query(request, client_addr.ip())
}

/// The UDP server
///
/// Accepts DNS queries through UDP, and uses the `ServerContext` to determine
/// how to service the request. Packets are read on a single thread, after which
/// a new thread is spawned to service the request asynchronously.
pub struct DnsUdpServer {
    context: Arc<ServerContext>,
    shutdown: Arc<ShutdownCoordinator>,
    request_queue: Arc<Mutex<VecDeque<(SocketAddr, DnsPacket)>>>,
    request_cond: Arc<Condvar>,
    thread_count: usize,
}

impl DnsUdpServer {
    pub fn new(
        context: Arc<ServerContext>,
        shutdown: Arc<ShutdownCoordinator>,
        thread_count: usize,
    ) -> DnsUdpServer {
        DnsUdpServer {
            context,
            shutdown,
            request_queue: Arc::new(Mutex::new(VecDeque::new())),
            request_cond: Arc::new(Condvar::new()),
            thread_count,
        }
    }
}

impl DnsUdpServer {
    /// Process a single DNS request and send the response
    fn process_request(
        socket: &UdpSocket,
        context: Arc<ServerContext>,
        shutdown: &Arc<ShutdownCoordinator>,
        src: std::net::SocketAddr,
        request: &DnsPacket,
    ) {
        let _guard = shutdown.register_query();

        let mut size_limit = 512;

        if request.resources.len() == 1 {
            if let DnsRecord::Opt { packet_len, .. } = request.resources[0] {
                size_limit = packet_len as usize;
            }
        }

        let mut res_buffer = VectorPacketBuffer::new();

        let mut packet = execute_query(&context, request, src);
        let _ = packet.write(&mut res_buffer, size_limit);

        let len = res_buffer.pos();
        let data = return_or_report!(res_buffer.get_range(0, len), "Failed to get buffer data");
        ignore_or_report!(socket.send_to(data, src), "Failed to send response packet");
    }

    /// Spawn a worker thread to handle DNS requests
    fn spawn_request_handler(&self, thread_id: usize, socket: UdpSocket) -> std::io::Result<()> {
        let context = self.context.clone();
        let shutdown = self.shutdown.clone();
        let request_cond = self.request_cond.clone();
        let request_queue = self.request_queue.clone();

        let name = format!("DnsUdpServer-request-{}", thread_id);

        Builder::new().name(name).spawn(move || loop {
            let (src, request) = match request_queue
                .lock()
                .ok()
                .and_then(|x| request_cond.wait(x).ok())
                .and_then(|mut x| x.pop_front())
            {
                Some(x) => x,
                None => continue,
            };

            Self::process_request(&socket, context.clone(), &shutdown, src, &request);
        })?;

        Ok(())
    }

    /// Spawn the main incoming request handler thread
    fn spawn_incoming_handler(self, socket: UdpSocket) -> std::io::Result<()> {
        Builder::new()
            .name("DnsUdpServer-incoming".into())
            .spawn(move || loop {
                if self.shutdown.is_shutting_down() {
                    return;
                }

                self.context
                    .statistics
                    .udp_query_count
                    .fetch_add(1, Ordering::Release);

                let mut req_buffer = BytePacketBuffer::new();
                let (_, src) = match socket.recv_from(&mut req_buffer.buf) {
                    Ok(x) => x,
                    Err(e) => {
                        log::info!("Failed to read from UDP socket: {:?}", e);
                        continue;
                    }
                };

                let request = match DnsPacket::from_buffer(&mut req_buffer) {
                    Ok(x) => x,
                    Err(e) => {
                        log::info!("Failed to parse UDP query packet: {:?}", e);
                        continue;
                    }
                };

                self.enqueue_request(src, request);
            })?;

        Ok(())
    }

    fn enqueue_request(&self, src: std::net::SocketAddr, request: DnsPacket) {
        match self.request_queue.lock() {
            Ok(mut queue) => {
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
    fn run_server(self) -> Result<()> {
        let socket = UdpSocket::bind((self.context.config.bind_host.as_str(), self.context.config.dns_port))?;

        for thread_id in 0..self.thread_count {
            let socket_clone = match socket.try_clone() {
                Ok(x) => x,
                Err(e) => {
                    log::info!("Failed to clone socket when starting UDP server: {:?}", e);
                    continue;
                }
            };

            self.spawn_request_handler(thread_id, socket_clone)?;
        }

        self.spawn_incoming_handler(socket)?;

        Ok(())
    }
}

/// TCP DNS server
pub struct DnsTcpServer {
    context: Arc<ServerContext>,
    shutdown: Arc<ShutdownCoordinator>,
    senders: Vec<Sender<TcpStream>>,
    thread_count: usize,
    read_timeout: Duration,
}

impl DnsTcpServer {
    pub fn new(
        context: Arc<ServerContext>,
        shutdown: Arc<ShutdownCoordinator>,
        thread_count: usize,
    ) -> DnsTcpServer {
        let read_timeout = Duration::from_secs(context.config.tcp_read_timeout_secs);
        DnsTcpServer {
            context,
            shutdown,
            senders: Vec::new(),
            thread_count,
            read_timeout,
        }
    }
}

impl DnsServer for DnsTcpServer {
    fn run_server(mut self) -> Result<()> {
        let socket = TcpListener::bind((self.context.config.bind_host.as_str(), self.context.config.dns_port))?;

        for thread_id in 0..self.thread_count {
            let (tx, rx) = channel();
            self.senders.push(tx);

            let context = self.context.clone();
            let shutdown = self.shutdown.clone();
            let read_timeout = self.read_timeout;

            let name = "DnsTcpServer-request-".to_string() + &thread_id.to_string();
            let _ = Builder::new().name(name).spawn(move || loop {
                let mut stream = match rx.recv() {
                    Ok(x) => x,
                    Err(_) => continue,
                };

                let _guard = shutdown.register_connection();
                let _ = stream.set_read_timeout(Some(read_timeout));

                context
                    .statistics
                    .tcp_query_count
                    .fetch_add(1, Ordering::Release);

                let peer = return_or_report!(stream.peer_addr(), "Failed to read peer address");

                ignore_or_report!(
                    read_packet_length(&mut stream),
                    "Failed to read query packet length"
                );

                let request = {
                    let mut stream_buffer = StreamPacketBuffer::new(&mut stream);
                    return_or_report!(
                        DnsPacket::from_buffer(&mut stream_buffer),
                        "Failed to read query packet"
                    )
                };

                let mut res_buffer = VectorPacketBuffer::new();

                let mut packet = execute_query(&context, &request, peer);
                ignore_or_report!(
                    packet.write(&mut res_buffer, 0xFFFF),
                    "Failed to write packet to buffer"
                );

                let len = res_buffer.pos();
                ignore_or_report!(
                    write_packet_length(&mut stream, len),
                    "Failed to write packet size"
                );

                let data = return_or_report!(
                    res_buffer.get_range(0, len),
                    "Failed to get packet data"
                );

                ignore_or_report!(stream.write_all(data), "Failed to write response packet");
                ignore_or_report!(stream.shutdown(Shutdown::Both), "Failed to shutdown socket");
            })?;
        }

        let shutdown = self.shutdown.clone();
        let _ = Builder::new()
            .name("DnsTcpServer-incoming".into())
            .spawn(move || {
                for wrap_stream in socket.incoming() {
                    if shutdown.is_shutting_down() {
                        return;
                    }

                    let stream = match wrap_stream {
                        Ok(stream) => stream,
                        Err(err) => {
                            log::info!("Failed to accept TCP connection: {:?}", err);
                            continue;
                        }
                    };

                    let thread_no = random::<usize>() % self.thread_count;
                    match self.senders[thread_no].send(stream) {
                        Ok(_) => {}
                        Err(e) => {
                            log::info!(
                                "Failed to send TCP request for processing on thread {}: {}",
                                thread_no, e
                            );
                        }
                    }
                }
            })?;

        Ok(())
    }
}
