//! # Connection
//!
//! One established socket behind one surface: connection-oriented streams
//! (TCP, TLS) and datagram sockets (UDP) are the two concrete shapes, and
//! every read/write is bounded by a deadline and fails with a classified
//! [`ConnError`].
//!
//! A datagram socket serves many logical peers off one local address, so
//! its remote address is only known after a receive; the receive path
//! records the sender so `remote_addr` always reflects the latest peer.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_rustls::TlsStream;
use tracing::debug;

use crate::error::ConnError;
use crate::packet::Packet;

pub const READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// IPv4 max size minus the IPv4 and UDP headers, the largest payload one
/// datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65535 - 20 - 8;

type Reader = Box<dyn AsyncRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

enum SocketKind {
    Stream {
        reader: Mutex<Reader>,
        writer: Mutex<Writer>,
    },
    Datagram(UdpSocket),
}

/// One established socket. Streamed or not is fixed at construction by
/// which constructor ran; the remote address is the only field mutated
/// afterwards, and only on the datagram receive path.
pub struct Connection {
    kind: SocketKind,
    laddr: SocketAddr,
    raddr: RwLock<Option<SocketAddr>>,
    net: &'static str,
    closed: AtomicBool,
}

impl Connection {
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        let laddr = stream.local_addr()?;
        let raddr = stream.peer_addr()?;
        let (reader, writer) = tokio::io::split(stream);
        Ok(Self {
            kind: SocketKind::Stream {
                reader: Mutex::new(Box::new(reader)),
                writer: Mutex::new(Box::new(writer)),
            },
            laddr,
            raddr: RwLock::new(Some(raddr)),
            net: "tcp",
            closed: AtomicBool::new(false),
        })
    }

    pub fn from_tls(stream: TlsStream<TcpStream>) -> io::Result<Self> {
        let laddr = stream.get_ref().0.local_addr()?;
        let raddr = stream.get_ref().0.peer_addr()?;
        let (reader, writer) = tokio::io::split(stream);
        Ok(Self {
            kind: SocketKind::Stream {
                reader: Mutex::new(Box::new(reader)),
                writer: Mutex::new(Box::new(writer)),
            },
            laddr,
            raddr: RwLock::new(Some(raddr)),
            net: "tcp",
            closed: AtomicBool::new(false),
        })
    }

    /// Wrap a datagram socket. `peer` pre-sets the remote address for
    /// dialed sockets; for listening sockets it stays unknown until the
    /// first receive.
    pub fn from_udp(socket: UdpSocket, peer: Option<SocketAddr>) -> io::Result<Self> {
        let laddr = socket.local_addr()?;
        Ok(Self {
            kind: SocketKind::Datagram(socket),
            laddr,
            raddr: RwLock::new(peer),
            net: "udp",
            closed: AtomicBool::new(false),
        })
    }

    /// Read into `buf`, bounded by [`READ_TIMEOUT`]. On a datagram socket
    /// the sender becomes the new remote address before this returns. A
    /// stream read of `Ok(0)` is end-of-stream. Fails classified once the
    /// connection has been closed.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, ConnError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.wrap_io("read", closed_conn()));
        }
        let num = match timeout(READ_TIMEOUT, self.read_inner(buf)).await {
            Ok(Ok(num)) => num,
            Ok(Err(cause)) => return Err(self.wrap_io("read", cause)),
            Err(_) => return Err(self.wrap_io("read", deadline_elapsed("read"))),
        };
        debug!("{} received {} bytes", self, num);
        Ok(num)
    }

    async fn read_inner(&self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.kind {
            SocketKind::Stream { reader, .. } => reader.lock().await.read(buf).await,
            SocketKind::Datagram(socket) => {
                let (num, raddr) = socket.recv_from(buf).await?;
                *self.raddr.write() = Some(raddr);
                Ok(num)
            }
        }
    }

    /// Write the whole of `buf`, bounded by [`WRITE_TIMEOUT`]. A datagram
    /// write goes to the current remote address and fails when no peer is
    /// known yet. Fails classified once the connection has been closed.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, ConnError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.wrap_io("write", closed_conn()));
        }
        let num = match timeout(WRITE_TIMEOUT, self.write_inner(buf)).await {
            Ok(Ok(num)) => num,
            Ok(Err(cause)) => return Err(self.wrap_io("write", cause)),
            Err(_) => return Err(self.wrap_io("write", deadline_elapsed("write"))),
        };
        debug!("{} written {} bytes", self, num);
        Ok(num)
    }

    async fn write_inner(&self, buf: &[u8]) -> io::Result<usize> {
        match &self.kind {
            SocketKind::Stream { writer, .. } => {
                let mut writer = writer.lock().await;
                writer.write_all(buf).await?;
                writer.flush().await?;
                Ok(buf.len())
            }
            SocketKind::Datagram(socket) => {
                let raddr = (*self.raddr.read()).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotConnected,
                        "datagram connection has no known peer",
                    )
                })?;
                socket.send_to(buf, raddr).await
            }
        }
    }

    /// Shut the connection down. The first call does the work and surfaces
    /// any failure once; later calls are quiet no-ops. All subsequent
    /// reads and writes fail classified.
    pub async fn close(&self) -> Result<(), ConnError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let SocketKind::Stream { writer, .. } = &self.kind {
            if let Err(cause) = writer.lock().await.shutdown().await {
                return Err(ConnError {
                    op: "close",
                    net: self.network(),
                    src: String::new(),
                    dest: String::new(),
                    conn: self.to_string(),
                    cause,
                });
            }
        }
        debug!("{} closed", self);
        Ok(())
    }

    /// Read one datagram-sized buffer and stamp it with this connection's
    /// endpoints for the protocol layer above.
    pub async fn read_packet(&self) -> Result<Packet, ConnError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let num = self.read(&mut buf).await?;
        buf.truncate(num);
        let mut packet = Packet::new(&self.network(), buf);
        packet.src = self
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        packet.dest = self.laddr.to_string();
        Ok(packet)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.laddr
    }

    /// The current peer. Fixed for streams; for datagram sockets this is
    /// the sender of the most recent receive, read under the lock the
    /// receive path writes through.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        *self.raddr.read()
    }

    /// Uppercase transport name of the local address family.
    pub fn network(&self) -> String {
        self.net.to_uppercase()
    }

    /// True for connection-oriented transports, false for datagram.
    pub fn streamed(&self) -> bool {
        matches!(self.kind, SocketKind::Stream { .. })
    }

    fn wrap_io(&self, op: &'static str, cause: io::Error) -> ConnError {
        let raddr = self
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let (src, dest) = match op {
            "read" => (raddr, self.laddr.to_string()),
            _ => (self.laddr.to_string(), raddr),
        };
        ConnError {
            op,
            net: self.network(),
            src,
            dest,
            conn: self.to_string(),
            cause,
        }
    }
}

fn deadline_elapsed(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("{} deadline elapsed", op))
}

fn closed_conn() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection closed")
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raddr = self
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "connection {:p} (net {}, laddr {}, raddr {})",
            self,
            self.network(),
            self.laddr,
            raddr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    async fn tcp_pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, (server, _)) =
            tokio::join!(TcpStream::connect(addr), async {
                listener.accept().await.unwrap()
            });
        (
            Connection::from_tcp(client.unwrap()).unwrap(),
            Connection::from_tcp(server).unwrap(),
        )
    }

    #[tokio::test]
    async fn tcp_round_trip() {
        let (client, server) = tcp_pair().await;
        assert!(client.streamed());
        assert_eq!(client.network(), "TCP");
        assert_eq!(client.remote_addr(), Some(server.local_addr()));

        let num = client.write(b"INVITE sip:bob SIP/2.0\r\n").await.unwrap();
        assert_eq!(num, 24);

        let mut buf = [0u8; 64];
        let num = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..num], b"INVITE sip:bob SIP/2.0\r\n");
    }

    #[tokio::test]
    async fn tcp_read_after_peer_close_is_end_of_stream() {
        let (client, server) = tcp_pair().await;
        client.close().await.unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(server.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn close_twice_is_quiet() {
        let (client, _server) = tcp_pair().await;
        client.close().await.unwrap();
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn io_after_close_fails_classified() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let conn = Connection::from_udp(socket, None).unwrap();
        conn.close().await.unwrap();

        let err = conn.write(b"late").await.unwrap_err();
        assert_eq!(err.op, "write");
        assert!(!err.timeout());
        assert!(!err.eof());

        let mut buf = [0u8; 8];
        let err = conn.read(&mut buf).await.unwrap_err();
        assert_eq!(err.op, "read");

        let (client, _server) = tcp_pair().await;
        client.close().await.unwrap();
        assert!(client.write(b"late").await.is_err());
        assert!(client.read(&mut buf).await.is_err());
    }

    #[tokio::test]
    async fn datagram_remote_addr_tracks_latest_sender() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let conn = Connection::from_udp(server, None).unwrap();
        assert!(!conn.streamed());
        assert_eq!(conn.network(), "UDP");
        assert_eq!(conn.remote_addr(), None);

        let peer_p = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_q = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut buf = [0u8; 64];

        peer_p.send_to(b"from p", server_addr).await.unwrap();
        conn.read(&mut buf).await.unwrap();
        assert_eq!(conn.remote_addr(), Some(peer_p.local_addr().unwrap()));

        peer_q.send_to(b"from q", server_addr).await.unwrap();
        conn.read(&mut buf).await.unwrap();
        assert_eq!(conn.remote_addr(), Some(peer_q.local_addr().unwrap()));
    }

    #[tokio::test]
    async fn datagram_write_replies_to_latest_sender() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let conn = Connection::from_udp(server, None).unwrap();

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(b"ping", server_addr).await.unwrap();

        let mut buf = [0u8; 16];
        conn.read(&mut buf).await.unwrap();
        conn.write(b"pong").await.unwrap();

        let num = peer.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..num], b"pong");
    }

    #[tokio::test]
    async fn datagram_write_without_peer_fails_classified() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let conn = Connection::from_udp(socket, None).unwrap();

        let err = conn.write(b"lost").await.unwrap_err();
        assert_eq!(err.op, "write");
        assert!(!err.eof());
        assert!(!err.timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn read_deadline_classifies_as_timeout() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let conn = Connection::from_udp(socket, None).unwrap();

        let mut buf = [0u8; 16];
        let err = conn.read(&mut buf).await.unwrap_err();
        assert_eq!(err.op, "read");
        assert!(err.timeout());
        assert!(err.temporary());
        assert!(!err.eof());
    }

    #[tokio::test]
    async fn read_packet_stamps_endpoints() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let conn = Connection::from_udp(server, None).unwrap();

        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peer.send_to(b"REGISTER", server_addr).await.unwrap();

        let packet = conn.read_packet().await.unwrap();
        assert_eq!(packet.data, b"REGISTER");
        assert_eq!(packet.net, "UDP");
        assert_eq!(packet.src, peer.local_addr().unwrap().to_string());
        assert_eq!(packet.dest, server_addr.to_string());
    }
}
