use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// How the kernel hands ICMP traffic to a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketMode {
    /// `SOCK_RAW`: every inbound ICMP datagram, IP header included.
    Raw,
    /// `SOCK_DGRAM` ping socket: IP header stripped, the kernel owns the
    /// echo identifier and only delivers replies addressed to this socket.
    Datagram,
}

impl SocketMode {
    pub fn includes_ip_header(self) -> bool {
        matches!(self, SocketMode::Raw)
    }

    /// Whether reply matching has to compare the echo identifier itself.
    pub fn checks_identifier(self) -> bool {
        matches!(self, SocketMode::Raw)
    }
}

/// The socket operations a ping session needs.
///
/// Closing is dropping the value.
pub trait IcmpTransport {
    fn mode(&self) -> SocketMode;

    fn set_ttl(&self, ttl: u32) -> io::Result<()>;

    /// `None` blocks indefinitely.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    fn send_to(&self, buf: &[u8], target: Ipv4Addr) -> io::Result<usize>;

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

pub struct IcmpSocket {
    socket: Socket,
    mode: SocketMode,
}

impl IcmpSocket {
    /// Opens a raw ICMP socket, falling back to an unprivileged ping socket
    /// when raw access is refused.
    pub fn open() -> io::Result<Self> {
        match Self::with_mode(SocketMode::Raw) {
            Ok(socket) => Ok(socket),
            Err(raw_err) => {
                log::debug!("Raw ICMP socket unavailable ({}), trying datagram socket", raw_err);
                Self::with_mode(SocketMode::Datagram).map_err(|dgram_err| {
                    io::Error::new(
                        dgram_err.kind(),
                        format!(
                            "raw socket: {}; datagram socket: {}. CAP_NET_RAW or \
                             net.ipv4.ping_group_range may be required",
                            raw_err, dgram_err
                        ),
                    )
                })
            }
        }
    }

    pub fn with_mode(mode: SocketMode) -> io::Result<Self> {
        let ty = match mode {
            SocketMode::Raw => Type::RAW,
            SocketMode::Datagram => Type::DGRAM,
        };
        let socket = Socket::new(Domain::IPV4, ty, Some(Protocol::ICMPV4))?;
        socket.set_nonblocking(false)?;
        log::debug!("Opened {:?} ICMP socket", mode);

        Ok(Self { socket, mode })
    }
}

impl IcmpTransport for IcmpSocket {
    fn mode(&self) -> SocketMode {
        self.mode
    }

    fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        self.socket.set_ttl(ttl)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    fn send_to(&self, buf: &[u8], target: Ipv4Addr) -> io::Result<usize> {
        let addr = SockAddr::from(SocketAddrV4::new(target, 0));
        self.socket.send_to(buf, &addr)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.socket).read(buf)
    }
}

impl std::fmt::Debug for IcmpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpSocket").field("mode", &self.mode).finish()
    }
}
