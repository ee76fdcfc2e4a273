use std::fmt;
use std::io;

/// Why a session could not be opened or a probe did not produce a round trip.
#[derive(Debug)]
pub enum PingError {
    HostUnresolved(String),
    SocketCreation(io::Error),
    TtlConfig(io::Error),
    TimeoutConfig(io::Error),
    Send(io::Error),
    DestinationUnreachable { code: u8 },
    TimeExceeded { code: u8 },
    UnknownReply { icmp_type: u8, code: u8 },
    TimedOut,
}

/// Field-less classification of a [`PingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    HostUnresolved,
    SocketCreation,
    TtlConfig,
    TimeoutConfig,
    Send,
    DestinationUnreachable,
    TimeExceeded,
    UnknownReply,
    TimedOut,
}

impl PingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PingError::HostUnresolved(_) => ErrorKind::HostUnresolved,
            PingError::SocketCreation(_) => ErrorKind::SocketCreation,
            PingError::TtlConfig(_) => ErrorKind::TtlConfig,
            PingError::TimeoutConfig(_) => ErrorKind::TimeoutConfig,
            PingError::Send(_) => ErrorKind::Send,
            PingError::DestinationUnreachable { .. } => ErrorKind::DestinationUnreachable,
            PingError::TimeExceeded { .. } => ErrorKind::TimeExceeded,
            PingError::UnknownReply { .. } => ErrorKind::UnknownReply,
            PingError::TimedOut => ErrorKind::TimedOut,
        }
    }
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PingError::HostUnresolved(host) => write!(f, "could not resolve host '{}'", host),
            PingError::SocketCreation(e) => write!(f, "failed to create ICMP socket: {}", e),
            PingError::TtlConfig(e) => write!(f, "failed to set TTL: {}", e),
            PingError::TimeoutConfig(e) => write!(f, "failed to set receive timeout: {}", e),
            PingError::Send(e) => write!(f, "failed to send echo request: {}", e),
            PingError::DestinationUnreachable { code } => {
                write!(f, "destination unreachable (code {})", code)
            }
            PingError::TimeExceeded { code } => write!(f, "time exceeded in transit (code {})", code),
            PingError::UnknownReply { icmp_type, code } => {
                write!(f, "unexpected ICMP reply type {} code {}", icmp_type, code)
            }
            PingError::TimedOut => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for PingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PingError::SocketCreation(e)
            | PingError::TtlConfig(e)
            | PingError::TimeoutConfig(e)
            | PingError::Send(e) => Some(e),
            _ => None,
        }
    }
}
