//! One ICMP echo exchange against an IPv4 host.
//!
//! Open a [`PingSession`] once and call [`PingSession::probe`] as often as
//! needed, or use [`ping`] to resolve, open, probe and close in one call.
//! Each probe either yields the round-trip time or a classified
//! [`PingError`].
//!
//! Opening tries a raw ICMP socket first and falls back to an unprivileged
//! datagram ping socket, which on Linux requires the caller's group to be in
//! `net.ipv4.ping_group_range`.

pub mod dns;
pub mod error;
pub mod exchange;
pub mod icmp;
pub mod session;

pub use error::{ErrorKind, PingError};
pub use exchange::{ping, ping_async};
pub use session::{DEFAULT_TIMEOUT_SECS, DEFAULT_TTL, PingSession, SessionConfig};
