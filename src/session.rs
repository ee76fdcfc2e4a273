use std::time::Duration;

use crate::error::PingError;
use crate::icmp::{IcmpSocket, IcmpTransport, SocketMode};

/// IP maximum, so a probe is never dropped for hop count before the path ends.
pub const DEFAULT_TTL: u8 = 255;
pub const DEFAULT_TIMEOUT_SECS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub ttl: u8,
    /// Whole seconds; 0 leaves the socket without a receive timeout.
    pub timeout_secs: u64,
    /// Echo identifier written into requests. Datagram sockets replace it
    /// with their own and do not compare it on receive.
    pub identifier: u16,
    /// Discard replies with a bad checksum or an altered echo payload.
    pub strict: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            identifier: std::process::id() as u16,
            strict: false,
        }
    }
}

impl SessionConfig {
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_identifier(mut self, identifier: u16) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// One configured ICMP endpoint issuing sequential probes.
///
/// The session owns its socket exclusively; dropping the session closes it.
/// Concurrent pingers each need their own session.
#[derive(Debug)]
pub struct PingSession<T: IcmpTransport = IcmpSocket> {
    pub(crate) socket: Option<T>,
    pub(crate) config: SessionConfig,
    pub(crate) next_sequence: u16,
}

impl PingSession<IcmpSocket> {
    /// Opens an ICMP socket (raw, else datagram) and applies `config`.
    pub fn open(config: SessionConfig) -> Result<Self, PingError> {
        let socket = IcmpSocket::open().map_err(PingError::SocketCreation)?;
        Self::with_transport(socket, config)
    }

    /// Closes the current socket, then opens and configures a new one.
    /// The sequence counter carries over.
    pub fn reopen(&mut self, config: SessionConfig) -> Result<(), PingError> {
        self.close();
        let socket = IcmpSocket::open().map_err(PingError::SocketCreation)?;
        self.install(socket, config)
    }
}

impl<T: IcmpTransport> PingSession<T> {
    pub fn with_transport(transport: T, config: SessionConfig) -> Result<Self, PingError> {
        let mut session = Self {
            socket: None,
            config: config.clone(),
            next_sequence: 1,
        };
        session.install(transport, config)?;
        Ok(session)
    }

    /// [`PingSession::reopen`] over a caller-supplied transport.
    pub fn reopen_with(&mut self, transport: T, config: SessionConfig) -> Result<(), PingError> {
        self.close();
        self.install(transport, config)
    }

    // On error the transport is dropped here, releasing the socket.
    fn install(&mut self, transport: T, config: SessionConfig) -> Result<(), PingError> {
        transport
            .set_ttl(u32::from(config.ttl))
            .map_err(PingError::TtlConfig)?;
        transport
            .set_read_timeout(config.timeout())
            .map_err(PingError::TimeoutConfig)?;

        log::debug!(
            "Session ready: {:?} socket, ttl={}, timeout={}s",
            transport.mode(),
            config.ttl,
            config.timeout_secs
        );
        self.socket = Some(transport);
        self.config = config;
        Ok(())
    }

    /// Releases the socket. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            log::debug!("Session socket closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn mode(&self) -> Option<SocketMode> {
        self.socket.as_ref().map(|socket| socket.mode())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sequence number the next probe will carry.
    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }
}
