use std::io;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::dns;
use crate::error::PingError;
use crate::icmp::{
    ICMP_DEST_UNREACHABLE, ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST, ICMP_TIME_EXCEEDED, IcmpTransport,
    ParsedReply, REQUEST_PAYLOAD, SocketMode, decode_reply, encode_request,
};
use crate::session::{PingSession, SessionConfig};

/// Large enough for a full IPv4 header plus the echo message, so oversized
/// datagrams show their real length instead of being truncated to fit.
const RECV_BUFFER_SIZE: usize = 192;

/// Below this the kernel would round the receive timeout to "wait forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// What one probe is waiting for.
#[derive(Debug, Clone, Copy)]
struct Expected {
    identifier: u16,
    sequence: u16,
    mode: SocketMode,
    strict: bool,
}

impl Expected {
    /// Whether `reply` answers this probe and should end the receive loop.
    fn accepts(&self, reply: &ParsedReply) -> bool {
        if reply.sequence != self.sequence {
            return false;
        }
        if self.mode.checks_identifier() && reply.identifier != self.identifier {
            return false;
        }
        // A raw socket also sees its own requests on loopback.
        if reply.icmp_type == ICMP_ECHO_REQUEST {
            return false;
        }
        if self.strict {
            if !reply.checksum_valid {
                return false;
            }
            if reply.icmp_type == ICMP_ECHO_REPLY && !reply.payload_intact {
                return false;
            }
        }
        true
    }
}

impl<T: IcmpTransport> PingSession<T> {
    /// Sends one echo request to `target` and waits for its answer.
    ///
    /// Unrelated and malformed datagrams are skipped. The whole wait,
    /// skipped traffic included, is bounded by the session's timeout.
    /// On success the round trip is measured from just before the send to
    /// the arrival of the matching reply.
    ///
    /// Only messages of exactly the echo size with this probe's id/seq in
    /// their own header are matched. Router-generated Destination
    /// Unreachable and Time Exceeded messages quote the request instead and
    /// are shorter, so they are skipped and such a probe ends in
    /// [`PingError::TimedOut`].
    pub fn probe(&mut self, target: Ipv4Addr) -> Result<Duration, PingError> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(PingError::Send(io::Error::new(
                io::ErrorKind::NotConnected,
                "ping session is closed",
            )));
        };

        let sequence = self.next_sequence;
        self.next_sequence = sequence.wrapping_add(1);

        let expected = Expected {
            identifier: self.config.identifier,
            sequence,
            mode: socket.mode(),
            strict: self.config.strict,
        };
        let budget = self.config.timeout();
        let request = encode_request(expected.identifier, sequence, &REQUEST_PAYLOAD);

        let start = Instant::now();
        match socket.send_to(&request, target) {
            Ok(0) => {
                return Err(PingError::Send(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "no bytes were sent",
                )));
            }
            Ok(n) => log::debug!("Sent {} bytes to {} (id={}, seq={})", n, target, expected.identifier, sequence),
            Err(e) => return Err(PingError::Send(e)),
        }

        let mut narrowed = false;
        let outcome = receive_reply(socket, &expected, start, budget, &mut narrowed);

        if narrowed {
            if let Err(e) = socket.set_read_timeout(budget) {
                log::debug!("Could not restore receive timeout: {}", e);
            }
        }
        outcome
    }
}

fn receive_reply<T: IcmpTransport>(
    socket: &T,
    expected: &Expected,
    start: Instant,
    budget: Option<Duration>,
    narrowed: &mut bool,
) -> Result<Duration, PingError> {
    // A timeout too large to add to `start` is as good as none.
    let deadline = budget.and_then(|budget| start.checked_add(budget));
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut first_read = true;

    loop {
        // Later reads only get what is left of the original window.
        if !first_read {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining < MIN_READ_TIMEOUT {
                    log::debug!("Receive window for seq={} used up", expected.sequence);
                    return Err(PingError::TimedOut);
                }
                if socket.set_read_timeout(Some(remaining)).is_err() {
                    return Err(PingError::TimedOut);
                }
                *narrowed = true;
            }
        }
        first_read = false;

        let len = match socket.recv(&mut buf) {
            Ok(0) => {
                log::debug!("Socket returned end of stream");
                return Err(PingError::TimedOut);
            }
            Ok(len) => len,
            Err(e) => {
                match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                        log::debug!("No reply for seq={} before timeout", expected.sequence)
                    }
                    _ => log::debug!("Receive failed: {}", e),
                }
                return Err(PingError::TimedOut);
            }
        };
        let arrival = Instant::now();

        let reply = match decode_reply(&buf[..len], expected.mode.includes_ip_header()) {
            Ok(reply) => reply,
            Err(e) => {
                log::trace!("Discarding {} byte datagram: {}", len, e);
                continue;
            }
        };

        if !expected.accepts(&reply) {
            log::trace!(
                "Discarding ICMP type {} (id={}, seq={})",
                reply.icmp_type,
                reply.identifier,
                reply.sequence
            );
            continue;
        }

        return classify(&reply, arrival.duration_since(start));
    }
}

fn classify(reply: &ParsedReply, elapsed: Duration) -> Result<Duration, PingError> {
    match reply.icmp_type {
        ICMP_ECHO_REPLY => Ok(elapsed),
        ICMP_DEST_UNREACHABLE => Err(PingError::DestinationUnreachable { code: reply.code }),
        ICMP_TIME_EXCEEDED => Err(PingError::TimeExceeded { code: reply.code }),
        other => Err(PingError::UnknownReply {
            icmp_type: other,
            code: reply.code,
        }),
    }
}

/// Resolves `host`, then opens a session, probes once and closes it.
pub fn ping(host: &str, config: &SessionConfig) -> Result<Duration, PingError> {
    let target = dns::resolve_ipv4(host)?;
    let mut session = PingSession::open(config.clone())?;
    let outcome = session.probe(target);
    session.close();
    outcome
}

/// [`ping`] run on the tokio blocking pool.
pub async fn ping_async(host: &str, config: SessionConfig) -> Result<Duration, PingError> {
    let target = dns::resolve_ipv4_async(host).await?;
    let joined = tokio::task::spawn_blocking(move || {
        let mut session = PingSession::open(config)?;
        session.probe(target)
    })
    .await;

    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        // Runtime shutting down: no reply was observed.
        Err(_) => Err(PingError::TimedOut),
    }
}
