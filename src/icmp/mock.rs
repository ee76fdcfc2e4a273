// Scripted in-memory transport for exercising sessions without privileges.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder};

use crate::icmp::checksum::checksum;
use crate::icmp::packet::{ICMP_ECHO_REPLY, PACKET_SIZE};
use crate::icmp::socket::{IcmpTransport, SocketMode};

/// One datagram (or non-datagram event) the fake peer delivers.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Delivered verbatim.
    Bytes(Vec<u8>),
    /// The last request echoed back with its type flipped to Echo Reply.
    EchoReply,
    /// The last request echoed back with a rewritten header.
    Rewrite {
        icmp_type: u8,
        code: u8,
        identifier: Option<u16>,
        sequence: Option<u16>,
    },
    /// Arrives after a delay; a shorter read timeout wins.
    Delayed(Duration, Box<Incoming>),
    /// End of stream.
    Closed,
    /// A receive error that is not a timeout.
    Error(io::ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendBehavior {
    Deliver,
    Zero,
    Fail,
}

#[derive(Debug)]
pub struct MockState {
    pub script: RefCell<VecDeque<Incoming>>,
    pub sent: RefCell<Vec<(Vec<u8>, Ipv4Addr)>>,
    pub ttl: Cell<Option<u32>>,
    pub read_timeouts: RefCell<Vec<Option<Duration>>>,
    pub reject_ttl: Cell<bool>,
    pub reject_timeout: Cell<bool>,
    pub send: Cell<SendBehavior>,
    pub closed: Cell<bool>,
}

impl MockState {
    pub fn current_timeout(&self) -> Option<Duration> {
        self.read_timeouts.borrow().last().copied().flatten()
    }

    pub fn sent_sequences(&self) -> Vec<u16> {
        self.sent
            .borrow()
            .iter()
            .map(|(bytes, _)| BigEndian::read_u16(&bytes[6..8]))
            .collect()
    }
}

#[derive(Debug)]
pub struct MockTransport {
    mode: SocketMode,
    state: Rc<MockState>,
}

impl MockTransport {
    pub fn new(mode: SocketMode) -> Self {
        Self {
            mode,
            state: Rc::new(MockState {
                script: RefCell::new(VecDeque::new()),
                sent: RefCell::new(Vec::new()),
                ttl: Cell::new(None),
                read_timeouts: RefCell::new(Vec::new()),
                reject_ttl: Cell::new(false),
                reject_timeout: Cell::new(false),
                send: Cell::new(SendBehavior::Deliver),
                closed: Cell::new(false),
            }),
        }
    }

    pub fn state(&self) -> Rc<MockState> {
        Rc::clone(&self.state)
    }

    pub fn push(&self, incoming: Incoming) -> &Self {
        self.state.script.borrow_mut().push_back(incoming);
        self
    }

    fn last_request(&self) -> Vec<u8> {
        self.state
            .sent
            .borrow()
            .last()
            .map(|(bytes, _)| bytes.clone())
            .unwrap_or_else(|| vec![0u8; PACKET_SIZE])
    }

    fn render(&self, incoming: Incoming) -> io::Result<Vec<u8>> {
        let icmp = match incoming {
            Incoming::Bytes(bytes) => return Ok(bytes),
            Incoming::EchoReply => self.rewrite(ICMP_ECHO_REPLY, 0, None, None),
            Incoming::Rewrite {
                icmp_type,
                code,
                identifier,
                sequence,
            } => self.rewrite(icmp_type, code, identifier, sequence),
            Incoming::Closed => return Ok(Vec::new()),
            Incoming::Error(kind) => return Err(io::Error::from(kind)),
            Incoming::Delayed(..) => unreachable!("delays are resolved before rendering"),
        };
        Ok(self.frame(icmp))
    }

    fn rewrite(&self, icmp_type: u8, code: u8, identifier: Option<u16>, sequence: Option<u16>) -> Vec<u8> {
        let mut icmp = self.last_request();
        icmp[0] = icmp_type;
        icmp[1] = code;
        if let Some(identifier) = identifier {
            BigEndian::write_u16(&mut icmp[4..6], identifier);
        }
        if let Some(sequence) = sequence {
            BigEndian::write_u16(&mut icmp[6..8], sequence);
        }
        icmp[2] = 0;
        icmp[3] = 0;
        let sum = checksum(&icmp);
        BigEndian::write_u16(&mut icmp[2..4], sum);
        icmp
    }

    /// Prefixes an IPv4 header when the socket would deliver one.
    pub fn frame(&self, icmp: Vec<u8>) -> Vec<u8> {
        if !self.mode.includes_ip_header() {
            return icmp;
        }
        let mut datagram = vec![0u8; 20];
        datagram[0] = 0x45;
        datagram[8] = 64;
        datagram[9] = 1;
        datagram.extend_from_slice(&icmp);
        datagram
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.state.closed.set(true);
    }
}

impl IcmpTransport for MockTransport {
    fn mode(&self) -> SocketMode {
        self.mode
    }

    fn set_ttl(&self, ttl: u32) -> io::Result<()> {
        if self.state.reject_ttl.get() {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        self.state.ttl.set(Some(ttl));
        Ok(())
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        if self.state.reject_timeout.get() {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        self.state.read_timeouts.borrow_mut().push(timeout);
        Ok(())
    }

    fn send_to(&self, buf: &[u8], target: Ipv4Addr) -> io::Result<usize> {
        match self.state.send.get() {
            SendBehavior::Deliver => {
                self.state.sent.borrow_mut().push((buf.to_vec(), target));
                Ok(buf.len())
            }
            SendBehavior::Zero => Ok(0),
            SendBehavior::Fail => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
        }
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = self.state.current_timeout();
        let mut next = self.state.script.borrow_mut().pop_front();

        while let Some(Incoming::Delayed(delay, inner)) = next {
            if let Some(timeout) = timeout {
                if delay > timeout {
                    // The datagram stays queued; the read gives up first.
                    thread::sleep(timeout);
                    self.state
                        .script
                        .borrow_mut()
                        .push_front(Incoming::Delayed(delay - timeout, inner));
                    return Err(io::Error::from(io::ErrorKind::WouldBlock));
                }
            }
            thread::sleep(delay);
            next = Some(*inner);
        }

        match next {
            Some(incoming) => {
                let datagram = self.render(incoming)?;
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(len)
            }
            None => {
                thread::sleep(timeout.unwrap_or(Duration::ZERO));
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
    }
}
