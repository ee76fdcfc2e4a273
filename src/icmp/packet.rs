use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::fmt;
use std::io::Cursor;

use crate::icmp::checksum::checksum;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_TIME_EXCEEDED: u8 = 11;

/// Size of every echo datagram this crate sends or accepts.
pub const PACKET_SIZE: usize = 64;
pub const HEADER_SIZE: usize = 8;
pub const PAYLOAD_SIZE: usize = PACKET_SIZE - HEADER_SIZE;

const MIN_IPV4_HEADER_SIZE: usize = 20;

/// ASCII `'0'`, `'1'`, ... counting upward, with a terminating zero byte.
pub const REQUEST_PAYLOAD: [u8; PAYLOAD_SIZE] = request_payload();

const fn request_payload() -> [u8; PAYLOAD_SIZE] {
    let mut payload = [0u8; PAYLOAD_SIZE];
    let mut i = 0;
    while i < PAYLOAD_SIZE - 1 {
        payload[i] = b'0' + i as u8;
        i += 1;
    }
    payload
}

/// An ICMP echo message as laid out on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoPacket {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: [u8; PAYLOAD_SIZE],
}

impl EchoPacket {
    pub fn new_echo_request(identifier: u16, sequence: u16, payload: &[u8; PAYLOAD_SIZE]) -> Self {
        let mut packet = Self {
            icmp_type: ICMP_ECHO_REQUEST,
            code: 0,
            checksum: 0,
            identifier,
            sequence,
            payload: *payload,
        };

        packet.calculate_checksum();
        packet
    }

    pub fn to_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = self.icmp_type;
        bytes[1] = self.code;
        BigEndian::write_u16(&mut bytes[2..4], self.checksum);
        BigEndian::write_u16(&mut bytes[4..6], self.identifier);
        BigEndian::write_u16(&mut bytes[6..8], self.sequence);
        bytes[HEADER_SIZE..].copy_from_slice(&self.payload);
        bytes
    }

    pub fn calculate_checksum(&mut self) {
        self.checksum = 0;
        self.checksum = checksum(&self.to_bytes());
    }

    pub fn verify_checksum(&self) -> bool {
        checksum(&self.to_bytes()) == 0
    }
}

/// Builds the wire form of an echo request, checksum filled in last.
pub fn encode_request(identifier: u16, sequence: u16, payload: &[u8; PAYLOAD_SIZE]) -> [u8; PACKET_SIZE] {
    EchoPacket::new_echo_request(identifier, sequence, payload).to_bytes()
}

/// Header fields of a received ICMP message of the expected size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReply {
    pub icmp_type: u8,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    /// The message sums to zero under the Internet checksum.
    pub checksum_valid: bool,
    /// The payload is byte-for-byte the request pattern.
    pub payload_intact: bool,
}

/// A received datagram that cannot be one of our echo messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPacket {
    Empty,
    BadIpHeader { header_len: usize, received: usize },
    TooShort { len: usize },
    WrongSize { len: usize },
}

impl fmt::Display for MalformedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPacket::Empty => write!(f, "empty datagram"),
            MalformedPacket::BadIpHeader { header_len, received } => write!(
                f,
                "IP header length {} invalid for {} received bytes",
                header_len, received
            ),
            MalformedPacket::TooShort { len } => {
                write!(f, "ICMP message too short: {} bytes", len)
            }
            MalformedPacket::WrongSize { len } => write!(
                f,
                "ICMP message is {} bytes, expected {}",
                len, PACKET_SIZE
            ),
        }
    }
}

impl std::error::Error for MalformedPacket {}

/// Decodes a received datagram.
///
/// When `includes_ip_header` is set (raw sockets) the IPv4 header is skipped
/// using its IHL field. The remaining ICMP message must be exactly
/// [`PACKET_SIZE`] bytes. The checksum is reported, not enforced.
pub fn decode_reply(raw: &[u8], includes_ip_header: bool) -> Result<ParsedReply, MalformedPacket> {
    let icmp = if includes_ip_header {
        let first = *raw.first().ok_or(MalformedPacket::Empty)?;
        let header_len = usize::from(first & 0x0F) * 4;
        if header_len < MIN_IPV4_HEADER_SIZE || header_len > raw.len() {
            return Err(MalformedPacket::BadIpHeader {
                header_len,
                received: raw.len(),
            });
        }
        &raw[header_len..]
    } else {
        raw
    };

    if icmp.len() < HEADER_SIZE {
        return Err(MalformedPacket::TooShort { len: icmp.len() });
    }
    if icmp.len() != PACKET_SIZE {
        return Err(MalformedPacket::WrongSize { len: icmp.len() });
    }

    let (icmp_type, code, identifier, sequence) = read_header(&mut Cursor::new(icmp))
        .map_err(|_| MalformedPacket::TooShort { len: icmp.len() })?;

    Ok(ParsedReply {
        icmp_type,
        code,
        identifier,
        sequence,
        checksum_valid: checksum(icmp) == 0,
        payload_intact: icmp[HEADER_SIZE..] == REQUEST_PAYLOAD[..],
    })
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> std::io::Result<(u8, u8, u16, u16)> {
    let icmp_type = cursor.read_u8()?;
    let code = cursor.read_u8()?;
    let _checksum = cursor.read_u16::<BigEndian>()?;
    let identifier = cursor.read_u16::<BigEndian>()?;
    let sequence = cursor.read_u16::<BigEndian>()?;
    Ok((icmp_type, code, identifier, sequence))
}
