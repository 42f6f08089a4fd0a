use crate::*;
use std::convert::TryFrom;

/// Type, code, checksum and the 4 byte rest-of-header word.
pub const ICMP_HEADER_LEN: usize = 8;

/// Bytes of the offending datagram quoted in an ICMP error: its 20 byte IP header and the
/// first 8 bytes of its payload.
pub const ICMP_DATA_SIZE: usize = 28;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DEST_UNREACHABLE: u8 = 3;
pub const ICMP_SOURCE_QUENCH: u8 = 4;
pub const ICMP_REDIRECT: u8 = 5;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_TIME_EXCEEDED: u8 = 11;
pub const ICMP_PARAMETER_PROBLEM: u8 = 12;

/// Whether messages of this type report an error about another datagram.
pub fn is_icmp_error_type(msg_type: u8) -> bool {
    match msg_type {
        ICMP_DEST_UNREACHABLE
        | ICMP_SOURCE_QUENCH
        | ICMP_REDIRECT
        | ICMP_TIME_EXCEEDED
        | ICMP_PARAMETER_PROBLEM => true,
        _ => false,
    }
}

/// Ipv4Packet wrapper with getters/setters for the ICMP message it carries (RFC 792).
/// The message spans from the end of the IP header to the IP total length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IcmpPacket {
    packet: Ipv4Packet,
}

impl Packet for IcmpPacket {}

impl IcmpPacket {
    /// Replaces the payload of `packet` with `message`, marking the protocol as ICMP and
    /// fixing up the total length. Neither checksum is touched.
    pub fn encap(mut packet: Ipv4Packet, message: &[u8]) -> Result<IcmpPacket, &'static str> {
        if message.len() < ICMP_HEADER_LEN {
            return Err("ICMP message is shorter than its header");
        }
        packet.set_protocol(IpProtocol::ICMP);
        packet.set_payload(message);
        Ok(IcmpPacket { packet })
    }

    pub fn msg_type(&self) -> u8 {
        self.message()[0]
    }

    pub fn set_msg_type(&mut self, msg_type: u8) {
        self.message_mut()[0] = msg_type;
    }

    pub fn msg_code(&self) -> u8 {
        self.message()[1]
    }

    pub fn set_msg_code(&mut self, code: u8) {
        self.message_mut()[1] = code;
    }

    pub fn checksum(&self) -> u16 {
        let message = self.message();
        u16::from_be_bytes([message[2], message[3]])
    }

    /// The type specific word following the checksum: identifier and sequence number for
    /// echo messages, unused for the errors this router sends.
    pub fn rest_of_header(&self) -> &[u8] {
        &self.message()[4..ICMP_HEADER_LEN]
    }

    pub fn set_rest_of_header(&mut self, rest: [u8; 4]) {
        self.message_mut()[4..ICMP_HEADER_LEN].copy_from_slice(&rest);
    }

    pub fn data(&self) -> &[u8] {
        &self.message()[ICMP_HEADER_LEN..]
    }

    /// The whole ICMP message, header included.
    pub fn message(&self) -> &[u8] {
        let start = self.packet.payload_offset;
        let end = start + self.message_len();
        &self.packet.data[start..end]
    }

    pub fn validate_checksum(&self) -> bool {
        internet_checksum(self.message()) == 0
    }

    /// Computes the checksum over the whole message and stores it.
    pub fn set_checksum(&mut self) {
        {
            let message = self.message_mut();
            message[2] = 0;
            message[3] = 0;
        }
        let checksum = internet_checksum(self.message());
        self.message_mut()[2..4].copy_from_slice(&checksum.to_be_bytes());
    }

    pub fn ipv4(&self) -> &Ipv4Packet {
        &self.packet
    }

    pub fn ipv4_mut(&mut self) -> &mut Ipv4Packet {
        &mut self.packet
    }

    // Move ownership of the packet back to the caller
    pub fn packet(self) -> Ipv4Packet {
        self.packet
    }

    fn message_len(&self) -> usize {
        self.packet.payload().len()
    }

    fn message_mut(&mut self) -> &mut [u8] {
        let start = self.packet.payload_offset;
        let end = start + self.message_len();
        &mut self.packet.data[start..end]
    }
}

impl TryFrom<Ipv4Packet> for IcmpPacket {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        if packet.protocol() != IpProtocol::ICMP {
            return Err("Packet does not carry ICMP");
        }
        if packet.payload().len() < ICMP_HEADER_LEN {
            return Err("ICMP message is shorter than its header");
        }
        Ok(IcmpPacket { packet })
    }
}
