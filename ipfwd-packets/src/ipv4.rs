use crate::*;
use std::borrow::Cow;
use std::convert::TryFrom;
use std::net::Ipv4Addr;

pub const IPV4_MIN_HEADER_LEN: usize = 20;

const CHECKSUM_OFFSET: usize = 10;

#[derive(Clone, Debug)]
pub struct Ipv4Packet {
    pub data: PacketData,
    pub layer2_offset: Option<usize>,
    pub layer3_offset: usize,
    pub payload_offset: usize,
}

impl Packet for Ipv4Packet {}

impl Ipv4Packet {
    /// Wraps `data` with IPv4 accessors, the header starting at `layer3_offset`.
    ///
    /// Only structural problems are rejected here: a buffer too short for the header, a header
    /// length field below 5 words or past the end of the buffer, and a total length field that
    /// disagrees with the header length or the bytes available. Trailing bytes past the total
    /// length (link layer padding) are allowed. The version field and checksum are left for the
    /// caller to judge, see [`Ipv4Packet::version`] and [`Ipv4Packet::validate_checksum`].
    pub fn from_buffer(
        data: PacketData,
        layer2_offset: Option<usize>,
        layer3_offset: usize,
    ) -> Result<Ipv4Packet, &'static str> {
        if data.len() < layer3_offset + IPV4_MIN_HEADER_LEN {
            return Err("Data is too short to be an IPv4 Packet");
        }

        // This is the header length in 32bit words
        let ihl = (data[layer3_offset] & 0x0F) as usize;
        if ihl < 5 {
            return Err("Header length field is less than 5 words");
        }
        let payload_offset = layer3_offset + (ihl * 4);
        if payload_offset > data.len() {
            return Err("Header length field runs past the end of the packet");
        }

        // TotalLen is the 3rd and 4th byte of the IP Header
        let total_len =
            u16::from_be_bytes([data[layer3_offset + 2], data[layer3_offset + 3]]) as usize;
        if total_len < ihl * 4 || data.len() < layer3_offset + total_len {
            return Err("Packet has invalid total length field");
        }

        Ok(Ipv4Packet {
            data,
            layer2_offset,
            layer3_offset,
            payload_offset,
        })
    }

    /// Returns a bare 20 byte header with version 4, IHL 5, total length 20 and all other
    /// fields zero. No link layer header is attached.
    pub fn empty() -> Ipv4Packet {
        let mut data = vec![0; IPV4_MIN_HEADER_LEN];
        data[0] = 0x45;
        data[3] = IPV4_MIN_HEADER_LEN as u8;
        Ipv4Packet {
            data,
            layer2_offset: None,
            layer3_offset: 0,
            payload_offset: IPV4_MIN_HEADER_LEN,
        }
    }

    pub fn version(&self) -> u8 {
        (self.data[self.layer3_offset] & 0xF0) >> 4
    }

    pub fn ihl(&self) -> u8 {
        self.data[self.layer3_offset] & 0x0F
    }

    /// Header length in bytes, options included.
    pub fn header_len(&self) -> usize {
        self.payload_offset - self.layer3_offset
    }

    /// The header bytes, options included.
    pub fn header(&self) -> &[u8] {
        &self.data[self.layer3_offset..self.payload_offset]
    }

    /// Everything from the start of the IP header up to the total length, excluding any
    /// link layer padding that follows.
    pub fn ip_bytes(&self) -> &[u8] {
        &self.data[self.layer3_offset..self.end_offset()]
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.addr_at(self.layer3_offset + 12)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 12..self.layer3_offset + 16].copy_from_slice(&addr.octets());
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        self.addr_at(self.layer3_offset + 16)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 16..self.layer3_offset + 20].copy_from_slice(&addr.octets());
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..self.end_offset()])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        let total_len = self.header_len() + payload.len();
        self.set_total_len(total_len as u16);
        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.data[self.layer3_offset + 9])
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.data[self.layer3_offset + 9] = protocol.into();
    }

    pub fn total_len(&self) -> u16 {
        self.u16_at(self.layer3_offset + 2)
    }

    pub fn set_total_len(&mut self, total_len: u16) {
        self.data[self.layer3_offset + 2..self.layer3_offset + 4]
            .copy_from_slice(&total_len.to_be_bytes());
    }

    pub fn ttl(&self) -> u8 {
        self.data[self.layer3_offset + 8]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.data[self.layer3_offset + 8] = ttl;
    }

    pub fn checksum(&self) -> u16 {
        self.u16_at(self.layer3_offset + CHECKSUM_OFFSET)
    }

    pub fn dscp(&self) -> u8 {
        self.data[self.layer3_offset + 1] >> 2
    }

    pub fn identification(&self) -> u16 {
        self.u16_at(self.layer3_offset + 4)
    }

    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([
            self.data[self.layer3_offset + 6] & 0x1F,
            self.data[self.layer3_offset + 7],
        ])
    }

    /// Returns tuple of (Don't Fragment, More Fragments)
    pub fn flags(&self) -> (bool, bool) {
        let df = (self.data[self.layer3_offset + 6] & 0x40) != 0;
        let mf = (self.data[self.layer3_offset + 6] & 0x20) != 0;
        (df, mf)
    }

    /// True when the carried checksum matches the header.
    pub fn validate_checksum(&self) -> bool {
        internet_checksum(self.header()) == 0
    }

    /// Calculates what the checksum should be set to given the current header, treating the
    /// checksum field as zero.
    pub fn calculate_checksum(&self) -> u16 {
        let mut header = self.header().to_vec();
        header[CHECKSUM_OFFSET] = 0;
        header[CHECKSUM_OFFSET + 1] = 0;
        internet_checksum(&header)
    }

    /// Sets checksum field to valid value
    pub fn set_checksum(&mut self) {
        let new_checksum = self.calculate_checksum();
        self.data[self.layer3_offset + CHECKSUM_OFFSET..self.layer3_offset + CHECKSUM_OFFSET + 2]
            .copy_from_slice(&new_checksum.to_be_bytes());
    }

    fn end_offset(&self) -> usize {
        let end = self.layer3_offset + self.total_len() as usize;
        end.max(self.payload_offset).min(self.data.len())
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.data[offset], self.data[offset + 1]])
    }

    fn addr_at(&self, offset: usize) -> Ipv4Addr {
        Ipv4Addr::new(
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        )
    }
}

/// Ipv4Packets are considered the same if they have the same data from the layer 3
/// header and onward. This function does not consider the data before the start of
/// the IPv4 header.
impl PartialEq for Ipv4Packet {
    fn eq(&self, other: &Self) -> bool {
        self.data[self.layer3_offset..] == other.data[other.layer3_offset..]
    }
}

impl Eq for Ipv4Packet {}

impl TryFrom<EthernetFrame> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != IPV4_ETHER_TYPE {
            return Err("Frame does not have IPv4 ether type");
        }
        Ipv4Packet::from_buffer(frame.data, Some(frame.layer2_offset), frame.payload_offset)
    }
}
