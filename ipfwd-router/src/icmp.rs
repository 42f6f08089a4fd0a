use crate::config::RouterConfig;
use crate::interface::Interface;
use ipfwd_packets::*;
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use tracing::debug;

/// The ICMP messages the router originates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IcmpKind {
    EchoReply,
    DestNetUnreachable,
    DestHostUnreachable,
    PortUnreachable,
    TimeExceeded,
}

impl IcmpKind {
    pub fn msg_type(self) -> u8 {
        match self {
            IcmpKind::EchoReply => ICMP_ECHO_REPLY,
            IcmpKind::DestNetUnreachable
            | IcmpKind::DestHostUnreachable
            | IcmpKind::PortUnreachable => ICMP_DEST_UNREACHABLE,
            IcmpKind::TimeExceeded => ICMP_TIME_EXCEEDED,
        }
    }

    pub fn msg_code(self) -> u8 {
        match self {
            IcmpKind::EchoReply => 0,
            IcmpKind::DestNetUnreachable => 0,
            IcmpKind::DestHostUnreachable => 1,
            IcmpKind::PortUnreachable => 3,
            IcmpKind::TimeExceeded => 0,
        }
    }

    pub fn is_error(self) -> bool {
        self != IcmpKind::EchoReply
    }
}

/// Builds the Ethernet frame carrying an ICMP message of `kind` about `offending`, addressed
/// back to its sender and sent from `responder` with IP source `source_ip`.
///
/// `offending` must still carry its Ethernet header, the sender's MAC is read from it.
/// Returns `None` when no message should be sent: the error is suppressed (see
/// [`should_generate_error`]), an echo reply is asked for something that is not an echo
/// request, or there is no link layer header to answer.
pub fn build_icmp(
    kind: IcmpKind,
    offending: &Ipv4Packet,
    responder: &Interface,
    source_ip: Ipv4Addr,
    config: &RouterConfig,
) -> Option<EthernetFrame> {
    let sender_mac = match sender_mac(offending) {
        Some(mac) => mac,
        None => {
            debug!("No link layer header to answer, not sending {:?}", kind);
            return None;
        }
    };

    let (message, ttl) = if kind.is_error() {
        if !should_generate_error(offending) {
            debug!(src = %offending.src_addr(), "Suppressing {:?}", kind);
            return None;
        }
        (error_message(kind, offending), config.icmp_error_ttl)
    } else {
        (echo_reply_message(offending)?, config.echo_reply_ttl)
    };

    let mut icmp = match IcmpPacket::encap(reply_header(offending), &message) {
        Ok(icmp) => icmp,
        Err(e) => {
            debug!("Could not build {:?}: {}", kind, e);
            return None;
        }
    };
    icmp.set_checksum();

    let mut packet = icmp.packet();
    packet.set_src_addr(source_ip);
    packet.set_dest_addr(offending.src_addr());
    packet.set_ttl(ttl);
    packet.set_checksum();

    let mut frame = EthernetFrame::encap_ipv4(packet);
    frame.set_dest_mac(sender_mac);
    frame.set_src_mac(responder.mac);
    Some(frame)
}

/// Checks based on RFC 1812 4.3.2.7 (When Not to Send ICMP Errors).
pub fn should_generate_error(packet: &Ipv4Packet) -> bool {
    // Only the first fragment
    if packet.fragment_offset() != 0 {
        return false;
    }
    // Avoid infinite loops, no errors from errors
    if packet.protocol() == IpProtocol::ICMP {
        match packet.payload().first() {
            Some(&msg_type) if !is_icmp_error_type(msg_type) => {}
            _ => return false,
        }
    }
    // Only toward a single, reachable host
    let src = packet.src_addr();
    !(src.is_unspecified() || src.is_broadcast() || src.is_multicast() || src.is_loopback())
}

// The offending header minus any options, with a placeholder total length. Identification,
// TOS and the like carry over, fragmentation fields are cleared.
fn reply_header(offending: &Ipv4Packet) -> Ipv4Packet {
    let mut header = offending.header()[..IPV4_MIN_HEADER_LEN].to_vec();
    header[0] = 0x45;
    header[2..4].copy_from_slice(&(IPV4_MIN_HEADER_LEN as u16).to_be_bytes());
    header[6] = 0;
    header[7] = 0;
    Ipv4Packet {
        data: header,
        layer2_offset: None,
        layer3_offset: 0,
        payload_offset: IPV4_MIN_HEADER_LEN,
    }
}

fn error_message(kind: IcmpKind, offending: &Ipv4Packet) -> Vec<u8> {
    let mut message = vec![0; ICMP_HEADER_LEN + ICMP_DATA_SIZE];
    message[0] = kind.msg_type();
    message[1] = kind.msg_code();

    let quoted = offending.ip_bytes();
    let len = quoted.len().min(ICMP_DATA_SIZE);
    message[ICMP_HEADER_LEN..ICMP_HEADER_LEN + len].copy_from_slice(&quoted[..len]);
    message
}

fn echo_reply_message(offending: &Ipv4Packet) -> Option<Vec<u8>> {
    let request = match IcmpPacket::try_from(offending.clone()) {
        Ok(request) => request,
        Err(e) => {
            debug!("Not answering with an echo reply: {}", e);
            return None;
        }
    };
    if request.msg_type() != ICMP_ECHO_REQUEST {
        return None;
    }
    let mut message = request.message().to_vec();
    message[0] = ICMP_ECHO_REPLY;
    message[1] = 0;
    Some(message)
}

fn sender_mac(packet: &Ipv4Packet) -> Option<MacAddr> {
    let layer2_offset = packet.layer2_offset?;
    packet
        .data
        .get(layer2_offset + 6..layer2_offset + 12)
        .and_then(MacAddr::from_slice)
}
