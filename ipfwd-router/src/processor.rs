//! Single step packet transformations used along the forwarding path.

use ipfwd_packets::{EthernetFrame, Ipv4Packet, MacAddr};

pub trait Processor {
    type Input: Send + Clone;
    type Output: Send + Clone;

    fn process(&mut self, packet: Self::Input) -> Option<Self::Output>;
}

/// Decrements the TTL of an IPv4 packet and refreshes the header checksum. A packet that
/// already has a TTL of 0 passes through untouched.
#[derive(Default)]
pub struct DecIpv4HopLimit {}

impl DecIpv4HopLimit {
    pub fn new() -> DecIpv4HopLimit {
        DecIpv4HopLimit {}
    }
}

impl Processor for DecIpv4HopLimit {
    type Input = Ipv4Packet;
    type Output = Ipv4Packet;

    fn process(&mut self, mut packet: Self::Input) -> Option<Self::Output> {
        match packet.ttl() {
            0 => Some(packet),
            ttl => {
                packet.set_ttl(ttl - 1);
                packet.set_checksum();
                Some(packet)
            }
        }
    }
}

/// Points a frame at its next hop: source becomes the egress interface, destination the
/// resolved neighbour.
pub struct RewriteEthernet {
    src: MacAddr,
    dest: MacAddr,
}

impl RewriteEthernet {
    pub fn new(src: MacAddr, dest: MacAddr) -> RewriteEthernet {
        RewriteEthernet { src, dest }
    }
}

impl Processor for RewriteEthernet {
    type Input = EthernetFrame;
    type Output = EthernetFrame;

    fn process(&mut self, mut frame: Self::Input) -> Option<Self::Output> {
        frame.set_src_mac(self.src);
        frame.set_dest_mac(self.dest);
        Some(frame)
    }
}
