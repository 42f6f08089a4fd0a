#![allow(dead_code)]

use crossbeam::crossbeam_channel::Receiver;
use ipfwd_packets::*;
use ipfwd_router::*;
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::sync::Arc;

pub const ETH0_MAC: MacAddr = MacAddr {
    bytes: [0x02, 0, 0, 0, 0, 0x01],
};
pub const ETH1_MAC: MacAddr = MacAddr {
    bytes: [0x02, 0, 0, 0, 0, 0x02],
};
pub const HOST_MAC: MacAddr = MacAddr {
    bytes: [0x02, 0, 0, 0, 0xaa, 0x01],
};
pub const GATEWAY_MAC: MacAddr = MacAddr {
    bytes: [0x02, 0, 0, 0, 0xbb, 0x01],
};

pub fn eth0_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 0, 2, 1)
}

pub fn eth1_ip() -> Ipv4Addr {
    Ipv4Addr::new(198, 51, 100, 1)
}

/// A host on eth0's network.
pub fn host_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 0, 2, 2)
}

/// The next hop for 10.0.0.0/16, reached through eth1.
pub fn gateway_ip() -> Ipv4Addr {
    Ipv4Addr::new(198, 51, 100, 254)
}

pub fn interfaces() -> InterfaceTable {
    InterfaceTable::new(vec![
        Interface::new("eth0", ETH0_MAC, eth0_ip()),
        Interface::new("eth1", ETH1_MAC, eth1_ip()),
    ])
    .unwrap()
}

pub fn routes() -> RoutingTable {
    RoutingTable::new(vec![
        RouteEntry::new(
            Ipv4Addr::new(192, 0, 2, 0),
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            "eth0",
        ),
        RouteEntry::new(
            Ipv4Addr::new(198, 51, 100, 0),
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            "eth1",
        ),
        RouteEntry::new(
            Ipv4Addr::new(10, 0, 0, 0),
            gateway_ip(),
            Ipv4Addr::new(255, 255, 0, 0),
            "eth1",
        ),
    ])
}

pub fn router_with(config: RouterConfig) -> (Arc<Router>, Receiver<OutboundFrame>) {
    let (transport, receiver) = ChannelTransport::unbounded();
    let router = Router::new(interfaces(), routes(), Arc::new(transport), config);
    (Arc::new(router), receiver)
}

pub fn router() -> (Arc<Router>, Receiver<OutboundFrame>) {
    router_with(RouterConfig::default())
}

/// An IPv4 frame from `HOST_MAC` to eth0 with a valid header checksum.
pub fn ipv4_frame(
    src: Ipv4Addr,
    dest: Ipv4Addr,
    ttl: u8,
    protocol: IpProtocol,
    payload: &[u8],
) -> Vec<u8> {
    let mut packet = Ipv4Packet::empty();
    packet.set_src_addr(src);
    packet.set_dest_addr(dest);
    packet.set_ttl(ttl);
    packet.set_protocol(protocol);
    packet.set_payload(payload);
    packet.set_checksum();

    let mut frame = EthernetFrame::encap_ipv4(packet);
    frame.set_src_mac(HOST_MAC);
    frame.set_dest_mac(ETH0_MAC);
    frame.into_bytes()
}

pub fn udp_frame(dest: Ipv4Addr, ttl: u8) -> Vec<u8> {
    let udp = [0x13, 0x88, 0x13, 0x89, 0, 12, 0, 0, 1, 2, 3, 4];
    ipv4_frame(host_ip(), dest, ttl, IpProtocol::UDP, &udp)
}

pub fn echo_request(dest: Ipv4Addr) -> Vec<u8> {
    let mut message = vec![ICMP_ECHO_REQUEST, 0, 0, 0, 0x42, 0x42, 0, 1];
    message.extend_from_slice(b"abcdefgh");
    let mut icmp = IcmpPacket::encap(Ipv4Packet::empty(), &message).unwrap();
    icmp.set_checksum();
    let message = icmp.message().to_vec();
    ipv4_frame(host_ip(), dest, 64, IpProtocol::ICMP, &message)
}

pub fn arp_frame(
    op: ArpOp,
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_ip: Ipv4Addr,
) -> Vec<u8> {
    let mut arp_frame = ArpFrame::ipv4_over_ethernet();
    arp_frame.set_opcode(op);
    arp_frame.set_sender_hardware_addr(sender_mac);
    arp_frame.set_sender_protocol_addr(sender_ip);
    arp_frame.set_target_protocol_addr(target_ip);

    let mut frame = arp_frame.frame();
    frame.set_src_mac(sender_mac);
    frame.set_dest_mac(MacAddr::BROADCAST);
    frame.into_bytes()
}

/// The gateway answering eth1's request for its address.
pub fn gateway_reply() -> Vec<u8> {
    arp_frame(ArpOp::Reply, GATEWAY_MAC, gateway_ip(), eth1_ip())
}

pub fn drain(receiver: &Receiver<OutboundFrame>) -> Vec<OutboundFrame> {
    receiver.try_iter().collect()
}

pub fn as_arp(out: &OutboundFrame) -> Option<ArpFrame> {
    let frame = EthernetFrame::from_buffer(out.frame.clone(), 0).ok()?;
    ArpFrame::try_from(frame).ok()
}

pub fn as_ipv4(out: &OutboundFrame) -> Option<Ipv4Packet> {
    let frame = EthernetFrame::from_buffer(out.frame.clone(), 0).ok()?;
    Ipv4Packet::try_from(frame).ok()
}

pub fn as_icmp(out: &OutboundFrame) -> Option<IcmpPacket> {
    IcmpPacket::try_from(as_ipv4(out)?).ok()
}

/// (type, code) of every ICMP message among `out`.
pub fn icmp_kinds(out: &[OutboundFrame]) -> Vec<(u8, u8)> {
    out.iter()
        .filter_map(as_icmp)
        .map(|icmp| (icmp.msg_type(), icmp.msg_code()))
        .collect()
}

/// Target addresses of every ARP request among `out`.
pub fn arp_requests(out: &[OutboundFrame]) -> Vec<Ipv4Addr> {
    out.iter()
        .filter_map(as_arp)
        .filter(|arp| arp.opcode() == ArpOp::Request as u16)
        .filter_map(|arp| arp.target_ipv4_addr())
        .collect()
}
