//! Classifiers look at a packet by reference and say which path it takes next. The
//! [`Router`](crate::Router) matches on the class to pick a handler.

use crate::interface::{Interface, InterfaceTable};
use crate::route::{RouteEntry, RoutingTable};
use ipfwd_packets::{EthernetFrame, Ipv4Packet, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};

pub trait Classifier {
    type Packet: Send + Clone;
    type Class: Sized;

    fn classify(&self, packet: &Self::Packet) -> Self::Class;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EtherClass {
    Arp,
    Ipv4,
    Unsupported(u16),
}

/// Sorts frames by their EtherType field.
pub struct ClassifyEtherType;

impl Classifier for ClassifyEtherType {
    type Packet = EthernetFrame;
    type Class = EtherClass;

    fn classify(&self, frame: &Self::Packet) -> Self::Class {
        // https://en.wikipedia.org/wiki/EtherType
        match frame.ether_type() {
            ARP_ETHER_TYPE => EtherClass::Arp,
            IPV4_ETHER_TYPE => EtherClass::Ipv4,
            other => EtherClass::Unsupported(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination<'a> {
    /// Addressed to one of our own interfaces.
    ForRouter(&'a Interface),
    /// Somewhere else, along this route.
    Forward(&'a RouteEntry),
    NoRoute,
}

/// Decides whether an IPv4 packet is ours to answer or which route carries it onward.
pub struct ClassifyDestination<'a> {
    interfaces: &'a InterfaceTable,
    routes: &'a RoutingTable,
}

impl<'a> ClassifyDestination<'a> {
    pub fn new(interfaces: &'a InterfaceTable, routes: &'a RoutingTable) -> Self {
        ClassifyDestination { interfaces, routes }
    }
}

impl<'a> Classifier for ClassifyDestination<'a> {
    type Packet = Ipv4Packet;
    type Class = Destination<'a>;

    fn classify(&self, packet: &Self::Packet) -> Self::Class {
        let dest = packet.dest_addr();
        if let Some(interface) = self.interfaces.by_ip(dest) {
            return Destination::ForRouter(interface);
        }
        match self.routes.longest_prefix_match(dest) {
            Some(route) => Destination::Forward(route),
            None => Destination::NoRoute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipfwd_packets::MacAddr;
    use std::net::Ipv4Addr;

    #[test]
    fn ether_types() {
        let mut frame = EthernetFrame::empty();
        let classifier = ClassifyEtherType;

        frame.set_ether_type(ARP_ETHER_TYPE);
        assert_eq!(classifier.classify(&frame), EtherClass::Arp);
        frame.set_ether_type(IPV4_ETHER_TYPE);
        assert_eq!(classifier.classify(&frame), EtherClass::Ipv4);
        frame.set_ether_type(0x86DD);
        assert_eq!(classifier.classify(&frame), EtherClass::Unsupported(0x86DD));
    }

    #[test]
    fn destinations() {
        let interfaces = InterfaceTable::new(vec![Interface::new(
            "eth0",
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(192, 0, 2, 1),
        )])
        .unwrap();
        let routes = RoutingTable::new(vec![RouteEntry::new(
            Ipv4Addr::new(192, 0, 2, 0),
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            "eth0",
        )]);
        let classifier = ClassifyDestination::new(&interfaces, &routes);

        let mut packet = Ipv4Packet::empty();
        packet.set_dest_addr(Ipv4Addr::new(192, 0, 2, 1));
        match classifier.classify(&packet) {
            Destination::ForRouter(iface) => assert_eq!(iface.name, "eth0"),
            other => panic!("unexpected class {:?}", other),
        }

        packet.set_dest_addr(Ipv4Addr::new(192, 0, 2, 77));
        match classifier.classify(&packet) {
            Destination::Forward(route) => assert_eq!(route.interface, "eth0"),
            other => panic!("unexpected class {:?}", other),
        }

        packet.set_dest_addr(Ipv4Addr::new(203, 0, 113, 1));
        assert_eq!(classifier.classify(&packet), Destination::NoRoute);
    }
}
