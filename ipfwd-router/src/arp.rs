//! ARP as the router speaks it (RFC 826, IPv4 over Ethernet only): answering requests for
//! our addresses, broadcasting requests for next hops, and learning from replies.

use crate::interface::Interface;
use crate::router::{DropReason, Router, Verdict};
use ipfwd_packets::{ArpFrame, ArpOp, EthernetFrame, MacAddr};
use std::net::Ipv4Addr;
use std::time::Instant;
use tracing::{debug, trace};

/// Broadcast request asking who has `target`, sent from `egress`.
pub fn arp_request_frame(egress: &Interface, target: Ipv4Addr) -> EthernetFrame {
    let mut arp_frame = ArpFrame::ipv4_over_ethernet();
    arp_frame.set_opcode(ArpOp::Request);
    arp_frame.set_sender_hardware_addr(egress.mac);
    arp_frame.set_sender_protocol_addr(egress.ip);
    arp_frame.set_target_hardware_addr(MacAddr::BROADCAST);
    arp_frame.set_target_protocol_addr(target);

    let mut frame = arp_frame.frame();
    frame.set_dest_mac(MacAddr::BROADCAST);
    frame.set_src_mac(egress.mac);
    frame
}

/// Reply to `request`, claiming `responder`'s addresses and sent straight back to the
/// requester. `None` if the request lacks usable sender addresses.
pub fn arp_reply_frame(responder: &Interface, request: &ArpFrame) -> Option<EthernetFrame> {
    let requester_mac = request.sender_mac_addr()?;
    let requester_ip = request.sender_ipv4_addr()?;

    let mut arp_frame = ArpFrame::ipv4_over_ethernet();
    arp_frame.set_opcode(ArpOp::Reply);
    arp_frame.set_sender_hardware_addr(responder.mac);
    arp_frame.set_sender_protocol_addr(responder.ip);
    arp_frame.set_target_hardware_addr(requester_mac);
    arp_frame.set_target_protocol_addr(requester_ip);

    let mut frame = arp_frame.frame();
    frame.set_dest_mac(requester_mac);
    frame.set_src_mac(responder.mac);
    Some(frame)
}

impl Router {
    /// Broadcasts a request for `target` out of `egress`.
    pub fn send_arp_request(&self, target: Ipv4Addr, egress: &Interface) {
        trace!(%target, interface = %egress.name, "Who has");
        let frame = arp_request_frame(egress, target);
        self.transmit(&frame.into_bytes(), &egress.name);
    }

    /// Answers `request` on the interface it arrived on. The cache is left alone.
    pub fn send_arp_reply(&self, inbound: &Interface, request: &ArpFrame) -> Verdict {
        match arp_reply_frame(inbound, request) {
            Some(frame) => {
                self.transmit(&frame.into_bytes(), &inbound.name);
                Verdict::ArpReplied
            }
            None => {
                debug!("ARP request without usable sender addresses");
                Verdict::Dropped(DropReason::MalformedArp)
            }
        }
    }

    /// Records the sender of `reply` and sends out everything that was waiting on it. The
    /// released frames leave through `inbound`, the interface the reply arrived on.
    pub fn process_arp_reply(
        &self,
        reply: &ArpFrame,
        inbound: &Interface,
        now: Instant,
    ) -> Verdict {
        let (ip, mac) = match (reply.sender_ipv4_addr(), reply.sender_mac_addr()) {
            (Some(ip), Some(mac)) => (ip, mac),
            _ => {
                debug!("ARP reply without usable sender addresses");
                return Verdict::Dropped(DropReason::MalformedArp);
            }
        };

        // The lock is only held for the insert, frames go out after.
        let request = self.lock_cache().insert(mac, ip, now);
        let released = match request {
            Some(request) => {
                debug!(%ip, %mac, waiting = request.packets.len(), "ARP resolved");
                self.release(request.packets, mac, inbound)
            }
            None => {
                trace!(%ip, %mac, "ARP binding refreshed");
                0
            }
        };
        Verdict::ArpResolved { released }
    }
}
