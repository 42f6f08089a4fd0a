use crate::arp_cache::{ArpCache, RetryAction, WaitingPacket};
use crate::classifier::{
    Classifier, ClassifyDestination, ClassifyEtherType, Destination, EtherClass,
};
use crate::config::{IntegrityPolicy, RouterConfig};
use crate::icmp::{build_icmp, IcmpKind};
use crate::interface::{Interface, InterfaceTable};
use crate::processor::{DecIpv4HopLimit, Processor, RewriteEthernet};
use crate::route::RoutingTable;
use crate::transport::{InboundFrame, Transport};
use crossbeam::crossbeam_channel::Receiver;
use ipfwd_packets::{ArpFrame, ArpOp, EthernetFrame, IpProtocol, Ipv4Packet, MacAddr};
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, instrument, trace, warn};

/// What [`Router::handle_packet`] did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Sent toward its next hop.
    Forwarded,
    /// Parked until its next hop resolves.
    Queued,
    ArpReplied,
    /// An ARP reply was recorded and this many parked frames went out behind it.
    ArpResolved { released: usize },
    /// Answered with this ICMP message and not forwarded.
    Icmp(IcmpKind),
    Dropped(DropReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Shorter than an Ethernet header.
    Truncated,
    /// Arrived on an interface the router does not have.
    UnknownInterface,
    UnsupportedEtherType(u16),
    MalformedArp,
    UnsupportedArpOp(u16),
    /// ARP about an address that is not one of ours.
    NotOurAddress,
    /// The IPv4 header does not fit the frame.
    MalformedIpv4,
    /// Bad version or checksum under [`IntegrityPolicy::Strict`].
    Integrity,
    /// A route names an interface the router does not have.
    UnknownEgress,
    /// Addressed to us, but nothing to answer.
    NoResponse,
    /// An ICMP error was due, but none may be sent about this packet.
    IcmpSuppressed,
}

/// The forwarding plane: interface and routing tables, the ARP cache, and the transport
/// every outgoing frame goes through.
///
/// `Router` is shared as `Arc<Router>` between whatever feeds it frames and the
/// [`ArpSweeper`](crate::ArpSweeper). The cache sits behind one mutex; everything else is
/// read only.
pub struct Router {
    pub(crate) interfaces: InterfaceTable,
    pub(crate) routes: RoutingTable,
    pub(crate) cache: Mutex<ArpCache>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: RouterConfig,
}

impl Router {
    pub fn new(
        interfaces: InterfaceTable,
        routes: RoutingTable,
        transport: Arc<dyn Transport>,
        config: RouterConfig,
    ) -> Self {
        Router {
            interfaces,
            routes,
            cache: Mutex::new(ArpCache::new(config.arp_entry_timeout)),
            transport,
            config,
        }
    }

    pub fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Exclusive access to the ARP cache. A lock poisoned by a panicking holder is taken
    /// over as is.
    pub fn lock_cache(&self) -> MutexGuard<'_, ArpCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one received frame through to completion.
    pub fn handle_packet(&self, frame: &[u8], inbound: &str) -> Verdict {
        self.handle_packet_at(frame, inbound, Instant::now())
    }

    /// [`Router::handle_packet`] with the clock supplied by the caller.
    #[instrument(level = "trace", skip(self, frame, now), fields(len = frame.len()))]
    pub fn handle_packet_at(&self, frame: &[u8], inbound: &str, now: Instant) -> Verdict {
        let inbound = match self.interfaces.get(inbound) {
            Some(interface) => interface,
            None => {
                debug!("Dropping frame from unknown interface");
                return Verdict::Dropped(DropReason::UnknownInterface);
            }
        };

        let frame = match EthernetFrame::from_buffer(frame.to_vec(), 0) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Dropping frame: {}", e);
                return Verdict::Dropped(DropReason::Truncated);
            }
        };

        let verdict = match ClassifyEtherType.classify(&frame) {
            EtherClass::Arp => self.handle_arp(frame, inbound, now),
            EtherClass::Ipv4 => self.handle_ipv4(frame, inbound, now),
            EtherClass::Unsupported(ether_type) => {
                debug!("Dropping frame with EtherType {:#06x}", ether_type);
                Verdict::Dropped(DropReason::UnsupportedEtherType(ether_type))
            }
        };
        trace!(?verdict);
        verdict
    }

    /// Feeds every frame from `ingress` through [`Router::handle_packet`] until all senders
    /// hang up. Returns how many frames were handled.
    pub fn serve(&self, ingress: Receiver<InboundFrame>) -> usize {
        let mut handled = 0;
        for inbound in ingress.iter() {
            self.handle_packet(&inbound.frame, &inbound.interface);
            handled += 1;
        }
        debug!("Ingress closed after {} frames", handled);
        handled
    }

    /// Gives the pending request for `target` its turn: another ARP request if the last one
    /// is old enough, host unreachable for everything parked behind it once out of retries.
    /// Returns `None` when nothing is pending for `target`.
    pub fn drive_retry(&self, target: Ipv4Addr) -> Option<RetryAction> {
        self.drive_retry_at(target, Instant::now())
    }

    pub fn drive_retry_at(&self, target: Ipv4Addr, now: Instant) -> Option<RetryAction> {
        let mut cache = self.lock_cache();
        self.drive_request(&mut cache, target, now)
    }

    /// One pass of the periodic sweep: drive every pending request, then purge expired
    /// bindings.
    pub fn sweep(&self) {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) {
        let mut cache = self.lock_cache();
        for target in cache.pending_ips() {
            self.drive_request(&mut cache, target, now);
        }
        let purged = cache.purge_expired(now);
        if purged > 0 {
            debug!("Purged {} expired ARP entries", purged);
        }
    }

    fn handle_arp(&self, frame: EthernetFrame, inbound: &Interface, now: Instant) -> Verdict {
        let arp_frame = match ArpFrame::try_from(frame) {
            Ok(arp_frame) if arp_frame.is_ipv4_over_ethernet() => arp_frame,
            Ok(_) => {
                debug!("Dropping ARP frame that is not IPv4 over Ethernet");
                return Verdict::Dropped(DropReason::MalformedArp);
            }
            Err(e) => {
                debug!("Dropping ARP frame: {}", e);
                return Verdict::Dropped(DropReason::MalformedArp);
            }
        };

        let target = match arp_frame.target_ipv4_addr() {
            Some(target) if self.interfaces.by_ip(target).is_some() => target,
            _ => {
                trace!("ARP frame is not for us");
                return Verdict::Dropped(DropReason::NotOurAddress);
            }
        };
        trace!(%target, opcode = arp_frame.opcode(), "ARP for one of our addresses");

        match arp_frame.opcode() {
            op if op == ArpOp::Request as u16 => self.send_arp_reply(inbound, &arp_frame),
            op if op == ArpOp::Reply as u16 => self.process_arp_reply(&arp_frame, inbound, now),
            op => {
                debug!("Dropping ARP frame with opcode {}", op);
                Verdict::Dropped(DropReason::UnsupportedArpOp(op))
            }
        }
    }

    fn handle_ipv4(&self, frame: EthernetFrame, inbound: &Interface, now: Instant) -> Verdict {
        let packet = match Ipv4Packet::try_from(frame) {
            Ok(packet) => packet,
            Err(e) => {
                debug!("Dropping IPv4 frame: {}", e);
                return Verdict::Dropped(DropReason::MalformedIpv4);
            }
        };

        let classifier = ClassifyDestination::new(&self.interfaces, &self.routes);
        match classifier.classify(&packet) {
            Destination::ForRouter(interface) => {
                if !self.integrity_ok(&packet) {
                    return Verdict::Dropped(DropReason::Integrity);
                }
                self.answer_for_router(&packet, inbound, interface)
            }
            Destination::NoRoute => {
                debug!(dest = %packet.dest_addr(), "No route");
                self.send_icmp(IcmpKind::DestNetUnreachable, &packet, inbound, inbound.ip)
            }
            Destination::Forward(route) => {
                if !self.integrity_ok(&packet) {
                    return Verdict::Dropped(DropReason::Integrity);
                }
                match packet.ttl() {
                    0 => {
                        return self.send_icmp(IcmpKind::TimeExceeded, &packet, inbound, inbound.ip);
                    }
                    // Tell the sender now, the next hop will drop it
                    1 => {
                        self.send_icmp(IcmpKind::TimeExceeded, &packet, inbound, inbound.ip);
                    }
                    _ => {}
                }

                let egress = match self.interfaces.lookup(&route.interface) {
                    Ok(egress) => egress,
                    Err(e) => {
                        warn!("Route to {}: {}", route.destination, e);
                        return Verdict::Dropped(DropReason::UnknownEgress);
                    }
                };
                let next_hop = route.next_hop(packet.dest_addr());
                match DecIpv4HopLimit::new().process(packet) {
                    Some(packet) => self.forward(packet, inbound, egress, next_hop, now),
                    None => Verdict::Dropped(DropReason::MalformedIpv4),
                }
            }
        }
    }

    fn answer_for_router(
        &self,
        packet: &Ipv4Packet,
        inbound: &Interface,
        addressed: &Interface,
    ) -> Verdict {
        match packet.protocol() {
            IpProtocol::ICMP => self.send_icmp(IcmpKind::EchoReply, packet, inbound, addressed.ip),
            IpProtocol::TCP | IpProtocol::UDP => {
                self.send_icmp(IcmpKind::PortUnreachable, packet, inbound, inbound.ip)
            }
            IpProtocol::Other(protocol) => {
                debug!("Not answering IP protocol {}", protocol);
                Verdict::Dropped(DropReason::NoResponse)
            }
        }
    }

    fn forward(
        &self,
        packet: Ipv4Packet,
        inbound: &Interface,
        egress: &Interface,
        next_hop: Ipv4Addr,
        now: Instant,
    ) -> Verdict {
        let mut cache = self.lock_cache();
        match cache.lookup(next_hop, now) {
            Some(entry) => {
                drop(cache);
                let frame = EthernetFrame::from(packet);
                match RewriteEthernet::new(egress.mac, entry.mac).process(frame) {
                    Some(frame) => {
                        self.transmit(&frame.into_bytes(), &egress.name);
                        Verdict::Forwarded
                    }
                    None => Verdict::Dropped(DropReason::MalformedIpv4),
                }
            }
            None => {
                let request = cache.enqueue(
                    next_hop,
                    WaitingPacket {
                        frame: EthernetFrame::from(packet).into_bytes(),
                        egress_interface: egress.name.clone(),
                        inbound_interface: inbound.name.clone(),
                    },
                );
                debug!(%next_hop, waiting = request.packets.len(), "Queued behind ARP");
                self.drive_request(&mut cache, next_hop, now);
                Verdict::Queued
            }
        }
    }

    // Runs with the cache lock held, so requests and host unreachable batches go out before
    // anyone else sees the request.
    fn drive_request(
        &self,
        cache: &mut ArpCache,
        target: Ipv4Addr,
        now: Instant,
    ) -> Option<RetryAction> {
        let action = cache.request(target)?.poll(
            now,
            self.config.arp_retry_interval,
            self.config.arp_max_requests,
        );

        match action {
            RetryAction::Wait => {}
            RetryAction::SendRequest => {
                let egress = cache
                    .request(target)
                    .and_then(|request| request.egress_interface())
                    .and_then(|name| self.interfaces.get(name));
                match egress {
                    Some(egress) => self.send_arp_request(target, egress),
                    None => warn!(%target, "No egress interface to resolve on"),
                }
                if let Some(request) = cache.request_mut(target) {
                    request.mark_sent(now);
                    debug!(%target, times_sent = request.times_sent, "Sent ARP request");
                }
            }
            RetryAction::Abandon => {
                if let Some(request) = cache.destroy(target) {
                    debug!(
                        %target,
                        waiting = request.packets.len(),
                        "ARP resolution abandoned"
                    );
                    for waiting in request.packets {
                        self.send_host_unreachable(waiting);
                    }
                }
            }
        }
        Some(action)
    }

    fn send_host_unreachable(&self, waiting: WaitingPacket) {
        let inbound = match self.interfaces.lookup(&waiting.inbound_interface) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!("Parked frame has nowhere to report to: {}", e);
                return;
            }
        };
        match EthernetFrame::from_buffer(waiting.frame, 0).and_then(Ipv4Packet::try_from) {
            Ok(packet) => {
                self.send_icmp(IcmpKind::DestHostUnreachable, &packet, inbound, inbound.ip);
            }
            Err(e) => warn!("Parked frame no longer parses: {}", e),
        }
    }

    /// Takes frames parked behind a resolved address and sends them out `inbound`, the
    /// interface the ARP reply came in on. Must be called without the cache lock.
    pub(crate) fn release(
        &self,
        packets: Vec<WaitingPacket>,
        mac: MacAddr,
        inbound: &Interface,
    ) -> usize {
        let mut released = 0;
        for waiting in packets {
            if waiting.egress_interface != inbound.name {
                debug!(
                    "Releasing frame routed via {} on {} instead",
                    waiting.egress_interface, inbound.name
                );
            }
            let packet = match EthernetFrame::from_buffer(waiting.frame, 0)
                .and_then(Ipv4Packet::try_from)
            {
                Ok(packet) => packet,
                Err(e) => {
                    warn!("Parked frame no longer parses: {}", e);
                    continue;
                }
            };
            if let Some(frame) = rewrite_for_next_hop(packet, inbound.mac, mac) {
                self.transmit(&frame.into_bytes(), &inbound.name);
                released += 1;
            }
        }
        released
    }

    fn integrity_ok(&self, packet: &Ipv4Packet) -> bool {
        let mut ok = true;
        if packet.version() != 4 {
            warn!(
                version = packet.version(),
                src = %packet.src_addr(),
                "IPv4 header with wrong version"
            );
            ok = false;
        }
        if !packet.validate_checksum() {
            warn!(
                checksum = packet.checksum(),
                expected = packet.calculate_checksum(),
                src = %packet.src_addr(),
                "IPv4 header checksum mismatch"
            );
            ok = false;
        }
        ok || self.config.integrity == IntegrityPolicy::Lenient
    }

    fn send_icmp(
        &self,
        kind: IcmpKind,
        offending: &Ipv4Packet,
        inbound: &Interface,
        source_ip: Ipv4Addr,
    ) -> Verdict {
        match build_icmp(kind, offending, inbound, source_ip, &self.config) {
            Some(frame) => {
                trace!(dest = %offending.src_addr(), "Sending {:?}", kind);
                self.transmit(&frame.into_bytes(), &inbound.name);
                Verdict::Icmp(kind)
            }
            None if kind.is_error() => Verdict::Dropped(DropReason::IcmpSuppressed),
            None => Verdict::Dropped(DropReason::NoResponse),
        }
    }

    pub(crate) fn transmit(&self, frame: &[u8], interface: &str) {
        if let Err(e) = self.transport.transmit(frame, interface) {
            warn!("Dropping outbound frame: {}", e);
        }
    }
}

// Parked frames were already decremented on arrival and lose one more hop here.
fn rewrite_for_next_hop(
    packet: Ipv4Packet,
    src: MacAddr,
    dest: MacAddr,
) -> Option<EthernetFrame> {
    let packet = DecIpv4HopLimit::new().process(packet)?;
    RewriteEthernet::new(src, dest).process(EthernetFrame::from(packet))
}
