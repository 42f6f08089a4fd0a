//! IPv4 to Ethernet address bindings, plus the resolutions still in flight and the frames
//! parked behind them.
//!
//! The cache is plain data. The [`Router`](crate::Router) owns it behind a mutex and performs
//! every side effect (ARP requests, ICMP errors, releasing frames) itself, using
//! [`PendingRequest::poll`] to decide what a request needs next.

use ipfwd_packets::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// A resolved binding. Lookups hand out copies, so holding one never pins the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub added: Instant,
}

/// A frame waiting for its next hop to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitingPacket {
    /// The frame as parked, its TTL already decremented once.
    pub frame: Vec<u8>,
    /// Interface the route selected.
    pub egress_interface: String,
    /// Interface the frame arrived on, where any ICMP error about it goes.
    pub inbound_interface: String,
}

/// What a pending request needs next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryAction {
    /// The last ARP request is too recent.
    Wait,
    /// Broadcast another ARP request.
    SendRequest,
    /// Out of retries: answer every waiting frame with host unreachable and forget it.
    Abandon,
}

#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub ip: Ipv4Addr,
    pub last_sent: Option<Instant>,
    pub times_sent: u32,
    pub packets: Vec<WaitingPacket>,
}

impl PendingRequest {
    pub fn new(ip: Ipv4Addr) -> Self {
        PendingRequest {
            ip,
            last_sent: None,
            times_sent: 0,
            packets: vec![],
        }
    }

    pub fn poll(&self, now: Instant, interval: Duration, max_requests: u32) -> RetryAction {
        if let Some(last_sent) = self.last_sent {
            if now.saturating_duration_since(last_sent) < interval {
                return RetryAction::Wait;
            }
        }
        if self.times_sent >= max_requests {
            RetryAction::Abandon
        } else {
            RetryAction::SendRequest
        }
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
        self.times_sent += 1;
    }

    /// Egress interface of the oldest waiting frame, which is where requests are sent.
    pub fn egress_interface(&self) -> Option<&str> {
        self.packets
            .first()
            .map(|packet| packet.egress_interface.as_str())
    }
}

#[derive(Debug)]
pub struct ArpCache {
    entries: HashMap<Ipv4Addr, ArpEntry>,
    requests: HashMap<Ipv4Addr, PendingRequest>,
    entry_timeout: Duration,
}

impl ArpCache {
    pub fn new(entry_timeout: Duration) -> Self {
        ArpCache {
            entries: HashMap::new(),
            requests: HashMap::new(),
            entry_timeout,
        }
    }

    /// A copy of the binding for `ip`, unless there is none or it has outlived the entry
    /// timeout.
    pub fn lookup(&self, ip: Ipv4Addr, now: Instant) -> Option<ArpEntry> {
        self.entries
            .get(&ip)
            .filter(|entry| !self.is_expired(entry, now))
            .copied()
    }

    /// Records `ip` at `mac`, refreshing any existing binding. Any pending request for `ip`
    /// is removed and handed back so its frames can be released.
    pub fn insert(&mut self, mac: MacAddr, ip: Ipv4Addr, now: Instant) -> Option<PendingRequest> {
        self.entries.insert(
            ip,
            ArpEntry {
                ip,
                mac,
                added: now,
            },
        );
        self.requests.remove(&ip)
    }

    /// Parks `packet` behind the request for `ip`, starting one if needed.
    pub fn enqueue(&mut self, ip: Ipv4Addr, packet: WaitingPacket) -> &mut PendingRequest {
        let request = self
            .requests
            .entry(ip)
            .or_insert_with(|| PendingRequest::new(ip));
        request.packets.push(packet);
        request
    }

    pub fn request(&self, ip: Ipv4Addr) -> Option<&PendingRequest> {
        self.requests.get(&ip)
    }

    pub fn request_mut(&mut self, ip: Ipv4Addr) -> Option<&mut PendingRequest> {
        self.requests.get_mut(&ip)
    }

    /// Removes the request for `ip`, handing its waiting frames to the caller.
    pub fn destroy(&mut self, ip: Ipv4Addr) -> Option<PendingRequest> {
        self.requests.remove(&ip)
    }

    pub fn pending_ips(&self) -> Vec<Ipv4Addr> {
        self.requests.keys().copied().collect()
    }

    /// Drops every binding older than the entry timeout, returning how many went.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let timeout = self.entry_timeout;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.added) < timeout);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &ArpEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.added) >= self.entry_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(15);
    const SECOND: Duration = Duration::from_secs(1);

    fn waiting(tag: u8) -> WaitingPacket {
        WaitingPacket {
            frame: vec![tag; 20],
            egress_interface: "eth1".to_string(),
            inbound_interface: "eth0".to_string(),
        }
    }

    #[test]
    fn lookup_respects_timeout() {
        let start = Instant::now();
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let mac = MacAddr::new([2, 0, 0, 0, 0, 2]);
        let mut cache = ArpCache::new(TIMEOUT);

        assert!(cache.lookup(ip, start).is_none());
        assert!(cache.insert(mac, ip, start).is_none());
        assert_eq!(cache.lookup(ip, start + SECOND).map(|e| e.mac), Some(mac));
        assert!(cache.lookup(ip, start + TIMEOUT).is_none());

        assert_eq!(cache.purge_expired(start + SECOND), 0);
        assert_eq!(cache.purge_expired(start + TIMEOUT), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_refreshes_binding() {
        let start = Instant::now();
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let mut cache = ArpCache::new(TIMEOUT);
        cache.insert(MacAddr::new([2, 0, 0, 0, 0, 2]), ip, start);
        cache.insert(MacAddr::new([2, 0, 0, 0, 0, 3]), ip, start + 10 * SECOND);

        let entry = cache.lookup(ip, start + TIMEOUT).unwrap();
        assert_eq!(entry.mac, MacAddr::new([2, 0, 0, 0, 0, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn enqueue_extends_one_request() {
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let mut cache = ArpCache::new(TIMEOUT);
        cache.enqueue(ip, waiting(1));
        let request = cache.enqueue(ip, waiting(2));
        assert_eq!(request.packets.len(), 2);
        assert_eq!(request.times_sent, 0);
        assert!(request.last_sent.is_none());
        assert_eq!(cache.pending_ips(), vec![ip]);
    }

    #[test]
    fn reply_hands_back_request_in_order() {
        let now = Instant::now();
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let mut cache = ArpCache::new(TIMEOUT);
        for tag in 0..3 {
            cache.enqueue(ip, waiting(tag));
        }
        let request = cache
            .insert(MacAddr::new([2, 0, 0, 0, 0, 2]), ip, now)
            .unwrap();
        let tags: Vec<u8> = request.packets.iter().map(|p| p.frame[0]).collect();
        assert_eq!(tags, vec![0, 1, 2]);
        assert!(cache.request(ip).is_none());
    }

    #[test]
    fn destroy() {
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        let mut cache = ArpCache::new(TIMEOUT);
        cache.enqueue(ip, waiting(1));
        assert_eq!(cache.destroy(ip).map(|r| r.packets.len()), Some(1));
        assert!(cache.destroy(ip).is_none());
        assert!(cache.pending_ips().is_empty());
    }

    #[test]
    fn poll_schedule() {
        let start = Instant::now();
        let mut request = PendingRequest::new(Ipv4Addr::new(10, 0, 0, 2));

        assert_eq!(request.poll(start, SECOND, 5), RetryAction::SendRequest);
        request.mark_sent(start);
        assert_eq!(
            request.poll(start + SECOND / 2, SECOND, 5),
            RetryAction::Wait
        );

        let mut now = start;
        for _ in 1..5 {
            now += SECOND;
            assert_eq!(request.poll(now, SECOND, 5), RetryAction::SendRequest);
            request.mark_sent(now);
        }
        assert_eq!(request.times_sent, 5);
        assert_eq!(request.poll(now, SECOND, 5), RetryAction::Wait);
        assert_eq!(request.poll(now + SECOND, SECOND, 5), RetryAction::Abandon);
    }

    #[test]
    fn egress_interface_is_first_waiting_packet() {
        let mut request = PendingRequest::new(Ipv4Addr::new(10, 0, 0, 2));
        assert!(request.egress_interface().is_none());
        request.packets.push(waiting(1));
        let mut other = waiting(2);
        other.egress_interface = "eth2".to_string();
        request.packets.push(other);
        assert_eq!(request.egress_interface(), Some("eth1"));
    }
}
