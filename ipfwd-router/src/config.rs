use std::time::Duration;

/// What to do with an IPv4 header that has the wrong version, a bad header length or a
/// checksum that does not validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrityPolicy {
    /// Log and drop the frame.
    Strict,
    /// Log and keep processing the frame as if it were valid.
    Lenient,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        IntegrityPolicy::Strict
    }
}

/// Tunables for a [`Router`](crate::Router). `RouterConfig::default()` gives the classic
/// values: ARP requests one second apart, five of them before giving up, bindings kept for
/// fifteen seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct RouterConfig {
    pub arp_retry_interval: Duration,
    pub arp_max_requests: u32,
    pub arp_entry_timeout: Duration,
    pub sweep_interval: Duration,
    pub icmp_error_ttl: u8,
    pub echo_reply_ttl: u8,
    pub integrity: IntegrityPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            arp_retry_interval: Duration::from_secs(1),
            arp_max_requests: 5,
            arp_entry_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(1),
            icmp_error_ttl: 255,
            echo_reply_ttl: 64,
            integrity: IntegrityPolicy::Strict,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        RouterConfig::default()
    }

    pub fn arp_retry_interval(self, arp_retry_interval: Duration) -> Self {
        RouterConfig {
            arp_retry_interval,
            ..self
        }
    }

    pub fn arp_max_requests(self, arp_max_requests: u32) -> Self {
        RouterConfig {
            arp_max_requests,
            ..self
        }
    }

    pub fn arp_entry_timeout(self, arp_entry_timeout: Duration) -> Self {
        RouterConfig {
            arp_entry_timeout,
            ..self
        }
    }

    pub fn sweep_interval(self, sweep_interval: Duration) -> Self {
        RouterConfig {
            sweep_interval,
            ..self
        }
    }

    pub fn icmp_error_ttl(self, icmp_error_ttl: u8) -> Self {
        RouterConfig {
            icmp_error_ttl,
            ..self
        }
    }

    pub fn echo_reply_ttl(self, echo_reply_ttl: u8) -> Self {
        RouterConfig {
            echo_reply_ttl,
            ..self
        }
    }

    pub fn integrity(self, integrity: IntegrityPolicy) -> Self {
        RouterConfig { integrity, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.arp_retry_interval, Duration::from_secs(1));
        assert_eq!(config.arp_max_requests, 5);
        assert_eq!(config.arp_entry_timeout, Duration::from_secs(15));
        assert_eq!(config.icmp_error_ttl, 255);
        assert_eq!(config.echo_reply_ttl, 64);
        assert_eq!(config.integrity, IntegrityPolicy::Strict);
    }

    #[test]
    fn setters_chain() {
        let config = RouterConfig::new()
            .arp_max_requests(2)
            .integrity(IntegrityPolicy::Lenient)
            .sweep_interval(Duration::from_millis(10));
        assert_eq!(config.arp_max_requests, 2);
        assert_eq!(config.integrity, IntegrityPolicy::Lenient);
        assert_eq!(config.sweep_interval, Duration::from_millis(10));
        assert_eq!(config.arp_retry_interval, Duration::from_secs(1));
    }
}
