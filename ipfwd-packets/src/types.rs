use std::fmt;

/// The common datatype that all packet structures share to represent their data
pub type PacketData = Vec<u8>;

/// Marker for the owned header views in this crate.
pub trait Packet: Clone + Send {}

pub const ARP_ETHER_TYPE: u16 = 0x0806;
pub const IPV4_ETHER_TYPE: u16 = 0x0800;

// Most significant byte is 0th
#[derive(Eq, Clone, Copy, Hash, PartialEq, Default)]
pub struct MacAddr {
    pub bytes: [u8; 6],
}

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr { bytes: [0xff; 6] };

    pub fn new(bytes: [u8; 6]) -> MacAddr {
        MacAddr { bytes }
    }

    /// Reads a MacAddr from the first six bytes of `bytes`, if there are that many.
    pub fn from_slice(bytes: &[u8]) -> Option<MacAddr> {
        if bytes.len() < 6 {
            return None;
        }
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes[..6]);
        Some(MacAddr::new(mac))
    }

    pub fn is_broadcast(&self) -> bool {
        *self == MacAddr::BROADCAST
    }

    /// Parses the colon separated form, e.g. `de:ad:be:ef:00:01`.
    pub fn parse(s: &str) -> Result<MacAddr, &'static str> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or("MAC address has fewer than 6 octets")?;
            if part.is_empty() || part.len() > 2 {
                return Err("MAC address octet must be 1 or 2 hex digits");
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| "MAC address octet is not hex")?;
        }
        if parts.next().is_some() {
            return Err("MAC address has more than 6 octets");
        }
        Ok(MacAddr::new(bytes))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

/// IP protocol numbers this router cares about. Everything else is carried as `Other`.
#[derive(Eq, Clone, Copy, Debug, Hash, PartialEq)]
pub enum IpProtocol {
    ICMP,
    TCP,
    UDP,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(protocol: u8) -> IpProtocol {
        match protocol {
            1 => IpProtocol::ICMP,
            6 => IpProtocol::TCP,
            17 => IpProtocol::UDP,
            other => IpProtocol::Other(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(protocol: IpProtocol) -> u8 {
        match protocol {
            IpProtocol::ICMP => 1,
            IpProtocol::TCP => 6,
            IpProtocol::UDP => 17,
            IpProtocol::Other(other) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mac() {
        let mac = MacAddr::parse("de:ad:be:ef:0:1").unwrap();
        assert_eq!(mac, MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]));
        assert_eq!(mac.to_string(), "de:ad:be:ef:00:01");
    }

    #[test]
    fn parse_mac_rejects_garbage() {
        assert!(MacAddr::parse("de:ad:be:ef:00").is_err());
        assert!(MacAddr::parse("de:ad:be:ef:00:01:02").is_err());
        assert!(MacAddr::parse("de:ad:be:ef:00:zz").is_err());
        assert!(MacAddr::parse("de:ad:be:ef::01").is_err());
    }

    #[test]
    fn broadcast() {
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(!MacAddr::default().is_broadcast());
    }

    #[test]
    fn protocol_numbers() {
        assert_eq!(IpProtocol::from(1), IpProtocol::ICMP);
        assert_eq!(IpProtocol::from(17), IpProtocol::UDP);
        assert_eq!(IpProtocol::from(89), IpProtocol::Other(89));
        assert_eq!(u8::from(IpProtocol::TCP), 6);
    }
}
