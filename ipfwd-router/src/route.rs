use crate::error::{Result, RouterError};
use crate::interface::strip_comment;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub interface: String,
}

impl RouteEntry {
    pub fn new<S: Into<String>>(
        destination: Ipv4Addr,
        gateway: Ipv4Addr,
        mask: Ipv4Addr,
        interface: S,
    ) -> Self {
        RouteEntry {
            destination,
            gateway,
            mask,
            interface: interface.into(),
        }
    }

    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        mask & u32::from(addr) == mask & u32::from(self.destination)
    }

    /// Number of set bits in the mask. Non-contiguous masks are counted the same way.
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).count_ones()
    }

    /// The address to resolve when sending `dest` along this route. A `0.0.0.0` gateway
    /// marks a directly connected network, so the destination itself is the next hop.
    pub fn next_hop(&self, dest: Ipv4Addr) -> Ipv4Addr {
        if self.gateway.is_unspecified() {
            dest
        } else {
            self.gateway
        }
    }
}

/// The static routing table, in the order the routes were given.
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        RoutingTable { entries }
    }

    /// Picks the matching route with the longest mask. Among equally long masks the first
    /// entry in the table wins.
    pub fn longest_prefix_match(&self, dest: Ipv4Addr) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;
        for entry in self.entries.iter().filter(|entry| entry.matches(dest)) {
            match best {
                Some(current) if current.prefix_len() >= entry.prefix_len() => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads `destination gateway mask interface` lines, e.g.
    /// `10.0.0.0 192.0.2.254 255.0.0.0 eth0`. Blank lines and anything after a `#` are
    /// ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = vec![];
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let fields: Vec<&str> = strip_comment(&line).split_whitespace().collect();
            match fields.as_slice() {
                [] => continue,
                [destination, gateway, mask, interface] => entries.push(RouteEntry::new(
                    parse_addr(line_no, destination)?,
                    parse_addr(line_no, gateway)?,
                    parse_addr(line_no, mask)?,
                    *interface,
                )),
                _ => {
                    return Err(RouterError::config(
                        line_no,
                        format!(
                            "expected `destination gateway mask interface`, found {} fields",
                            fields.len()
                        ),
                    ))
                }
            }
        }
        Ok(RoutingTable { entries })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        RoutingTable::from_reader(BufReader::new(file))
    }
}

fn parse_addr(line_no: usize, field: &str) -> Result<Ipv4Addr> {
    field
        .parse::<Ipv4Addr>()
        .map_err(|_| RouterError::config(line_no, format!("invalid IPv4 address {:?}", field)))
}
