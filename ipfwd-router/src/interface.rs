use crate::error::{Result, RouterError};
use ipfwd_packets::MacAddr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::net::Ipv4Addr;
use std::path::Path;

/// One of the router's own ports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl Interface {
    pub fn new<S: Into<String>>(name: S, mac: MacAddr, ip: Ipv4Addr) -> Self {
        Interface {
            name: name.into(),
            mac,
            ip,
        }
    }
}

/// The router's interfaces, keyed by name. Read only once the router is running.
#[derive(Clone, Debug, Default)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    /// Builds a table, rejecting a name that appears twice.
    pub fn new(interfaces: Vec<Interface>) -> Result<Self> {
        let mut table = InterfaceTable::default();
        for (idx, interface) in interfaces.into_iter().enumerate() {
            table.push(idx + 1, interface)?;
        }
        Ok(table)
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }

    /// Like [`InterfaceTable::get`], for names taken from routes and parked frames that
    /// are expected to exist.
    pub fn lookup(&self, name: &str) -> Result<&Interface> {
        self.get(name).ok_or_else(|| RouterError::UnknownInterface {
            name: name.to_string(),
        })
    }

    /// The interface owning `ip`, if any. When two interfaces share an address the one
    /// listed first wins.
    pub fn by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.interfaces.iter().find(|iface| iface.ip == ip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Reads `name mac ip` lines, e.g. `eth0 02:00:00:00:00:01 192.0.2.1`. Blank lines and
    /// anything after a `#` are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = InterfaceTable::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let fields: Vec<&str> = strip_comment(&line).split_whitespace().collect();
            match fields.as_slice() {
                [] => continue,
                [name, mac, ip] => {
                    let mac = MacAddr::parse(mac).map_err(|e| RouterError::config(line_no, e))?;
                    let ip = ip.parse::<Ipv4Addr>().map_err(|_| {
                        RouterError::config(line_no, format!("invalid IPv4 address {:?}", ip))
                    })?;
                    table.push(line_no, Interface::new(*name, mac, ip))?;
                }
                _ => {
                    return Err(RouterError::config(
                        line_no,
                        format!("expected `name mac ip`, found {} fields", fields.len()),
                    ))
                }
            }
        }
        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        InterfaceTable::from_reader(BufReader::new(file))
    }

    fn push(&mut self, line_no: usize, interface: Interface) -> Result<()> {
        if self.get(&interface.name).is_some() {
            return Err(RouterError::config(
                line_no,
                format!("duplicate interface {:?}", interface.name),
            ));
        }
        self.interfaces.push(interface);
        Ok(())
    }
}

pub(crate) fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}
