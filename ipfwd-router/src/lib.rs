//! The forwarding plane of a small IPv4 router.
//!
//! A [`Router`] takes raw Ethernet frames tagged with the interface they arrived on and
//! answers ARP, replies to pings, forwards along the longest matching route, resolves next
//! hops with ARP (parking frames until they resolve) and reports failures with ICMP. Every
//! outgoing frame goes through a [`Transport`]. An [`ArpSweeper`] drives ARP retries and
//! expiry in the background.

pub mod arp;
pub mod arp_cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod icmp;
pub mod interface;
pub mod processor;
pub mod route;
pub mod router;
pub mod sweeper;
pub mod transport;

pub use crate::arp_cache::{ArpCache, ArpEntry, PendingRequest, RetryAction, WaitingPacket};
pub use crate::config::{IntegrityPolicy, RouterConfig};
pub use crate::error::{Result, RouterError};
pub use crate::icmp::IcmpKind;
pub use crate::interface::{Interface, InterfaceTable};
pub use crate::route::{RouteEntry, RoutingTable};
pub use crate::router::{DropReason, Router, Verdict};
pub use crate::sweeper::{ArpSweeper, SweepHandle};
pub use crate::transport::{ChannelTransport, InboundFrame, OutboundFrame, Transport};
