use crate::error::{Result, RouterError};
use crossbeam::crossbeam_channel::{unbounded, Receiver, Sender};

/// Where the router's frames go. Implementations must be callable from any thread, and
/// the router never retries a failed transmit.
pub trait Transport: Send + Sync {
    fn transmit(&self, frame: &[u8], interface: &str) -> Result<()>;
}

/// A frame the router sent, tagged with the interface it went out on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    pub interface: String,
    pub frame: Vec<u8>,
}

/// A frame handed to the router, tagged with the interface it arrived on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFrame {
    pub interface: String,
    pub frame: Vec<u8>,
}

impl InboundFrame {
    pub fn new<S: Into<String>>(interface: S, frame: Vec<u8>) -> Self {
        InboundFrame {
            interface: interface.into(),
            frame,
        }
    }
}

/// Transport that pushes every frame down a crossbeam channel. The receiving end is
/// whatever actually owns the links, or a test collecting output.
pub struct ChannelTransport {
    sender: Sender<OutboundFrame>,
}

impl ChannelTransport {
    pub fn new(sender: Sender<OutboundFrame>) -> Self {
        ChannelTransport { sender }
    }

    /// A transport along with the receiver for everything it sends.
    pub fn unbounded() -> (Self, Receiver<OutboundFrame>) {
        let (sender, receiver) = unbounded();
        (ChannelTransport::new(sender), receiver)
    }
}

impl Transport for ChannelTransport {
    fn transmit(&self, frame: &[u8], interface: &str) -> Result<()> {
        self.sender
            .send(OutboundFrame {
                interface: interface.to_string(),
                frame: frame.to_vec(),
            })
            .map_err(|_| RouterError::Transmit {
                interface: interface.to_string(),
                reason: "channel disconnected".to_string(),
            })
    }
}
