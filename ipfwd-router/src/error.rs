use failure::Fail;
use std::io;

/// Errors surfaced at the router's boundaries: table loading, interface lookup and
/// transmission. Packet level problems never become errors, they become a
/// [`Verdict`](crate::Verdict).
#[derive(Debug, Fail)]
pub enum RouterError {
    #[fail(display = "no interface named {:?}", name)]
    UnknownInterface { name: String },

    #[fail(display = "failed to transmit on {}: {}", interface, reason)]
    Transmit { interface: String, reason: String },

    #[fail(display = "line {}: {}", line, reason)]
    Config { line: usize, reason: String },

    #[fail(display = "I/O error: {}", _0)]
    Io(#[cause] io::Error),
}

impl RouterError {
    pub(crate) fn config<S: Into<String>>(line: usize, reason: S) -> RouterError {
        RouterError::Config {
            line,
            reason: reason.into(),
        }
    }
}

impl From<io::Error> for RouterError {
    fn from(err: io::Error) -> Self {
        RouterError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
