use std::io;
use thiserror::Error;

use crate::protocol::Reply;

/// Enum for client errors
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered, but not with a reply the operation accepts
    #[error("server replied {}: {}", .0.code, .0.message)]
    Reply(Reply),
    /// Any errors related to I/O on the control or data channel
    #[error("I/O: {0}")]
    Io(#[from] io::Error),
    /// TLS setup or handshake failure on the control channel
    #[error("TLS: {0}")]
    Tls(#[from] native_tls::Error),
    /// Server output that does not fit the wire grammar
    #[error("protocol: {0}")]
    Protocol(String),
    /// The operation requires an established control connection
    #[error("not connected")]
    NotConnected,
    /// `connect` was called on a session that already holds a connection
    #[error("already connected")]
    AlreadyConnected,
}

impl From<Reply> for Error {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

pub type FtpResult<T> = Result<T, Error>;
