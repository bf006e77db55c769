use std::fmt;

/// Representation types for the TYPE command (RFC 959 §3.1.1).
/// Listings are transferred as ASCII, file contents as binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

impl TransferType {
    fn code(self) -> char {
        match self {
            Self::Ascii => 'A',
            Self::Binary => 'I',
        }
    }
}

/// Commands the client issues on the control channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Pass(String),
    Type(TransferType),
    Pasv,
    List(String),
    Stor(String),
    Retr(String),
    Dele(String),
    Quit,
}

impl Command {
    /// Wire form for logging, with the password argument masked
    pub(crate) fn redacted(&self) -> String {
        match self {
            Self::Pass(_) => "PASS ****".to_owned(),
            command => command.to_string(),
        }
    }
}

/// Renders the wire form without the trailing CRLF
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(username) => write!(f, "USER {username}"),
            Self::Pass(password) => write!(f, "PASS {password}"),
            Self::Type(transfer_type) => write!(f, "TYPE {}", transfer_type.code()),
            Self::Pasv => write!(f, "PASV"),
            Self::List(path) => write!(f, "LIST {path}"),
            Self::Stor(path) => write!(f, "STOR {path}"),
            Self::Retr(path) => write!(f, "RETR {path}"),
            Self::Dele(path) => write!(f, "DELE {path}"),
            Self::Quit => write!(f, "QUIT"),
        }
    }
}
