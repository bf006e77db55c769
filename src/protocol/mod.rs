mod command;
mod listing;
mod pasv;
mod reply;

pub use self::{
    command::{Command, TransferType},
    listing::{parse_listing, DirectoryEntry},
    reply::{Reply, ReplyKind},
};

pub(crate) use self::{
    pasv::parse_passive_endpoint,
    reply::{parse_continuation_line, parse_lead_line},
};

/// Port the control channel dials when none is configured
pub const DEFAULT_PORT: u16 = 21;
