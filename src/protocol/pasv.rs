use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;

static HOST_PORT_GROUPS: OnceLock<Regex> = OnceLock::new();

/// Extracts the data-channel endpoint from a 227 reply message.
///
/// The message carries six comma-separated byte fields `h1,h2,h3,h4,p1,p2`,
/// usually but not always wrapped in parentheses. The first four form the
/// IPv4 address, the last two the port as `p1 * 256 + p2`.
pub(crate) fn parse_passive_endpoint(message: &str) -> Result<SocketAddr, Error> {
    let groups = HOST_PORT_GROUPS
        .get_or_init(|| Regex::new(r"(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)").expect("valid pattern"));

    let captures = groups
        .captures(message)
        .ok_or_else(|| Error::Protocol(format!("no host and port groups in PASV reply: {message}")))?;

    let mut fields = [0u8; 6];
    for (index, field) in fields.iter_mut().enumerate() {
        *field = captures[index + 1].parse().map_err(|_| {
            Error::Protocol(format!("PASV field out of range: {}", &captures[index + 1]))
        })?;
    }

    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = u16::from(fields[4]) * 256 + u16::from(fields[5]);

    Ok(SocketAddr::new(IpAddr::V4(ip), port))
}
