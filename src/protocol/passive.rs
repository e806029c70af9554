use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::Error;

/// Parses a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply text.
pub fn parse_pasv(text: &str) -> Result<SocketAddrV4, Error> {
    let bad = || Error::BadReply(text.to_owned());

    let start = text.find('(').ok_or_else(bad)?;
    let end = text[start..].find(')').ok_or_else(bad)? + start;

    let numbers = text[start + 1..end]
        .split(',')
        .map(|n| n.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| bad())?;

    match numbers[..] {
        [a, b, c, d, p1, p2] => Ok(SocketAddrV4::new(
            Ipv4Addr::new(a, b, c, d),
            (u16::from(p1) << 8) | u16::from(p2),
        )),
        _ => Err(bad()),
    }
}

/// Parses a `229 Entering Extended Passive Mode (|||port|)` reply text
/// into the data port.
pub fn parse_epsv(text: &str) -> Result<u16, Error> {
    let bad = || Error::BadReply(text.to_owned());

    let start = text.find('(').ok_or_else(bad)?;
    let end = text[start..].find(')').ok_or_else(bad)? + start;
    let inner = &text[start + 1..end];

    let delimiter = inner.chars().next().ok_or_else(bad)?;
    let fields = inner.split(delimiter).collect::<Vec<_>>();

    match fields[..] {
        ["", "", "", port, ""] => port.parse().map_err(|_| bad()),
        _ => Err(bad()),
    }
}
