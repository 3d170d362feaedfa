//! Network kinds and `host:port` addresses.
//!
//! Addresses take the form `host:port`, where a
//! literal IPv6 host must be enclosed in square
//! brackets, as in `[::1]:4150` or `[fe80::1%eth0]:80`.

use crate::error::{NetError, Result};
use std::fmt;
use std::str::FromStr;

/// Network kind accepted by the dialer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
}

impl Network {
    pub fn parse(network: &str) -> Result<Self> {
        match network {
            "tcp" => Ok(Self::Tcp),
            other => Err(NetError::UnsupportedNetwork(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
        }
    }
}

impl FromStr for Network {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn invalid(address: &str, reason: &'static str) -> NetError {
    NetError::InvalidAddress {
        address: address.to_string(),
        reason,
    }
}

/// Split `host:port` into its host and port parts.
///
/// The brackets around an IPv6 host are stripped.
/// The port is returned verbatim, it may be a
/// service name as well as a number.
pub fn split_host_port(address: &str) -> Result<(&str, &str)> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| invalid(address, "missing ']' in address"))?;
        let host = &rest[..end];
        let port = rest[end + 1..]
            .strip_prefix(':')
            .ok_or_else(|| invalid(address, "missing port in address"))?;
        (host, port)
    } else {
        let colon = address
            .rfind(':')
            .ok_or_else(|| invalid(address, "missing port in address"))?;
        let host = &address[..colon];
        if host.contains(':') {
            return Err(invalid(address, "too many colons in address"));
        }
        (host, &address[colon + 1..])
    };
    if host.contains(['[', ']']) || port.contains(['[', ']']) {
        return Err(invalid(address, "unexpected bracket in address"));
    }
    if port.contains(':') {
        return Err(invalid(address, "too many colons in address"));
    }
    Ok((host, port))
}

/// Combine a host and a port into `host:port`,
/// bracketing the host if it contains a colon.
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Split an address and parse its port as a number.
pub(crate) fn host_and_port(address: &str) -> Result<(&str, u16)> {
    let (host, port) = split_host_port(address)?;
    let port = port
        .parse::<u16>()
        .map_err(|_| invalid(address, "invalid port"))?;
    Ok((host, port))
}
