use dns_lookup::lookup_host;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::PingError;

/// Maps a hostname or dotted-quad literal to an IPv4 address.
///
/// IPv6 literals and names with only IPv6 addresses count as unresolved.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, PingError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => Ok(v4),
            IpAddr::V6(_) => Err(PingError::HostUnresolved(host.to_string())),
        };
    }

    let addresses = lookup_host(host).map_err(|e| {
        log::debug!("Lookup of '{}' failed: {}", host, e);
        PingError::HostUnresolved(host.to_string())
    })?;

    addresses
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| PingError::HostUnresolved(host.to_string()))
}

pub async fn resolve_ipv4_async(host: &str) -> Result<Ipv4Addr, PingError> {
    let hostname = host.to_string();
    tokio::task::spawn_blocking(move || resolve_ipv4(&hostname))
        .await
        .unwrap_or_else(|e| {
            log::debug!("Lookup task for '{}' failed: {}", host, e);
            Err(PingError::HostUnresolved(host.to_string()))
        })
}
