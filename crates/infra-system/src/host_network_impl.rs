// Host network implementation
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::io;
use std::net::IpAddr;
use tracing::debug;

use fanout_core::port::HostNetwork;

/// Host identity from the operating system.
///
/// - computer name: `hostname`
/// - own addresses: resolver lookup of the computer name
/// - reverse names: the system resolver (`getnameinfo`)
#[derive(Debug, Default)]
pub struct SystemHostNetwork;

impl SystemHostNetwork {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostNetwork for SystemHostNetwork {
    fn computer_name(&self) -> Option<String> {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .filter(|name| !name.is_empty())
    }

    async fn local_addresses(&self) -> io::Result<Vec<IpAddr>> {
        let name = self
            .computer_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "computer name unavailable"))?;

        let mut addresses = BTreeSet::new();
        for addr in tokio::net::lookup_host((name.as_str(), 0)).await? {
            addresses.insert(addr.ip());
        }
        debug!(host = %name, count = addresses.len(), "Resolved own addresses");
        Ok(addresses.into_iter().collect())
    }

    async fn reverse_lookup(&self, addr: IpAddr) -> io::Result<Vec<String>> {
        let name = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr))
            .await
            .map_err(io::Error::other)??;

        // getnameinfo falls back to the numeric form when no name exists
        match normalize_reverse_name(&name, addr) {
            Some(name) => Ok(vec![name]),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no reverse name for {}", addr),
            )),
        }
    }
}

/// Strip the trailing dot; `None` when the resolver only echoed the address
fn normalize_reverse_name(name: &str, addr: IpAddr) -> Option<String> {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() || name.parse::<IpAddr>().is_ok_and(|parsed| parsed == addr) {
        return None;
    }
    Some(name.to_string())
}
