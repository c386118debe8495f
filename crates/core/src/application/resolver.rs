// Local Host Resolver

use crate::domain::LocalHostSet;
use crate::port::HostNetwork;
use std::sync::Arc;
use tracing::debug;

/// Computes the local-host set once, before a batch starts.
///
/// Every lookup failure only omits the affected entries.
pub struct LocalHostResolver {
    network: Arc<dyn HostNetwork>,
}

impl LocalHostResolver {
    pub fn new(network: Arc<dyn HostNetwork>) -> Self {
        Self { network }
    }

    pub async fn resolve(&self) -> LocalHostSet {
        let computer_name = self.network.computer_name();
        if computer_name.is_none() {
            debug!("Computer name unavailable");
        }

        let addresses = match self.network.local_addresses().await {
            Ok(addresses) => addresses,
            Err(e) => {
                debug!(error = %e, "Local address lookup failed");
                Vec::new()
            }
        };

        let mut reverse_names = Vec::new();
        for addr in &addresses {
            match self.network.reverse_lookup(*addr).await {
                Ok(names) => reverse_names.extend(names),
                Err(e) => debug!(addr = %addr, error = %e, "Reverse lookup failed, skipping"),
            }
        }

        let set = LocalHostSet::from_parts(computer_name, addresses, reverse_names);
        debug!(entries = set.len(), "Local host set resolved");
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::local_hosts::BUILTIN_LOCAL_NAMES;
    use crate::port::host_network::mocks::StaticHostNetwork;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 7, last))
    }

    #[tokio::test]
    async fn test_resolve_merges_all_sources() {
        let network = StaticHostNetwork {
            name: Some("WKS042".to_string()),
            addresses: vec![addr(10)],
            reverse: HashMap::from([(addr(10), vec!["wks042.corp.example".to_string()])]),
            fail_addresses: false,
        };

        let set = LocalHostResolver::new(Arc::new(network)).resolve().await;

        assert!(set.contains("wks042"));
        assert!(set.contains("192.168.7.10"));
        assert!(set.contains("WKS042.corp.example"));
        assert!(set.contains("localhost"));
    }

    #[tokio::test]
    async fn test_failed_reverse_lookup_omits_only_that_address() {
        let network = StaticHostNetwork {
            name: Some("wks042".to_string()),
            addresses: vec![addr(10), addr(11)],
            reverse: HashMap::from([(addr(11), vec!["alias.corp.example".to_string()])]),
            fail_addresses: false,
        };

        let set = LocalHostResolver::new(Arc::new(network)).resolve().await;

        assert!(set.contains("192.168.7.10"));
        assert!(set.contains("alias.corp.example"));
        assert_eq!(set.len(), BUILTIN_LOCAL_NAMES.len() + 4);
    }

    #[tokio::test]
    async fn test_total_lookup_failure_falls_back_to_builtins() {
        let network = StaticHostNetwork {
            fail_addresses: true,
            ..Default::default()
        };

        let set = LocalHostResolver::new(Arc::new(network)).resolve().await;

        assert_eq!(set, LocalHostSet::builtin());
    }
}
