// Host Network Port
// Identity of the machine the engine runs on

use async_trait::async_trait;
use std::io;
use std::net::IpAddr;

/// Lookups needed to recognise the local machine among targets
#[async_trait]
pub trait HostNetwork: Send + Sync {
    /// Computer name of this machine, if it can be determined
    fn computer_name(&self) -> Option<String>;

    /// Addresses assigned to this machine
    async fn local_addresses(&self) -> io::Result<Vec<IpAddr>>;

    /// Reverse DNS names for one address
    async fn reverse_lookup(&self, addr: IpAddr) -> io::Result<Vec<String>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;

    /// Fixed answers; addresses missing from `reverse` fail their lookup
    #[derive(Default)]
    pub struct StaticHostNetwork {
        pub name: Option<String>,
        pub addresses: Vec<IpAddr>,
        pub reverse: HashMap<IpAddr, Vec<String>>,
        pub fail_addresses: bool,
    }

    #[async_trait]
    impl HostNetwork for StaticHostNetwork {
        fn computer_name(&self) -> Option<String> {
            self.name.clone()
        }

        async fn local_addresses(&self) -> io::Result<Vec<IpAddr>> {
            if self.fail_addresses {
                return Err(io::Error::other("resolver unavailable"));
            }
            Ok(self.addresses.clone())
        }

        async fn reverse_lookup(&self, addr: IpAddr) -> io::Result<Vec<String>> {
            self.reverse
                .get(&addr)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no PTR record"))
        }
    }
}
