// TCP probe operation - reachability check per target
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpStream;
use tracing::debug;

use fanout_core::domain::{OperationError, OperationOutcome, SharedContext, Target};
use fanout_core::port::TargetOperation;

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub peer: String,
    pub port: u16,
    pub connect_ms: u64,
}

/// Opens a TCP connection to `host:port` and closes it again.
///
/// The port comes from the target when it carries one, otherwise from
/// `default_port`.
pub struct TcpProbeOperation {
    default_port: u16,
}

impl TcpProbeOperation {
    pub fn new(default_port: u16) -> Self {
        Self { default_port }
    }

    pub fn default_port(&self) -> u16 {
        self.default_port
    }
}

#[async_trait]
impl TargetOperation for TcpProbeOperation {
    type Output = ProbeReport;

    async fn run(&self, target: Target, _ctx: Arc<SharedContext>) -> OperationOutcome<ProbeReport> {
        let port = target.port().unwrap_or(self.default_port);
        let start = Instant::now();

        let stream = TcpStream::connect((target.host(), port))
            .await
            .map_err(|e| OperationError::Connect(format!("{}:{}: {}", target.host(), port, e)))?;

        let connect_ms = start.elapsed().as_millis() as u64;
        let peer = stream.peer_addr()?.to_string();
        debug!(host = %target, peer = %peer, connect_ms = connect_ms, "TCP probe connected");

        Ok(ProbeReport {
            peer,
            port,
            connect_ms,
        })
    }

    fn name(&self) -> &str {
        "tcp-probe"
    }
}
