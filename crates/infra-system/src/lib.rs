// fanout Infrastructure - System Adapters
// Implements: TargetOperation (command, TCP probe), HostNetwork

pub mod command_operation;
pub mod host_network_impl;
pub mod tcp_probe;

pub use command_operation::{CommandOperation, CommandOutput};
pub use host_network_impl::SystemHostNetwork;
pub use tcp_probe::{ProbeReport, TcpProbeOperation};
