// Target Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a DNS name
const MAX_HOST_LEN: usize = 253;

/// One endpoint an operation is executed against.
///
/// The host is opaque to the engine: a computer name, FQDN or address. The
/// optional port and session are per-target overrides consumed by the
/// operation body. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<String>,
}

impl Target {
    /// Create a target for a host with no overrides
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            session: None,
        }
    }

    /// Override the port the operation should connect to
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Override the session (remote configuration name) used for this target
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) if self.host.contains(':') => write!(f, "[{}]:{}", self.host, port),
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

/// Parses `host`, `host:port`, `[v6-addr]:port` and bare IPv6 addresses.
impl FromStr for Target {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::InvalidTarget("empty target".to_string()));
        }

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                DomainError::InvalidTarget(format!("unterminated '[' in '{}'", s))
            })?;
            let port = match tail {
                "" => None,
                t => Some(parse_port(s, t.strip_prefix(':').unwrap_or(t))?),
            };
            (host, port)
        } else if s.matches(':').count() == 1 {
            let (host, port) = s.split_once(':').unwrap_or((s, ""));
            (host, Some(parse_port(s, port)?))
        } else {
            // No colon, or several (bare IPv6 literal)
            (s, None)
        };

        if host.is_empty() {
            return Err(DomainError::InvalidTarget(format!("missing host in '{}'", s)));
        }
        if host.len() > MAX_HOST_LEN {
            return Err(DomainError::InvalidTarget(format!(
                "host too long ({} > {} bytes)",
                host.len(),
                MAX_HOST_LEN
            )));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidTarget(format!(
                "host contains whitespace: '{}'",
                host
            )));
        }

        let target = Target::new(host);
        Ok(match port {
            Some(port) => target.with_port(port),
            None => target,
        })
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16> {
    port.parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| DomainError::InvalidTarget(format!("invalid port in '{}'", input)))
}
