// Shared execution context

use super::local_hosts::LocalHostSet;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;

/// Alternate identity injected into operations for remote targets
pub struct Credential {
    username: String,
    password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Read-only snapshot handed to every operation invocation.
///
/// Built once before the pool opens and shared behind an `Arc`; nothing
/// mutates it afterwards.
#[derive(Debug)]
pub struct SharedContext {
    credential: Option<Credential>,
    local_hosts: LocalHostSet,
    timeout: Duration,
    verbose: bool,
}

impl SharedContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            credential: None,
            local_hosts: LocalHostSet::builtin(),
            timeout,
            verbose: false,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_local_hosts(mut self, local_hosts: LocalHostSet) -> Self {
        self.local_hosts = local_hosts;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Credential configured by the caller; `None` means ambient identity
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Credential to inject for `host`: none for the local machine
    pub fn credential_for(&self, host: &str) -> Option<&Credential> {
        if self.local_hosts.contains(host) {
            None
        } else {
            self.credential.as_ref()
        }
    }

    pub fn is_local(&self, host: &str) -> bool {
        self.local_hosts.contains(host)
    }

    pub fn local_hosts(&self) -> &LocalHostSet {
        &self.local_hosts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
