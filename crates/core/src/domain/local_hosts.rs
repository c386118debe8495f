// Local host set - names and addresses that refer to this machine

use std::collections::BTreeSet;
use std::net::IpAddr;

/// Names that always refer to the local machine
pub const BUILTIN_LOCAL_NAMES: [&str; 5] = ["", ".", "localhost", "::1", "127.0.0.1"];

/// Set of names and addresses identifying the local machine.
///
/// Matching is case-insensitive and ignores a trailing root dot, so
/// `HOST01`, `host01` and `host01.` are the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHostSet {
    entries: BTreeSet<String>,
}

impl LocalHostSet {
    /// Set holding only the built-in loopback names
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_LOCAL_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build the full set from the computer name, own addresses and their
    /// reverse DNS names
    pub fn from_parts<N, A, R>(computer_name: Option<N>, addresses: A, reverse_names: R) -> Self
    where
        N: AsRef<str>,
        A: IntoIterator<Item = IpAddr>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut set = Self::builtin();
        if let Some(name) = computer_name {
            set.insert(name.as_ref());
        }
        for addr in addresses {
            set.insert(&addr.to_string());
        }
        for name in reverse_names {
            set.insert(name.as_ref());
        }
        set
    }

    pub fn insert(&mut self, name: &str) {
        // The root entry "." must survive normalization
        if name == "." {
            self.entries.insert(".".to_string());
            return;
        }
        self.entries.insert(normalize(name));
    }

    /// True when the host refers to this machine
    pub fn contains(&self, host: &str) -> bool {
        if host == "." {
            return self.entries.contains(".");
        }
        self.entries.contains(&normalize(host))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl Default for LocalHostSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}
