//! Longest-prefix-match CIDR trie
//!
//! Operator-configured overrides take precedence over GeoIP database
//! lookups, so this is checked first in `geo::resolver::GeoResolver`.
//! Backed by a flat `Vec<CidrMapping>` rather than a real trie structure —
//! override lists are small (tens to low hundreds of entries), so a linear
//! scan picking the most specific match is simpler than a trie and fast
//! enough.

use std::net::IpAddr;

use ipnetwork::IpNetwork;

/// Where a `CidrMapping` came from: loaded from the on-disk config, or
/// added at runtime through an operator-facing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOrigin {
    Config,
    RuntimeApi,
}

/// A single CIDR-to-region override entry
#[derive(Debug, Clone, PartialEq)]
pub struct CidrMapping {
    pub prefix: IpNetwork,
    pub region: String,
    pub comment: String,
    pub origin: MappingOrigin,
}

impl CidrMapping {
    pub fn new(prefix: IpNetwork, region: impl Into<String>) -> Self {
        CidrMapping {
            prefix,
            region: region.into(),
            comment: String::new(),
            origin: MappingOrigin::RuntimeApi,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_origin(mut self, origin: MappingOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// A static table mapping CIDR blocks to region names, searched by longest
/// matching prefix.
pub struct CidrTrie {
    entries: Vec<CidrMapping>,
}

impl CidrTrie {
    pub fn new() -> Self {
        CidrTrie {
            entries: Vec::new(),
        }
    }

    /// Convenience wrapper over `add` for a bare prefix/region pair.
    pub fn insert(&mut self, network: IpNetwork, region: impl Into<String>) {
        self.add(CidrMapping::new(network, region));
    }

    /// Add a mapping. A mapping with an already-present prefix upserts.
    pub fn add(&mut self, mapping: CidrMapping) {
        if let Some(existing) = self.entries.iter_mut().find(|m| m.prefix == mapping.prefix) {
            *existing = mapping;
        } else {
            self.entries.push(mapping);
        }
    }

    /// Remove the mapping with this exact prefix. Returns `true` if a
    /// mapping was removed.
    pub fn remove(&mut self, prefix: IpNetwork) -> bool {
        let before = self.entries.len();
        self.entries.retain(|m| m.prefix != prefix);
        self.entries.len() != before
    }

    /// Atomically replace the entire mapping set, e.g. on config reload.
    pub fn load_from_config(&mut self, mappings: Vec<CidrMapping>) {
        self.entries = mappings;
    }

    /// All mappings, lexicographically sorted by prefix.
    pub fn list(&self) -> Vec<CidrMapping> {
        let mut out = self.entries.clone();
        out.sort_by(|a, b| a.prefix.to_string().cmp(&b.prefix.to_string()));
        out
    }

    /// The region for the most specific (longest-prefix) network containing
    /// `address`, or `None` if no entry matches.
    pub fn lookup(&self, address: IpAddr) -> Option<&str> {
        self.entries
            .iter()
            .filter(|m| m.prefix.contains(address))
            .max_by_key(|m| m.prefix.prefix())
            .map(|m| m.region.as_str())
    }
}

impl Default for CidrTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn most_specific_prefix_wins() {
        let mut trie = CidrTrie::new();
        trie.insert("10.0.0.0/8".parse().unwrap(), "broad");
        trie.insert("10.1.0.0/16".parse().unwrap(), "narrow");

        let addr = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(trie.lookup(addr), Some("narrow"));
    }

    #[test]
    fn no_match_returns_none() {
        let trie = CidrTrie::new();
        assert_eq!(trie.lookup(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1))), None);
    }

    #[test]
    fn add_upserts_existing_prefix() {
        let mut trie = CidrTrie::new();
        let prefix: IpNetwork = "10.0.0.0/8".parse().unwrap();
        trie.add(CidrMapping::new(prefix, "first"));
        trie.add(CidrMapping::new(prefix, "second"));

        assert_eq!(trie.list().len(), 1);
        assert_eq!(trie.lookup(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))), Some("second"));
    }

    #[test]
    fn remove_drops_exact_prefix_only() {
        let mut trie = CidrTrie::new();
        trie.insert("10.0.0.0/8".parse().unwrap(), "broad");
        trie.insert("10.1.0.0/16".parse().unwrap(), "narrow");

        assert!(!trie.remove("10.2.0.0/16".parse().unwrap()));
        assert!(trie.remove("10.1.0.0/16".parse().unwrap()));

        let addr = IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3));
        assert_eq!(trie.lookup(addr), Some("broad"));
    }

    #[test]
    fn load_from_config_replaces_entire_set() {
        let mut trie = CidrTrie::new();
        trie.insert("10.0.0.0/8".parse().unwrap(), "old");

        trie.load_from_config(vec![CidrMapping::new("192.0.2.0/24".parse().unwrap(), "new")]);

        assert_eq!(trie.lookup(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))), None);
        assert_eq!(
            trie.lookup(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))),
            Some("new")
        );
    }

    #[test]
    fn list_is_sorted_lexicographically_by_prefix() {
        let mut trie = CidrTrie::new();
        trie.insert("192.0.2.0/24".parse().unwrap(), "b");
        trie.insert("10.0.0.0/8".parse().unwrap(), "a");

        let prefixes: Vec<String> = trie.list().into_iter().map(|m| m.prefix.to_string()).collect();
        let mut sorted = prefixes.clone();
        sorted.sort();
        assert_eq!(prefixes, sorted);
    }
}
