//! Known-host table
//!
//! RFC 2865 Section 3: a server silently discards datagrams from sources it
//! shares no secret with. The table maps remote IPs to their secret and a
//! display name; entries may be exact addresses or CIDR networks. Lookups
//! happen on every received datagram, so exact entries sit in a concurrent
//! map and network entries in a read-mostly list.

use dashmap::DashMap;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::RwLock;

/// Secret and name for one known RADIUS peer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEntry {
    pub secret: String,
    pub name: String,
}

impl HostEntry {
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

/// Maps remote IP addresses to shared secrets
///
/// Populated at startup or dynamically by the embedder; shareable behind an
/// `Arc` across all server sockets.
#[derive(Debug, Default)]
pub struct HostTable {
    exact: DashMap<IpAddr, HostEntry>,
    networks: RwLock<Vec<(IpNetwork, HostEntry)>>,
}

impl HostTable {
    pub fn new() -> Self {
        HostTable::default()
    }

    /// Register a single peer address
    pub fn register_host(&self, ip: IpAddr, secret: impl Into<String>, name: impl Into<String>) {
        self.exact.insert(
            ip,
            HostEntry {
                secret: secret.into(),
                name: name.into(),
            },
        );
    }

    /// Register a CIDR range of peers sharing one secret
    pub fn register_network(
        &self,
        network: IpNetwork,
        secret: impl Into<String>,
        name: impl Into<String>,
    ) {
        self.networks.write().expect("host table lock poisoned").push((
            network,
            HostEntry {
                secret: secret.into(),
                name: name.into(),
            },
        ));
    }

    /// Forget a single peer address
    pub fn remove_host(&self, ip: &IpAddr) -> bool {
        self.exact.remove(ip).is_some()
    }

    /// Find the entry for a source address: exact match first, then the
    /// first covering network
    pub fn resolve(&self, ip: IpAddr) -> Option<HostEntry> {
        if let Some(entry) = self.exact.get(&ip) {
            return Some(entry.value().clone());
        }
        self.networks
            .read()
            .expect("host table lock poisoned")
            .iter()
            .find(|(network, _)| network.contains(ip))
            .map(|(_, entry)| entry.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self
                .networks
                .read()
                .expect("host table lock poisoned")
                .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_entries_win_over_networks() {
        let table = HostTable::new();
        table.register_network("10.0.0.0/8".parse().unwrap(), "netsecret", "lab");
        table.register_host("10.0.0.5".parse().unwrap(), "hostsecret", "nas-5");

        let entry = table.resolve("10.0.0.5".parse().unwrap()).unwrap();
        assert_eq!(entry.secret, "hostsecret");
        assert_eq!(entry.name, "nas-5");

        let entry = table.resolve("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(entry.secret, "netsecret");
    }

    #[test]
    fn unknown_sources_resolve_to_none() {
        let table = HostTable::new();
        table.register_host("192.0.2.1".parse().unwrap(), "s", "nas");
        assert!(table.resolve("192.0.2.2".parse().unwrap()).is_none());
        assert!(table.resolve("2001:db8::1".parse().unwrap()).is_none());
    }

    #[test]
    fn hosts_can_be_removed_at_runtime() {
        let table = HostTable::new();
        let ip: IpAddr = "192.0.2.1".parse().unwrap();
        table.register_host(ip, "s", "nas");
        assert!(table.resolve(ip).is_some());
        assert!(table.remove_host(&ip));
        assert!(table.resolve(ip).is_none());
        assert!(!table.remove_host(&ip));
    }
}
