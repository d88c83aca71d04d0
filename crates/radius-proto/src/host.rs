//! Generic RADIUS-capable host
//!
//! A [`Host`] binds the three service ports to a shared dictionary and hands
//! out packets pre-populated with code, identifier, secret, and dictionary.
//! Clients and servers both sit on top of it.

use crate::dictionary::Dictionary;
use crate::packet::{Code, Packet};
use std::sync::Arc;

/// Default authentication port (RFC 2865)
pub const DEFAULT_AUTH_PORT: u16 = 1812;
/// Default accounting port (RFC 2866)
pub const DEFAULT_ACCT_PORT: u16 = 1813;
/// Default dynamic-authorization port (RFC 5176)
pub const DEFAULT_COA_PORT: u16 = 3799;

/// Port bindings plus the dictionary every packet is resolved against
#[derive(Debug, Clone)]
pub struct Host {
    auth_port: u16,
    acct_port: u16,
    coa_port: u16,
    dictionary: Arc<Dictionary>,
}

impl Host {
    pub fn new(auth_port: u16, acct_port: u16, coa_port: u16, dictionary: Arc<Dictionary>) -> Self {
        Host {
            auth_port,
            acct_port,
            coa_port,
            dictionary,
        }
    }

    /// A host on the standard RADIUS ports
    pub fn with_default_ports(dictionary: Arc<Dictionary>) -> Self {
        Host::new(
            DEFAULT_AUTH_PORT,
            DEFAULT_ACCT_PORT,
            DEFAULT_COA_PORT,
            dictionary,
        )
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dictionary
    }

    pub fn auth_port(&self) -> u16 {
        self.auth_port
    }

    pub fn acct_port(&self) -> u16 {
        self.acct_port
    }

    pub fn coa_port(&self) -> u16 {
        self.coa_port
    }

    /// The service port a request code is sent to (0 for reply codes)
    pub fn port_for(&self, code: Code) -> u16 {
        match code {
            Code::AccessRequest | Code::StatusServer | Code::StatusClient => self.auth_port,
            Code::AccountingRequest => self.acct_port,
            Code::CoARequest | Code::DisconnectRequest => self.coa_port,
            _ => 0,
        }
    }

    /// Create a packet bound to this host's dictionary
    pub fn create_packet(&self, code: Code, secret: &[u8]) -> Packet {
        Packet::new(code, secret, Arc::clone(&self.dictionary))
    }

    /// Create an Access-Request
    pub fn create_auth_packet(&self, secret: &[u8]) -> Packet {
        self.create_packet(Code::AccessRequest, secret)
    }

    /// Create an Accounting-Request
    pub fn create_acct_packet(&self, secret: &[u8]) -> Packet {
        self.create_packet(Code::AccountingRequest, secret)
    }

    /// Create a CoA-Request or Disconnect-Request
    pub fn create_coa_packet(&self, code: Code, secret: &[u8]) -> Packet {
        debug_assert!(matches!(
            code,
            Code::CoARequest | Code::DisconnectRequest
        ));
        self.create_packet(code, secret)
    }

    /// Create a Status-Server probe
    pub fn create_status_packet(&self, secret: &[u8]) -> Packet {
        self.create_packet(Code::StatusServer, secret)
    }
}
