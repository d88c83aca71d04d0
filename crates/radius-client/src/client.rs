use radius_proto::packet::consts;
use radius_proto::{AttrKey, Code, DecodeError, Dictionary, EncodeError, Host, Packet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("no usable address for `{0}`")]
    NoHostFound(String),
    #[error("no valid reply within the retransmission budget")]
    Timeout,
    #[error("bad reply: {reason}")]
    BadReply { reason: &'static str },
    #[error("packet code {0:?} is not a client request")]
    NotARequest(Code),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// RADIUS server hostname or IP address
    pub server: String,
    /// Authentication port
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    /// Accounting port
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,
    /// Dynamic-authorization (CoA/Disconnect) port
    #[serde(default = "default_coa_port")]
    pub coa_port: u16,
    /// Shared secret for this server
    pub secret: String,
    /// Seconds to wait for a reply before retransmitting
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total transmission attempts per request
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_auth_port() -> u16 {
    radius_proto::host::DEFAULT_AUTH_PORT
}

fn default_acct_port() -> u16 {
    radius_proto::host::DEFAULT_ACCT_PORT
}

fn default_coa_port() -> u16 {
    radius_proto::host::DEFAULT_COA_PORT
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_retries() -> u32 {
    3
}

impl ClientSettings {
    pub fn new(server: impl Into<String>, secret: impl Into<String>) -> Self {
        ClientSettings {
            server: server.into(),
            auth_port: default_auth_port(),
            acct_port: default_acct_port(),
            coa_port: default_coa_port(),
            secret: secret.into(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
        }
    }
}

/// A RADIUS client for one server
///
/// `send_packet` blocks its caller until a verified reply arrives or the
/// retransmission budget runs out. Independent transactions may run
/// concurrently; identifier allocation is the only synchronized state.
pub struct Client {
    settings: ClientSettings,
    host: Host,
    secret: Vec<u8>,
    timeout: Duration,
    /// Wrapping 8-bit counters, one per destination port
    identifiers: Mutex<HashMap<u16, u8>>,
}

impl Client {
    pub fn new(settings: ClientSettings, dictionary: Arc<Dictionary>) -> Self {
        let host = Host::new(
            settings.auth_port,
            settings.acct_port,
            settings.coa_port,
            dictionary,
        );
        let secret = settings.secret.clone().into_bytes();
        let timeout = Duration::from_secs(settings.timeout_secs);
        Client {
            settings,
            host,
            secret,
            timeout,
            identifiers: Mutex::new(HashMap::new()),
        }
    }

    /// Override the per-attempt timeout; useful for tests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Create an Access-Request bound to this client's secret and dictionary
    pub fn create_auth_packet(&self) -> Packet {
        self.host.create_auth_packet(&self.secret)
    }

    /// Create an Accounting-Request
    pub fn create_acct_packet(&self) -> Packet {
        self.host.create_acct_packet(&self.secret)
    }

    /// Create a CoA-Request or Disconnect-Request
    pub fn create_coa_packet(&self, code: Code) -> Packet {
        self.host.create_coa_packet(code, &self.secret)
    }

    /// Create a Status-Server probe
    pub fn create_status_packet(&self) -> Packet {
        self.host.create_status_packet(&self.secret)
    }

    /// Allocate the next identifier for a destination port
    ///
    /// A wrapping 8-bit counter seeded randomly per port; a retry reuses
    /// the identifier it got here, so consecutive transactions never
    /// collide until the counter laps.
    fn next_identifier(&self, port: u16) -> u8 {
        let mut identifiers = self.identifiers.lock().expect("identifier lock poisoned");
        let counter = identifiers
            .entry(port)
            .or_insert_with(|| rand::rng().random());
        *counter = counter.wrapping_add(1);
        *counter
    }

    /// Send a request and wait for a verified reply
    ///
    /// Transmits up to `retries` times, `timeout` per attempt. Datagrams
    /// that fail to decode, carry the wrong identifier, or fail
    /// authenticator verification are discarded silently without consuming
    /// the attempt. Returns the decoded reply or [`ClientError::Timeout`].
    pub async fn send_packet(&self, packet: &mut Packet) -> Result<Packet, ClientError> {
        let port = self.host.port_for(packet.code);
        if port == 0 {
            return Err(ClientError::NotARequest(packet.code));
        }

        let target = (self.settings.server.as_str(), port);
        let addr = tokio::net::lookup_host(target)
            .await?
            .next()
            .ok_or_else(|| ClientError::NoHostFound(self.settings.server.clone()))?;

        let bind_addr: SocketAddr = if addr.is_ipv4() {
            "0.0.0.0:0".parse().expect("literal address")
        } else {
            "[::]:0".parse().expect("literal address")
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        // Connecting lets the kernel discard datagrams from other sources
        socket.connect(addr).await?;

        packet.identifier = self.next_identifier(port);
        let mut wire = packet.encode_request()?;
        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];

        for attempt in 0..self.settings.retries.max(1) {
            if attempt > 0 && packet.code == Code::AccountingRequest {
                // Tell the server how long this request has been queued;
                // the hashed authenticator is recomputed by encode_request.
                bump_acct_delay(packet, self.timeout.as_secs() as u32);
                wire = packet.encode_request()?;
            }

            socket.send(&wire).await?;
            debug!(
                attempt,
                identifier = packet.identifier,
                server = %addr,
                code = ?packet.code,
                "transmitted request"
            );

            let deadline = Instant::now() + self.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                let len = match tokio::time::timeout(remaining, socket.recv(&mut buf)).await {
                    Err(_) => break,
                    Ok(Err(error)) => return Err(ClientError::Io(error)),
                    Ok(Ok(len)) => len,
                };

                match Packet::decode(&buf[..len], &self.secret, self.host.dictionary()) {
                    Ok(reply) if packet.verify_reply(&reply) => {
                        debug!(
                            identifier = reply.identifier,
                            code = ?reply.code,
                            "verified reply"
                        );
                        return Ok(reply);
                    }
                    Ok(reply) => {
                        debug!(
                            identifier = reply.identifier,
                            expected = packet.identifier,
                            "discarding non-matching datagram"
                        );
                    }
                    Err(error) => {
                        debug!(%error, "discarding undecodable datagram");
                    }
                }
            }
        }

        Err(ClientError::Timeout)
    }
}

/// Add the elapsed retransmission delay to Acct-Delay-Time (RFC 2866 5.2)
fn bump_acct_delay(packet: &mut Packet, seconds: u32) {
    let key = AttrKey::standard(consts::ACCT_DELAY_TIME);
    let current = packet
        .raw_values(key)
        .first()
        .and_then(|value| <[u8; 4]>::try_from(*value).ok())
        .map(u32::from_be_bytes)
        .unwrap_or(0);
    packet.remove_raw(key);
    packet.add_raw(key, (current + seconds).to_be_bytes().to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(retries: u32) -> Client {
        let dict = Arc::new(
            Dictionary::parse_str(
                "client",
                "\
ATTRIBUTE User-Name 1 string
ATTRIBUTE Acct-Status-Type 40 integer
ATTRIBUTE Acct-Delay-Time 41 integer
",
            )
            .unwrap(),
        );
        let mut settings = ClientSettings::new("127.0.0.1", "secret");
        settings.retries = retries;
        Client::new(settings, dict)
    }

    #[test]
    fn identifiers_increase_and_wrap_without_collision() {
        let client = test_client(3);
        let first = client.next_identifier(1812);
        let mut seen = vec![first];
        for _ in 0..255 {
            let id = client.next_identifier(1812);
            assert!(!seen.contains(&id), "identifier {id} reused early");
            seen.push(id);
        }
        // The 257th allocation laps the counter
        assert_eq!(client.next_identifier(1812), first);
    }

    #[test]
    fn identifier_counters_are_scoped_per_port() {
        let client = test_client(3);
        let auth = client.next_identifier(1812);
        let acct = client.next_identifier(1813);
        assert_eq!(client.next_identifier(1812), auth.wrapping_add(1));
        assert_eq!(client.next_identifier(1813), acct.wrapping_add(1));
    }

    #[test]
    fn acct_delay_accumulates() {
        let client = test_client(3);
        let mut packet = client.create_acct_packet();
        bump_acct_delay(&mut packet, 5);
        bump_acct_delay(&mut packet, 5);
        let key = AttrKey::standard(consts::ACCT_DELAY_TIME);
        let values = packet.raw_values(key);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], &10u32.to_be_bytes()[..]);
    }

    #[test]
    fn settings_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"server": "10.0.0.1", "secret": "s"}"#).unwrap();
        assert_eq!(settings.auth_port, 1812);
        assert_eq!(settings.acct_port, 1813);
        assert_eq!(settings.coa_port, 3799);
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.retries, 3);
    }

    #[tokio::test]
    async fn reply_codes_are_rejected_as_requests() {
        let client = test_client(1);
        let mut bogus = client.create_auth_packet();
        bogus.code = Code::AccessAccept;
        assert!(matches!(
            client.send_packet(&mut bogus).await,
            Err(ClientError::NotARequest(Code::AccessAccept))
        ));
    }
}
