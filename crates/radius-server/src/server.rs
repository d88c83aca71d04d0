use crate::hosts::HostTable;
use async_trait::async_trait;
use radius_proto::{Code, Dictionary, Packet};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no listen addresses configured")]
    NoAddresses,
}

/// Which RADIUS service a socket serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Authentication (UDP/1812)
    Auth,
    /// Accounting (UDP/1813)
    Acct,
    /// Dynamic authorization: CoA and Disconnect (UDP/3799)
    CoA,
}

/// Server listen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Addresses to bind each service on
    #[serde(default = "default_addresses")]
    pub addresses: Vec<IpAddr>,
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_acct_port")]
    pub acct_port: u16,
    #[serde(default = "default_coa_port")]
    pub coa_port: u16,
    /// Seconds granted to in-flight handlers on shutdown
    #[serde(default = "default_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_addresses() -> Vec<IpAddr> {
    vec!["0.0.0.0".parse().expect("literal address")]
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

fn default_grace_secs() -> u64 {
    5
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            addresses: default_addresses(),
            auth_port: default_auth_port(),
            acct_port: default_acct_port(),
            coa_port: default_coa_port(),
            shutdown_grace_secs: default_grace_secs(),
        }
    }
}

/// Packet handlers supplied by the embedder
///
/// Each handler receives a decoded, source-authenticated request and returns
/// the reply to send, or `None` to drop silently. Handlers must be
/// reentrant: the engine runs them concurrently and guarantees no ordering
/// between requests. Build replies with [`Packet::reply`] so the response
/// authenticator can be stamped against the request.
#[async_trait]
pub trait RadiusHandler: Send + Sync {
    async fn handle_auth(&self, _request: Packet) -> Option<Packet> {
        None
    }

    async fn handle_acct(&self, _request: Packet) -> Option<Packet> {
        None
    }

    async fn handle_coa(&self, _request: Packet) -> Option<Packet> {
        None
    }

    async fn handle_disconnect(&self, _request: Packet) -> Option<Packet> {
        None
    }
}

/// The UDP dispatch engine
///
/// Per datagram: resolve the source against the host table, decode with
/// that host's secret, verify the request authenticator where the protocol
/// allows it, dispatch to the handler, stamp and send the reply. Every
/// failure on the receive path is a silent drop; RADIUS has no error
/// packets.
pub struct RadiusServer {
    dictionary: Arc<Dictionary>,
    hosts: Arc<HostTable>,
    sockets: Vec<(Service, Arc<UdpSocket>)>,
    shutdown: Arc<watch::Sender<bool>>,
    grace: Duration,
}

impl RadiusServer {
    /// Bind one socket per (address, service) pair
    pub async fn bind(
        settings: &ServerSettings,
        dictionary: Arc<Dictionary>,
        hosts: Arc<HostTable>,
    ) -> Result<Self, ServerError> {
        if settings.addresses.is_empty() {
            return Err(ServerError::NoAddresses);
        }

        let mut sockets = Vec::new();
        for address in &settings.addresses {
            for (service, port) in [
                (Service::Auth, settings.auth_port),
                (Service::Acct, settings.acct_port),
                (Service::CoA, settings.coa_port),
            ] {
                let socket = UdpSocket::bind((*address, port)).await?;
                let local = socket.local_addr()?;
                info!(service = ?service, addr = %local, "listening");
                sockets.push((service, Arc::new(socket)));
            }
        }

        let (shutdown, _) = watch::channel(false);
        Ok(RadiusServer {
            dictionary,
            hosts,
            sockets,
            shutdown: Arc::new(shutdown),
            grace: Duration::from_secs(settings.shutdown_grace_secs),
        })
    }

    /// The bound address of the first socket serving `service`
    ///
    /// Useful in tests that bind port 0.
    pub fn local_addr(&self, service: Service) -> Option<SocketAddr> {
        self.sockets
            .iter()
            .find(|(s, _)| *s == service)
            .and_then(|(_, socket)| socket.local_addr().ok())
    }

    /// A handle that stops [`RadiusServer::run`] when triggered
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Serve until shutdown
    ///
    /// One task per socket; each datagram's handler runs as its own task so
    /// slow handlers never block the receive loop. On shutdown the loops
    /// stop accepting, in-flight handlers get the configured grace period,
    /// then sockets close.
    pub async fn run(&self, handler: Arc<dyn RadiusHandler>) -> Result<(), ServerError> {
        let mut loops = JoinSet::new();
        for (service, socket) in &self.sockets {
            loops.spawn(socket_loop(
                *service,
                Arc::clone(socket),
                Arc::clone(&self.dictionary),
                Arc::clone(&self.hosts),
                Arc::clone(&handler),
                self.shutdown.subscribe(),
                self.grace,
            ));
        }
        while loops.join_next().await.is_some() {}
        info!("server stopped");
        Ok(())
    }
}

/// Stops a running server; cheap to clone and send across tasks
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn socket_loop(
    service: Service,
    socket: Arc<UdpSocket>,
    dictionary: Arc<Dictionary>,
    hosts: Arc<HostTable>,
    handler: Arc<dyn RadiusHandler>,
    mut shutdown: watch::Receiver<bool>,
    grace: Duration,
) {
    let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];
    let mut inflight = JoinSet::new();

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, peer)) => {
                        let data = buf[..len].to_vec();
                        inflight.spawn(handle_datagram(
                            service,
                            data,
                            peer,
                            Arc::clone(&socket),
                            Arc::clone(&dictionary),
                            Arc::clone(&hosts),
                            Arc::clone(&handler),
                        ));
                        // Reap whatever has already finished
                        while inflight.try_join_next().is_some() {}
                    }
                    Err(error) => {
                        warn!(service = ?service, %error, "socket receive failed");
                    }
                }
            }
        }
    }

    // Drain in-flight handlers within the grace period, then give up
    let drain = async {
        while inflight.join_next().await.is_some() {}
    };
    if tokio::time::timeout(grace, drain).await.is_err() {
        warn!(service = ?service, "shutdown grace expired with handlers in flight");
    }
}

/// Received -> Authenticated -> Decoded -> Dispatched -> Replied | Dropped
async fn handle_datagram(
    service: Service,
    data: Vec<u8>,
    peer: SocketAddr,
    socket: Arc<UdpSocket>,
    dictionary: Arc<Dictionary>,
    hosts: Arc<HostTable>,
    handler: Arc<dyn RadiusHandler>,
) {
    let entry = match hosts.resolve(peer.ip()) {
        Some(entry) => entry,
        None => {
            warn!(client_ip = %peer.ip(), "dropping datagram from unknown host");
            return;
        }
    };

    let request = match Packet::decode(&data, entry.secret_bytes(), &dictionary) {
        Ok(packet) => packet,
        Err(error) => {
            warn!(
                client_ip = %peer.ip(),
                client = %entry.name,
                %error,
                "dropping malformed packet"
            );
            return;
        }
    };

    // Accounting, CoA, and Disconnect requests are verifiable against the
    // shared secret; Access-Request is not (its authenticator is random).
    if request.code.uses_hashed_authenticator() && !request.verify_request_authenticator() {
        warn!(
            client_ip = %peer.ip(),
            client = %entry.name,
            code = ?request.code,
            identifier = request.identifier,
            "dropping request with invalid authenticator"
        );
        return;
    }

    debug!(
        client_ip = %peer.ip(),
        client = %entry.name,
        code = ?request.code,
        identifier = request.identifier,
        "dispatching request"
    );

    let identifier = request.identifier;
    let reply = match (service, request.code) {
        (Service::Auth, Code::AccessRequest) => handler.handle_auth(request).await,
        (_, Code::StatusServer) => handler.handle_auth(request).await,
        (Service::Acct, Code::AccountingRequest) => handler.handle_acct(request).await,
        (Service::CoA, Code::CoARequest) => handler.handle_coa(request).await,
        (Service::CoA, Code::DisconnectRequest) => handler.handle_disconnect(request).await,
        (service, code) => {
            debug!(service = ?service, code = ?code, "dropping code unexpected on this service");
            None
        }
    };

    let Some(mut reply) = reply else {
        debug!(client_ip = %peer.ip(), identifier, "handler dropped request");
        return;
    };

    match reply.encode_response() {
        Ok(wire) => {
            if let Err(error) = socket.send_to(&wire, peer).await {
                warn!(client_ip = %peer.ip(), %error, "failed to send reply");
            } else {
                debug!(
                    client_ip = %peer.ip(),
                    code = ?reply.code,
                    identifier = reply.identifier,
                    "sent reply"
                );
            }
        }
        Err(error) => {
            warn!(client_ip = %peer.ip(), %error, "failed to encode reply");
        }
    }
}
