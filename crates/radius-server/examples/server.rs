//! A small AAA server accepting every user, answering accounting, and
//! NAK-ing disconnects

use async_trait::async_trait;
use radius_proto::{Code, Dictionary, Packet};
use radius_server::{HostTable, RadiusHandler, RadiusServer, ServerSettings};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DICTIONARY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../dictionaries/dictionary");

struct DemoHandler;

#[async_trait]
impl RadiusHandler for DemoHandler {
    async fn handle_auth(&self, request: Packet) -> Option<Packet> {
        info!(identifier = request.identifier, "authentication request");
        let mut reply = request.reply(Code::AccessAccept);
        reply.add("Service-Type", "Framed-User").ok()?;
        reply.add("Framed-IP-Address", "192.168.0.1").ok()?;
        reply.add("Framed-IPv6-Prefix", "fc66::/64").ok()?;
        reply.echo_proxy_state(&request);
        Some(reply)
    }

    async fn handle_acct(&self, request: Packet) -> Option<Packet> {
        info!(identifier = request.identifier, "accounting request");
        Some(request.reply(Code::AccountingResponse))
    }

    async fn handle_coa(&self, request: Packet) -> Option<Packet> {
        info!(identifier = request.identifier, "coa request");
        Some(request.reply(Code::CoAAck))
    }

    async fn handle_disconnect(&self, request: Packet) -> Option<Packet> {
        info!(identifier = request.identifier, "disconnect request");
        Some(request.reply(Code::DisconnectNak))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let dict = Arc::new(Dictionary::load(DICTIONARY)?);

    let hosts = Arc::new(HostTable::new());
    hosts.register_host(
        "127.0.0.1".parse()?,
        "Kah3choteereethiejeimaeziecumi",
        "localhost",
    );

    let server = RadiusServer::bind(&ServerSettings::default(), dict, hosts).await?;
    server.run(Arc::new(DemoHandler)).await?;
    Ok(())
}
