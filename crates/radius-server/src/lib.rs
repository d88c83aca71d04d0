//! RADIUS server dispatch engine
//!
//! Binds UDP sockets for the authentication, accounting, and dynamic
//! authorization services, authenticates the source of every datagram
//! against a host table of shared secrets, and dispatches decoded packets
//! to an embedder-supplied [`RadiusHandler`]. Authentication logic itself
//! lives with the embedder; this crate only moves verified packets.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use radius_proto::{Code, Dictionary, Packet};
//! use radius_server::{HostTable, RadiusHandler, RadiusServer, ServerSettings};
//! use std::sync::Arc;
//!
//! struct AcceptEveryone;
//!
//! #[async_trait]
//! impl RadiusHandler for AcceptEveryone {
//!     async fn handle_auth(&self, request: Packet) -> Option<Packet> {
//!         Some(request.reply(Code::AccessAccept))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dict = Arc::new(Dictionary::load("dictionaries/dictionary")?);
//!     let hosts = Arc::new(HostTable::new());
//!     hosts.register_host("127.0.0.1".parse()?, "s3cret", "localhost");
//!
//!     let server = RadiusServer::bind(&ServerSettings::default(), dict, hosts).await?;
//!     server.run(Arc::new(AcceptEveryone)).await?;
//!     Ok(())
//! }
//! ```

mod hosts;
mod server;

pub use hosts::{HostEntry, HostTable};
pub use server::{
    RadiusHandler, RadiusServer, ServerError, ServerSettings, Service, ShutdownHandle,
};
