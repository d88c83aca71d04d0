//! RADIUS client transaction engine
//!
//! Issues requests over UDP, manages per-port identifier allocation,
//! retransmits on timeout, and validates reply authenticators. Built on the
//! pure codec in `radius-proto`; all I/O is async Tokio.
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_client::{Client, ClientSettings};
//! use radius_proto::Dictionary;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dict = Arc::new(Dictionary::load("dictionaries/dictionary")?);
//!     let client = Client::new(
//!         ClientSettings::new("radius.example.org", "s3cret"),
//!         dict,
//!     );
//!
//!     let mut request = client.create_auth_packet();
//!     request.add("User-Name", "alice")?;
//!     request.add("User-Password", "correcthorse")?;
//!
//!     let reply = client.send_packet(&mut request).await?;
//!     println!("server answered with {:?}", reply.code);
//!     Ok(())
//! }
//! ```

mod client;

pub use client::{Client, ClientError, ClientSettings};
