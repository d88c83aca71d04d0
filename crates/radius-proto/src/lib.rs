//! RADIUS Protocol Core
//!
//! Dictionary-driven implementation of the RADIUS wire protocol as defined
//! in RFC 2865, 2866, 2868, 2869, 3162, 5176, and 6929.
//!
//! # Features
//!
//! - FreeRADIUS-syntax attribute dictionary parser and O(1) registry
//! - Packet encoding and decoding with symbolic, list-valued attribute access
//! - Vendor-specific attributes with per-vendor header formats
//! - RFC 6929 extended attributes and long-extended continuation
//! - Request/Response Authenticator calculation and verification
//! - User-Password and Tunnel-Password obfuscation
//! - Message-Authenticator (HMAC-MD5) integrity protection
//!
//! The crate is pure: no sockets, no clocks, no global state. The client and
//! server engines live in their own crates on top of this one.
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Code, Dictionary, Packet};
//! use std::sync::Arc;
//!
//! let dict = Arc::new(Dictionary::parse_str(
//!     "example",
//!     "ATTRIBUTE User-Name 1 string\nATTRIBUTE User-Password 2 string encrypt=1\n",
//! ).unwrap());
//!
//! let mut packet = Packet::new(Code::AccessRequest, &b"secret"[..], dict);
//! packet.add("User-Name", "alice").unwrap();
//! packet.add("User-Password", "correcthorse").unwrap();
//!
//! let wire = packet.encode_request().unwrap();
//! assert!(wire.len() >= 20);
//! ```

pub mod auth;
pub mod dictionary;
pub mod encoding;
pub mod host;
pub mod message_auth;
pub mod packet;

pub use dictionary::{
    AttrKey, AttributeDef, DataType, Dictionary, ParseError, ParseErrorKind, Vendor,
};
pub use encoding::Value;
pub use host::Host;
pub use message_auth::{calculate_message_authenticator, verify_message_authenticator};
pub use packet::{AuthError, Avp, Code, DecodeError, EncodeError, Packet};
