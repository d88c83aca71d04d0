//! RADIUS packet codec
//!
//! A packet is a 20-octet header followed by an ordered attribute list. The
//! codec is pure: it performs no I/O and owns no mutable global state.

mod code;
#[allow(clippy::module_inception)]
mod packet;

pub use code::Code;
pub use packet::{Avp, Packet};

use thiserror::Error;

/// Well-known attribute codes the codec treats specially
pub mod consts {
    /// User-Password (2)
    pub const USER_PASSWORD: u32 = 2;
    /// CHAP-Password (3)
    pub const CHAP_PASSWORD: u32 = 3;
    /// State (24)
    pub const STATE: u32 = 24;
    /// CHAP-Challenge (60)
    pub const CHAP_CHALLENGE: u32 = 60;
    /// Vendor-Specific (26)
    pub const VENDOR_SPECIFIC: u8 = 26;
    /// Proxy-State (33)
    pub const PROXY_STATE: u32 = 33;
    /// Acct-Delay-Time (41)
    pub const ACCT_DELAY_TIME: u32 = 41;
    /// EAP-Message (79)
    pub const EAP_MESSAGE: u32 = 79;
    /// Message-Authenticator (80)
    pub const MESSAGE_AUTHENTICATOR: u32 = 80;
}

/// Encode-side failure; surfaced synchronously to the caller
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("unknown value `{value}` for attribute `{attribute}`")]
    UnknownValue { attribute: String, value: String },
    #[error("invalid {datatype} value: {reason}")]
    InvalidValue {
        datatype: &'static str,
        reason: String,
    },
    #[error("attribute value too long: {0} octets")]
    Oversize(usize),
    #[error("tag {0} out of range (0-31)")]
    InvalidTag(u32),
    #[error("packet too large: {0} octets")]
    PacketTooLarge(usize),
}

/// Decode-side failure; the offending packet is dropped
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("packet too short: {0} octets")]
    Truncated(usize),
    #[error("invalid packet length field: {0}")]
    InvalidLength(usize),
    #[error("invalid packet code: {0}")]
    InvalidCode(u8),
    #[error("attribute overruns the packet")]
    AttributeOverrun,
    #[error("invalid attribute length: {0}")]
    InvalidAttributeLength(usize),
    #[error("invalid {datatype} value length: {len}")]
    InvalidValueLength { datatype: &'static str, len: usize },
    #[error("malformed vendor-specific attribute")]
    MalformedVsa,
    #[error("unknown attribute `{0}`")]
    UnknownAttribute(String),
    #[error("invalid UTF-8 in decrypted value")]
    InvalidUtf8,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Cryptographic verification failure; the packet is dropped
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("request authenticator mismatch")]
    RequestAuthenticator,
    #[error("response authenticator mismatch")]
    ResponseAuthenticator,
    #[error("message-authenticator verification failed")]
    MessageAuthenticator,
}
