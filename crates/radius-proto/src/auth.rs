//! Authenticator and password cryptography
//!
//! RFC 2865 Section 3 authenticator calculation, Section 5.2 User-Password
//! obfuscation, and RFC 2868 Section 3.5 Tunnel-Password salt encryption.
//! All digests are MD5 as the protocol requires; the Request Authenticator
//! for Access-Request comes from a cryptographically strong RNG.

use crate::packet::{DecodeError, EncodeError};
use rand::Rng;

/// Longest User-Password plaintext (RFC 2865 Section 5.2)
pub const MAX_PASSWORD_LEN: usize = 128;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate the hashed Request Authenticator used by Accounting-Request,
/// CoA-Request, and Disconnect-Request (RFC 2866 Section 3, RFC 5176)
///
/// Request Authenticator = MD5(Code + ID + Length + 16 zero octets +
/// Attributes + Secret)
pub fn calculate_request_authenticator(
    header: &[u8; 4],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    let mut data = Vec::with_capacity(20 + attributes.len() + secret.len());
    data.extend_from_slice(header);
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(attributes);
    data.extend_from_slice(secret);
    md5::compute(&data).0
}

/// Calculate a Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator +
/// Attributes + Secret)
pub fn calculate_response_authenticator(
    header: &[u8; 4],
    request_authenticator: &[u8; 16],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    let mut data = Vec::with_capacity(20 + attributes.len() + secret.len());
    data.extend_from_slice(header);
    data.extend_from_slice(request_authenticator);
    data.extend_from_slice(attributes);
    data.extend_from_slice(secret);
    md5::compute(&data).0
}

/// Verify the hashed Request Authenticator of a received request
///
/// `raw` is the wire image as received; the authenticator field is replaced
/// with zeros for the digest.
pub fn verify_request_authenticator(raw: &[u8], secret: &[u8]) -> bool {
    if raw.len() < 20 {
        return false;
    }
    let mut data = Vec::with_capacity(raw.len() + secret.len());
    data.extend_from_slice(&raw[..4]);
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&raw[20..]);
    data.extend_from_slice(secret);
    md5::compute(&data).0 == raw[4..20]
}

/// Verify the Response Authenticator of a received reply against the
/// Request Authenticator of the request it answers
pub fn verify_response_authenticator(
    raw: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    if raw.len() < 20 {
        return false;
    }
    let mut data = Vec::with_capacity(raw.len() + secret.len());
    data.extend_from_slice(&raw[..4]);
    data.extend_from_slice(request_authenticator);
    data.extend_from_slice(&raw[20..]);
    data.extend_from_slice(secret);
    md5::compute(&data).0 == raw[4..20]
}

/// Obfuscate a User-Password per RFC 2865 Section 5.2
///
/// The plaintext is NUL-padded to a multiple of 16 octets, then each block
/// is XORed with MD5(secret + previous ciphertext block), seeded with the
/// Request Authenticator.
pub fn encrypt_user_password(
    password: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, EncodeError> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(EncodeError::Oversize(password.len()));
    }

    let mut padded = password.to_vec();
    let fill = (16 - padded.len() % 16) % 16;
    padded.resize(padded.len() + fill, 0);
    if padded.is_empty() {
        padded.resize(16, 0);
    }

    let mut result = Vec::with_capacity(padded.len());
    let mut previous: Vec<u8> = authenticator.to_vec();

    for chunk in padded.chunks(16) {
        let mut data = Vec::with_capacity(secret.len() + 16);
        data.extend_from_slice(secret);
        data.extend_from_slice(&previous);
        let hash = md5::compute(&data).0;

        let mut block = [0u8; 16];
        for (i, byte) in block.iter_mut().enumerate() {
            *byte = chunk[i] ^ hash[i];
        }

        previous = block.to_vec();
        result.extend_from_slice(&block);
    }

    Ok(result)
}

/// Reverse the User-Password obfuscation, stripping NUL padding
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, DecodeError> {
    if encrypted.is_empty() || encrypted.len() % 16 != 0 || encrypted.len() > MAX_PASSWORD_LEN {
        return Err(DecodeError::InvalidValueLength {
            datatype: "user-password",
            len: encrypted.len(),
        });
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous: &[u8] = authenticator;

    for chunk in encrypted.chunks(16) {
        let mut data = Vec::with_capacity(secret.len() + 16);
        data.extend_from_slice(secret);
        data.extend_from_slice(previous);
        let hash = md5::compute(&data).0;

        for (i, byte) in chunk.iter().enumerate() {
            result.push(byte ^ hash[i]);
        }

        previous = chunk;
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    Ok(result)
}

/// Salt-encrypt a value per RFC 2868 Section 3.5 (Tunnel-Password)
///
/// The plaintext is prefixed with a length octet, NUL-padded to a multiple
/// of 16, and chained like User-Password but seeded with the Request
/// Authenticator concatenated with a 2-octet salt whose most significant
/// bit is set.
pub fn salt_encrypt(value: &[u8], secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut salt = [0u8; 2];
    rand::rng().fill(&mut salt);
    salt[0] |= 0x80;
    salt_encrypt_with(value, secret, authenticator, salt)
}

/// Salt encryption with a caller-chosen salt, so tests can pin it
pub fn salt_encrypt_with(
    value: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
    salt: [u8; 2],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 1);
    buf.push(value.len() as u8);
    buf.extend_from_slice(value);
    let fill = (16 - buf.len() % 16) % 16;
    buf.resize(buf.len() + fill, 0);

    let mut result = salt.to_vec();
    let mut previous = Vec::with_capacity(18);
    previous.extend_from_slice(authenticator);
    previous.extend_from_slice(&salt);

    for chunk in buf.chunks(16) {
        let mut data = Vec::with_capacity(secret.len() + previous.len());
        data.extend_from_slice(secret);
        data.extend_from_slice(&previous);
        let hash = md5::compute(&data).0;

        let start = result.len();
        for (i, byte) in chunk.iter().enumerate() {
            result.push(byte ^ hash[i]);
        }
        previous = result[start..].to_vec();
    }

    result
}

/// Reverse the RFC 2868 salt encryption
pub fn salt_decrypt(
    data: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, DecodeError> {
    // 2-octet salt plus at least one 16-octet block
    if data.len() < 18 || (data.len() - 2) % 16 != 0 || data[0] & 0x80 == 0 {
        return Err(DecodeError::InvalidValueLength {
            datatype: "tunnel-password",
            len: data.len(),
        });
    }

    let salt = &data[..2];
    let cipher = &data[2..];

    let mut plain = Vec::with_capacity(cipher.len());
    let mut previous = Vec::with_capacity(18);
    previous.extend_from_slice(authenticator);
    previous.extend_from_slice(salt);

    for chunk in cipher.chunks(16) {
        let mut seed = Vec::with_capacity(secret.len() + previous.len());
        seed.extend_from_slice(secret);
        seed.extend_from_slice(&previous);
        let hash = md5::compute(&seed).0;

        for (i, byte) in chunk.iter().enumerate() {
            plain.push(byte ^ hash[i]);
        }
        previous = chunk.to_vec();
    }

    let length = plain[0] as usize;
    if length + 1 > plain.len() {
        return Err(DecodeError::InvalidValueLength {
            datatype: "tunnel-password",
            len: data.len(),
        });
    }
    Ok(plain[1..=length].to_vec())
}
