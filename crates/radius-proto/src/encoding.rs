//! Per-type attribute value codecs
//!
//! Each RADIUS data type maps to an (encode, decode) pair with strict length
//! and format validation. Decoded values are carried in the [`Value`] enum;
//! encoding accepts the matching variant plus a few pragmatic coercions
//! (dotted-quad text for `ipaddr`, `prefix/len` text for prefix types,
//! integers for `date`/`byte`/`short`).

use crate::dictionary::DataType;
use crate::packet::{DecodeError, EncodeError};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Longest value that fits a standard attribute (255 - type - length)
pub const MAX_VALUE_LEN: usize = 253;

/// A decoded attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Bytes(Vec<u8>),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Ipv4Prefix { prefix_len: u8, network: Ipv4Addr },
    Ipv6Prefix { prefix_len: u8, network: Ipv6Addr },
    Integer(u32),
    Integer64(u64),
    Signed(i32),
    Date(u32),
    Byte(u8),
    Short(u16),
    Ifid([u8; 8]),
    Ether([u8; 6]),
    /// Structural view of nested sub-attributes: (code, raw value)
    Tlv(Vec<(u32, Vec<u8>)>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u32> {
        match self {
            Value::Integer(n) | Value::Date(n) => Some(*n),
            Value::Byte(n) => Some(u32::from(*n)),
            Value::Short(n) => Some(u32::from(*n)),
            _ => None,
        }
    }

    pub fn as_integer64(&self) -> Option<u64> {
        match self {
            Value::Integer64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Value::Ipv4(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_ipv6(&self) -> Option<Ipv6Addr> {
        match self {
            Value::Ipv6(a) => Some(*a),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Ipv4(a) => write!(f, "{a}"),
            Value::Ipv6(a) => write!(f, "{a}"),
            Value::Ipv4Prefix { prefix_len, network } => write!(f, "{network}/{prefix_len}"),
            Value::Ipv6Prefix { prefix_len, network } => write!(f, "{network}/{prefix_len}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Integer64(n) => write!(f, "{n}"),
            Value::Signed(n) => write!(f, "{n}"),
            Value::Date(n) => write!(f, "{n}"),
            Value::Byte(n) => write!(f, "{n}"),
            Value::Short(n) => write!(f, "{n}"),
            Value::Ifid(b) => {
                let mut first = true;
                for pair in b.chunks(2) {
                    if !first {
                        write!(f, ":")?;
                    }
                    write!(f, "{:02x}{:02x}", pair[0], pair[1])?;
                    first = false;
                }
                Ok(())
            }
            Value::Ether(b) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                b[0], b[1], b[2], b[3], b[4], b[5]
            ),
            Value::Tlv(children) => write!(f, "tlv({} sub-attributes)", children.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer64(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Signed(n)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(a: Ipv4Addr) -> Self {
        Value::Ipv4(a)
    }
}

impl From<Ipv6Addr> for Value {
    fn from(a: Ipv6Addr) -> Self {
        Value::Ipv6(a)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

fn invalid(datatype: DataType, reason: impl Into<String>) -> EncodeError {
    EncodeError::InvalidValue {
        datatype: datatype.keyword(),
        reason: reason.into(),
    }
}

fn length_error(datatype: DataType, len: usize) -> DecodeError {
    DecodeError::InvalidValueLength {
        datatype: datatype.keyword(),
        len,
    }
}

/// Encode a value as wire octets for the given data type
pub fn encode_value(datatype: DataType, value: &Value) -> Result<Vec<u8>, EncodeError> {
    match datatype {
        DataType::Text => match value {
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(_) => Ok(b.clone()),
                Err(_) => Err(invalid(datatype, "not valid UTF-8")),
            },
            other => Err(invalid(datatype, format!("expected text, got {other}"))),
        },
        DataType::String | DataType::Octets | DataType::Abinary => match value {
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(invalid(datatype, format!("expected octets, got {other}"))),
        },
        DataType::Ipaddr => {
            let addr = match value {
                Value::Ipv4(a) => *a,
                Value::Text(s) => s
                    .parse::<Ipv4Addr>()
                    .map_err(|_| invalid(datatype, format!("`{s}` is not a dotted quad")))?,
                other => return Err(invalid(datatype, format!("expected IPv4 address, got {other}"))),
            };
            Ok(addr.octets().to_vec())
        }
        DataType::Ipv6addr => {
            let addr = match value {
                Value::Ipv6(a) => *a,
                Value::Text(s) => s
                    .parse::<Ipv6Addr>()
                    .map_err(|_| invalid(datatype, format!("`{s}` is not an IPv6 address")))?,
                other => return Err(invalid(datatype, format!("expected IPv6 address, got {other}"))),
            };
            Ok(addr.octets().to_vec())
        }
        DataType::Ipv6prefix => {
            let (prefix_len, network) = match value {
                Value::Ipv6Prefix { prefix_len, network } => (*prefix_len, *network),
                Value::Text(s) => parse_ipv6_prefix(s).ok_or_else(|| {
                    invalid(datatype, format!("`{s}` is not an IPv6 prefix"))
                })?,
                other => return Err(invalid(datatype, format!("expected IPv6 prefix, got {other}"))),
            };
            if prefix_len > 128 {
                return Err(invalid(datatype, format!("prefix length {prefix_len} > 128")));
            }
            let mut out = Vec::with_capacity(18);
            out.push(0);
            out.push(prefix_len);
            out.extend_from_slice(&network.octets());
            Ok(out)
        }
        DataType::Ipv4prefix => {
            let (prefix_len, network) = match value {
                Value::Ipv4Prefix { prefix_len, network } => (*prefix_len, *network),
                Value::Text(s) => parse_ipv4_prefix(s).ok_or_else(|| {
                    invalid(datatype, format!("`{s}` is not an IPv4 prefix"))
                })?,
                other => return Err(invalid(datatype, format!("expected IPv4 prefix, got {other}"))),
            };
            if prefix_len > 32 {
                return Err(invalid(datatype, format!("prefix length {prefix_len} > 32")));
            }
            let mut out = Vec::with_capacity(6);
            out.push(0);
            out.push(prefix_len);
            out.extend_from_slice(&network.octets());
            Ok(out)
        }
        DataType::Integer => match value.as_integer() {
            Some(n) => Ok(n.to_be_bytes().to_vec()),
            None => Err(invalid(datatype, format!("expected integer, got {value}"))),
        },
        DataType::Date => match value.as_integer() {
            Some(n) => Ok(n.to_be_bytes().to_vec()),
            None => Err(invalid(datatype, format!("expected date, got {value}"))),
        },
        DataType::Integer64 => match value {
            Value::Integer64(n) => Ok(n.to_be_bytes().to_vec()),
            Value::Integer(n) => Ok(u64::from(*n).to_be_bytes().to_vec()),
            other => Err(invalid(datatype, format!("expected integer64, got {other}"))),
        },
        DataType::Signed => match value {
            Value::Signed(n) => Ok(n.to_be_bytes().to_vec()),
            other => Err(invalid(datatype, format!("expected signed integer, got {other}"))),
        },
        DataType::Byte => match value {
            Value::Byte(n) => Ok(vec![*n]),
            Value::Integer(n) if *n <= 0xff => Ok(vec![*n as u8]),
            other => Err(invalid(datatype, format!("expected byte, got {other}"))),
        },
        DataType::Short => match value {
            Value::Short(n) => Ok(n.to_be_bytes().to_vec()),
            Value::Integer(n) if *n <= 0xffff => Ok((*n as u16).to_be_bytes().to_vec()),
            other => Err(invalid(datatype, format!("expected short, got {other}"))),
        },
        DataType::Ifid => match value {
            Value::Ifid(b) => Ok(b.to_vec()),
            Value::Bytes(b) if b.len() == 8 => Ok(b.clone()),
            other => Err(invalid(datatype, format!("expected 8-octet ifid, got {other}"))),
        },
        DataType::Ether => match value {
            Value::Ether(b) => Ok(b.to_vec()),
            Value::Bytes(b) if b.len() == 6 => Ok(b.clone()),
            other => Err(invalid(datatype, format!("expected 6-octet MAC, got {other}"))),
        },
        DataType::Tlv => match value {
            Value::Tlv(children) => {
                let mut out = Vec::new();
                for (code, raw) in children {
                    if *code > 0xff || raw.len() > MAX_VALUE_LEN {
                        return Err(invalid(datatype, "sub-attribute out of range"));
                    }
                    out.push(*code as u8);
                    out.push((raw.len() + 2) as u8);
                    out.extend_from_slice(raw);
                }
                Ok(out)
            }
            other => Err(invalid(datatype, format!("expected tlv, got {other}"))),
        },
    }
}

/// Decode wire octets into a value for the given data type
///
/// Length validation is strict: a 3-octet `integer` is a decode error, not a
/// best-effort value.
pub fn decode_value(datatype: DataType, data: &[u8]) -> Result<Value, DecodeError> {
    match datatype {
        // Opaque-ish types surface text when the bytes happen to be UTF-8.
        DataType::Text | DataType::String => match std::str::from_utf8(data) {
            Ok(s) => Ok(Value::Text(s.to_owned())),
            Err(_) => Ok(Value::Bytes(data.to_vec())),
        },
        DataType::Octets | DataType::Abinary => Ok(Value::Bytes(data.to_vec())),
        DataType::Ipaddr => {
            let octets: [u8; 4] = data.try_into().map_err(|_| length_error(datatype, data.len()))?;
            Ok(Value::Ipv4(Ipv4Addr::from(octets)))
        }
        DataType::Ipv6addr => {
            let octets: [u8; 16] =
                data.try_into().map_err(|_| length_error(datatype, data.len()))?;
            Ok(Value::Ipv6(Ipv6Addr::from(octets)))
        }
        DataType::Ipv6prefix => {
            // The wire may truncate trailing zero octets of the address;
            // accept 2..=18 and pad.
            if data.len() < 2 || data.len() > 18 {
                return Err(length_error(datatype, data.len()));
            }
            let prefix_len = data[1];
            if prefix_len > 128 {
                return Err(length_error(datatype, data.len()));
            }
            let mut octets = [0u8; 16];
            octets[..data.len() - 2].copy_from_slice(&data[2..]);
            Ok(Value::Ipv6Prefix {
                prefix_len,
                network: Ipv6Addr::from(octets),
            })
        }
        DataType::Ipv4prefix => {
            if data.len() != 6 {
                return Err(length_error(datatype, data.len()));
            }
            let prefix_len = data[1];
            if prefix_len > 32 {
                return Err(length_error(datatype, data.len()));
            }
            let octets: [u8; 4] = data[2..].try_into().expect("length checked");
            Ok(Value::Ipv4Prefix {
                prefix_len,
                network: Ipv4Addr::from(octets),
            })
        }
        DataType::Integer => Ok(Value::Integer(u32::from_be_bytes(
            data.try_into().map_err(|_| length_error(datatype, data.len()))?,
        ))),
        DataType::Date => Ok(Value::Date(u32::from_be_bytes(
            data.try_into().map_err(|_| length_error(datatype, data.len()))?,
        ))),
        DataType::Integer64 => Ok(Value::Integer64(u64::from_be_bytes(
            data.try_into().map_err(|_| length_error(datatype, data.len()))?,
        ))),
        DataType::Signed => Ok(Value::Signed(i32::from_be_bytes(
            data.try_into().map_err(|_| length_error(datatype, data.len()))?,
        ))),
        DataType::Byte => match data {
            [b] => Ok(Value::Byte(*b)),
            _ => Err(length_error(datatype, data.len())),
        },
        DataType::Short => Ok(Value::Short(u16::from_be_bytes(
            data.try_into().map_err(|_| length_error(datatype, data.len()))?,
        ))),
        DataType::Ifid => {
            let octets: [u8; 8] = data.try_into().map_err(|_| length_error(datatype, data.len()))?;
            Ok(Value::Ifid(octets))
        }
        DataType::Ether => {
            let octets: [u8; 6] = data.try_into().map_err(|_| length_error(datatype, data.len()))?;
            Ok(Value::Ether(octets))
        }
        DataType::Tlv => {
            let mut children = Vec::new();
            let mut rest = data;
            while !rest.is_empty() {
                if rest.len() < 2 {
                    return Err(DecodeError::AttributeOverrun);
                }
                let code = rest[0] as u32;
                let length = rest[1] as usize;
                if length < 2 || length > rest.len() {
                    return Err(DecodeError::InvalidAttributeLength(length));
                }
                children.push((code, rest[2..length].to_vec()));
                rest = &rest[length..];
            }
            Ok(Value::Tlv(children))
        }
    }
}

fn parse_ipv6_prefix(text: &str) -> Option<(u8, Ipv6Addr)> {
    let (addr, len) = text.split_once('/')?;
    Some((len.parse().ok()?, addr.parse().ok()?))
}

fn parse_ipv4_prefix(text: &str) -> Option<(u8, Ipv4Addr)> {
    let (addr, len) = text.split_once('/')?;
    Some((len.parse().ok()?, addr.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trip() {
        let wire = encode_value(DataType::Integer, &Value::Integer(0x01020304)).unwrap();
        assert_eq!(wire, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            decode_value(DataType::Integer, &wire).unwrap(),
            Value::Integer(0x01020304)
        );
    }

    #[test]
    fn integer_rejects_wrong_length() {
        assert!(decode_value(DataType::Integer, &[1, 2, 3]).is_err());
        assert!(decode_value(DataType::Integer, &[1, 2, 3, 4, 5]).is_err());
    }

    #[test]
    fn integer64_round_trip() {
        let wire = encode_value(DataType::Integer64, &Value::Integer64(u64::MAX)).unwrap();
        assert_eq!(wire, vec![0xff; 8]);
        assert_eq!(
            decode_value(DataType::Integer64, &wire).unwrap(),
            Value::Integer64(u64::MAX)
        );
    }

    #[test]
    fn signed_round_trip() {
        let wire = encode_value(DataType::Signed, &Value::Signed(-5)).unwrap();
        assert_eq!(
            decode_value(DataType::Signed, &wire).unwrap(),
            Value::Signed(-5)
        );
    }

    #[test]
    fn ipaddr_accepts_dotted_quad_text() {
        let wire = encode_value(DataType::Ipaddr, &Value::from("192.168.0.255")).unwrap();
        assert_eq!(wire, vec![0xc0, 0xa8, 0x00, 0xff]);
        assert_eq!(
            decode_value(DataType::Ipaddr, &wire).unwrap(),
            Value::Ipv4("192.168.0.255".parse().unwrap())
        );
        assert!(encode_value(DataType::Ipaddr, &Value::from("TEST123")).is_err());
    }

    #[test]
    fn ipv6_prefix_encodes_eighteen_octets() {
        let wire = encode_value(DataType::Ipv6prefix, &Value::from("fc66::/64")).unwrap();
        let mut expected = vec![0x00, 0x40, 0xfc, 0x66];
        expected.extend_from_slice(&[0u8; 14]);
        assert_eq!(wire, expected);
    }

    #[test]
    fn ipv6_prefix_decode_accepts_truncated_forms() {
        // Full 18 octets
        let mut wire = vec![0x00, 0x40, 0xfc, 0x66];
        wire.extend_from_slice(&[0u8; 14]);
        let full = decode_value(DataType::Ipv6prefix, &wire).unwrap();
        // Truncated to the significant octets
        let short = decode_value(DataType::Ipv6prefix, &[0x00, 0x40, 0xfc, 0x66]).unwrap();
        assert_eq!(full, short);
        assert_eq!(
            full,
            Value::Ipv6Prefix {
                prefix_len: 64,
                network: "fc66::".parse().unwrap()
            }
        );
        // Too long is rejected
        let mut long = wire.clone();
        long.push(0);
        assert!(decode_value(DataType::Ipv6prefix, &long).is_err());
    }

    #[test]
    fn text_rejects_invalid_utf8_on_encode() {
        let err = encode_value(DataType::Text, &Value::Bytes(vec![0xff, 0xfe]));
        assert!(err.is_err());
        // Opaque string type accepts the same bytes
        assert!(encode_value(DataType::String, &Value::Bytes(vec![0xff, 0xfe])).is_ok());
    }

    #[test]
    fn string_decode_preserves_non_utf8_bytes() {
        assert_eq!(
            decode_value(DataType::String, &[0xff, 0xfe]).unwrap(),
            Value::Bytes(vec![0xff, 0xfe])
        );
        assert_eq!(
            decode_value(DataType::String, b"nemo").unwrap(),
            Value::Text("nemo".to_owned())
        );
    }

    #[test]
    fn byte_and_short_round_trip() {
        assert_eq!(encode_value(DataType::Byte, &Value::Byte(7)).unwrap(), vec![7]);
        assert_eq!(
            encode_value(DataType::Short, &Value::Short(0x0102)).unwrap(),
            vec![1, 2]
        );
        assert_eq!(decode_value(DataType::Byte, &[7]).unwrap(), Value::Byte(7));
        assert_eq!(
            decode_value(DataType::Short, &[1, 2]).unwrap(),
            Value::Short(0x0102)
        );
    }

    #[test]
    fn ether_and_ifid_round_trip() {
        let mac = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
        let wire = encode_value(DataType::Ether, &Value::Ether(mac)).unwrap();
        assert_eq!(decode_value(DataType::Ether, &wire).unwrap(), Value::Ether(mac));

        let ifid = [1, 2, 3, 4, 5, 6, 7, 8];
        let wire = encode_value(DataType::Ifid, &Value::Ifid(ifid)).unwrap();
        assert_eq!(decode_value(DataType::Ifid, &wire).unwrap(), Value::Ifid(ifid));
    }

    #[test]
    fn tlv_round_trip_and_bounds() {
        let value = Value::Tlv(vec![(1, b"abc".to_vec()), (2, vec![0x00, 0x01])]);
        let wire = encode_value(DataType::Tlv, &value).unwrap();
        assert_eq!(wire, vec![1, 5, b'a', b'b', b'c', 2, 4, 0x00, 0x01]);
        assert_eq!(decode_value(DataType::Tlv, &wire).unwrap(), value);

        // Truncated child
        assert!(decode_value(DataType::Tlv, &[1, 9, 0]).is_err());
        // Header shorter than two octets
        assert!(decode_value(DataType::Tlv, &[1]).is_err());
    }

    #[test]
    fn date_round_trip() {
        let wire = encode_value(DataType::Date, &Value::Date(0x01020304)).unwrap();
        assert_eq!(wire, vec![1, 2, 3, 4]);
        assert_eq!(
            decode_value(DataType::Date, &wire).unwrap(),
            Value::Date(0x01020304)
        );
    }
}
