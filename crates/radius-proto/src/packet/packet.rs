use super::{consts, AuthError, Code, DecodeError, EncodeError};
use crate::auth;
use crate::dictionary::{AttrKey, DataType, Dictionary};
use crate::encoding::{self, Value, MAX_VALUE_LEN};
use crate::message_auth;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// One attribute instance in wire order
///
/// `value` holds the wire form of the value: tag octet and encryption
/// already applied, VSA and TLV envelopes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avp {
    pub key: AttrKey,
    pub value: Vec<u8>,
}

/// A RADIUS packet (RFC 2865 Section 3)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Authenticator                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// Attributes are addressed by dictionary name and keep list-of-values
/// semantics: RADIUS permits duplicates and their wire order is preserved.
/// The packet borrows nothing; the dictionary is shared behind an `Arc` and
/// the secret is bound at construction so encode and decode are
/// self-contained.
#[derive(Debug, Clone)]
pub struct Packet {
    pub code: Code,
    pub identifier: u8,
    pub authenticator: [u8; 16],
    secret: Vec<u8>,
    dict: Arc<Dictionary>,
    attributes: Vec<Avp>,
    message_authenticator: bool,
    raw: Option<Vec<u8>>,
}

impl Packet {
    /// Minimum packet size: code + identifier + length + authenticator
    pub const MIN_PACKET_SIZE: usize = 20;
    /// Maximum packet size per RFC 2865
    pub const MAX_PACKET_SIZE: usize = 4096;

    /// Create an outgoing packet
    ///
    /// The identifier is randomly seeded (callers managing transactions
    /// overwrite it); Access-Request and Status-Server get a fresh random
    /// Request Authenticator immediately so password obfuscation can run at
    /// attribute-add time.
    pub fn new(code: Code, secret: impl Into<Vec<u8>>, dict: Arc<Dictionary>) -> Self {
        let authenticator = if code.uses_random_authenticator() {
            auth::generate_request_authenticator()
        } else {
            [0u8; 16]
        };
        Packet {
            code,
            identifier: rand::rng().random(),
            authenticator,
            secret: secret.into(),
            dict,
            attributes: Vec::new(),
            message_authenticator: false,
            raw: None,
        }
    }

    /// Builder-style identifier override
    pub fn with_identifier(mut self, identifier: u8) -> Self {
        self.identifier = identifier;
        self
    }

    /// Builder-style authenticator override, used to pin the Request
    /// Authenticator in tests and by retransmitting clients
    pub fn with_authenticator(mut self, authenticator: [u8; 16]) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Create a reply to this packet
    ///
    /// Identifier, secret, dictionary, and the Request Authenticator are
    /// carried over; [`Packet::encode_response`] turns the latter into the
    /// Response Authenticator.
    pub fn reply(&self, code: Code) -> Packet {
        Packet {
            code,
            identifier: self.identifier,
            authenticator: self.authenticator,
            secret: self.secret.clone(),
            dict: Arc::clone(&self.dict),
            attributes: Vec::new(),
            message_authenticator: false,
            raw: None,
        }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn dictionary(&self) -> &Arc<Dictionary> {
        &self.dict
    }

    /// The attribute list in wire order
    pub fn attributes(&self) -> &[Avp] {
        &self.attributes
    }

    /// The wire image this packet was decoded from, if any
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_deref()
    }

    /// Force a Message-Authenticator attribute onto the next encode
    ///
    /// Packets carrying EAP-Message get one automatically (RFC 3579).
    pub fn set_message_authenticator(&mut self, enabled: bool) {
        self.message_authenticator = enabled;
    }

    /// Add an attribute by dictionary name
    ///
    /// `name` may carry an RFC 2868 tag suffix (`Tunnel-Type:1`). Integer
    /// attributes accept their symbolic VALUE names. Encryption flagged in
    /// the dictionary (User-Password, Tunnel-Password) is applied here,
    /// which is why the Request Authenticator exists from construction.
    pub fn add(&mut self, name: &str, value: impl Into<Value>) -> Result<(), EncodeError> {
        self.add_value(name, value.into())
    }

    fn add_value(&mut self, name: &str, value: Value) -> Result<(), EncodeError> {
        let (base, tag) = match name.split_once(':') {
            Some((base, tag)) => {
                let tag: u32 = tag.parse().map_err(|_| EncodeError::InvalidTag(u32::MAX))?;
                (base, tag)
            }
            None => (name, 0),
        };
        if tag > 31 {
            return Err(EncodeError::InvalidTag(tag));
        }

        let def = self
            .dict
            .attribute(base)
            .ok_or_else(|| EncodeError::UnknownAttribute(base.to_owned()))?
            .clone();

        // Symbolic VALUE names for enumerated integers
        let value = match (&value, def.data_type) {
            (Value::Text(s), DataType::Integer | DataType::Byte | DataType::Short) => {
                match def.value_by_name(s) {
                    Some(n) => Value::Integer(n),
                    None => {
                        return Err(EncodeError::UnknownValue {
                            attribute: def.name.clone(),
                            value: s.clone(),
                        })
                    }
                }
            }
            _ => value,
        };

        let mut wire = encoding::encode_value(def.data_type, &value)?;

        match def.encrypt {
            1 => wire = auth::encrypt_user_password(&wire, &self.secret, &self.authenticator)?,
            2 => wire = auth::salt_encrypt(&wire, &self.secret, &self.authenticator),
            // encrypt=3 (Ascend-Send-Secret) transits unobfuscated
            _ => {}
        }

        if def.has_tag {
            if def.data_type == DataType::Integer {
                // Tagged integers replace the first value octet (RFC 2868)
                wire[0] = tag as u8;
            } else {
                wire.insert(0, tag as u8);
            }
        }

        self.attributes.push(Avp {
            key: def.key,
            value: wire,
        });
        Ok(())
    }

    /// Append a raw attribute, bypassing the dictionary codecs
    pub fn add_raw(&mut self, key: AttrKey, value: Vec<u8>) {
        self.attributes.push(Avp { key, value });
    }

    /// All raw values stored under a wire identity, in order
    pub fn raw_values(&self, key: AttrKey) -> Vec<&[u8]> {
        self.attributes
            .iter()
            .filter(|avp| avp.key == key)
            .map(|avp| avp.value.as_slice())
            .collect()
    }

    /// Remove every raw attribute with this wire identity
    pub fn remove_raw(&mut self, key: AttrKey) -> usize {
        let before = self.attributes.len();
        self.attributes.retain(|avp| avp.key != key);
        before - self.attributes.len()
    }

    /// Decoded values for a named attribute, in wire order
    ///
    /// Returns an empty list when the attribute is absent. Values of
    /// encrypted attributes come back as the obfuscated octets; see
    /// [`Packet::decrypt_password`].
    pub fn get(&self, name: &str) -> Result<Vec<Value>, DecodeError> {
        let base = name.split(':').next().unwrap_or(name);
        let def = self
            .dict
            .attribute(base)
            .ok_or_else(|| DecodeError::UnknownAttribute(base.to_owned()))?;

        if def.data_type == DataType::Tlv {
            let children: Vec<(u32, Vec<u8>)> = self
                .attributes
                .iter()
                .filter(|avp| {
                    avp.key.vendor == def.key.vendor && avp.key.parent == Some(def.key.code)
                })
                .map(|avp| (avp.key.code, avp.value.clone()))
                .collect();
            if children.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![Value::Tlv(children)]);
        }

        let mut values = Vec::new();
        for avp in self.attributes.iter().filter(|avp| avp.key == def.key) {
            let mut data = avp.value.as_slice();
            if def.has_tag {
                data = strip_tag(def.data_type, data);
            }
            if def.encrypt != 0 {
                values.push(Value::Bytes(data.to_vec()));
                continue;
            }
            if def.has_tag && def.data_type == DataType::Integer {
                // The stripped tagged integer is three octets wide
                let mut widened = [0u8; 4];
                widened[1..].copy_from_slice(data);
                values.push(encoding::decode_value(def.data_type, &widened)?);
            } else {
                values.push(encoding::decode_value(def.data_type, data)?);
            }
        }
        Ok(values)
    }

    /// First decoded value for a named attribute
    pub fn get_first(&self, name: &str) -> Result<Option<Value>, DecodeError> {
        Ok(self.get(name)?.into_iter().next())
    }

    /// The RFC 2868 tag of the first instance of a tagged attribute
    pub fn tag_of(&self, name: &str) -> Result<Option<u8>, DecodeError> {
        let def = self
            .dict
            .attribute(name)
            .ok_or_else(|| DecodeError::UnknownAttribute(name.to_owned()))?;
        if !def.has_tag {
            return Ok(None);
        }
        Ok(self
            .attributes
            .iter()
            .find(|avp| avp.key == def.key)
            .and_then(|avp| avp.value.first())
            .map(|&tag| if tag <= 0x1f { tag } else { 0 }))
    }

    /// True when at least one instance of the named attribute is present
    pub fn contains(&self, name: &str) -> bool {
        self.dict
            .attribute(name)
            .map(|def| self.attributes.iter().any(|avp| avp.key == def.key))
            .unwrap_or(false)
    }

    /// Remove all instances of a named attribute, returning how many
    pub fn remove(&mut self, name: &str) -> usize {
        match self.dict.attribute(name) {
            Some(def) => {
                let key = def.key;
                self.remove_raw(key)
            }
            None => 0,
        }
    }

    /// Copy Proxy-State attributes from a request into this reply
    /// (RFC 2865 Section 5.33)
    pub fn echo_proxy_state(&mut self, request: &Packet) {
        let key = AttrKey::standard(consts::PROXY_STATE);
        for value in request.raw_values(key) {
            let value = value.to_vec();
            self.add_raw(key, value);
        }
    }

    /// Recover the plaintext User-Password of a decoded Access-Request
    pub fn decrypt_password(&self) -> Result<String, DecodeError> {
        let key = AttrKey::standard(consts::USER_PASSWORD);
        let encrypted = self
            .raw_values(key)
            .into_iter()
            .next()
            .ok_or_else(|| DecodeError::UnknownAttribute("User-Password".to_owned()))?;
        let plain = auth::decrypt_user_password(encrypted, &self.secret, &self.authenticator)?;
        String::from_utf8(plain).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Verify the CHAP-Password of a decoded Access-Request against a
    /// user's plaintext password (RFC 2865 Section 2.2)
    ///
    /// The challenge is the CHAP-Challenge attribute when present, the
    /// Request Authenticator otherwise.
    pub fn verify_chap_password(&self, password: &str) -> bool {
        let chap_values = self.raw_values(AttrKey::standard(consts::CHAP_PASSWORD));
        let chap = match chap_values.first() {
            Some(value) if value.len() == 17 => *value,
            _ => return false,
        };
        let ident = chap[0];
        let challenge_values = self.raw_values(AttrKey::standard(consts::CHAP_CHALLENGE));
        let challenge: &[u8] = challenge_values
            .first()
            .copied()
            .unwrap_or(&self.authenticator);

        let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
        data.push(ident);
        data.extend_from_slice(password.as_bytes());
        data.extend_from_slice(challenge);
        md5::compute(&data).0[..] == chap[1..]
    }

    /// Encode an outgoing request, stamping the Request Authenticator
    ///
    /// Access-Request and Status-Server keep their random authenticator;
    /// Accounting-Request, CoA-Request, and Disconnect-Request get the MD5
    /// hash over the zero-authenticator image. A Message-Authenticator is
    /// inserted when flagged or when an EAP-Message attribute is present.
    pub fn encode_request(&mut self) -> Result<Vec<u8>, EncodeError> {
        let ma_key = AttrKey::standard(consts::MESSAGE_AUTHENTICATOR);
        let wants_ma = self.message_authenticator
            || !self
                .raw_values(AttrKey::standard(consts::EAP_MESSAGE))
                .is_empty();
        if wants_ma && self.raw_values(ma_key).is_empty() {
            self.add_raw(ma_key, vec![0u8; 16]);
        }

        let (mut attrs, ma_offset) = self.wire_attributes()?;
        let total = Self::MIN_PACKET_SIZE + attrs.len();
        if total > Self::MAX_PACKET_SIZE {
            return Err(EncodeError::PacketTooLarge(total));
        }
        let header = [
            self.code.as_u8(),
            self.identifier,
            (total >> 8) as u8,
            total as u8,
        ];

        if let Some(offset) = ma_offset {
            let field =
                message_auth::hmac_authenticator_field(self.code, &self.authenticator, None);
            let mut image = Vec::with_capacity(total);
            image.extend_from_slice(&header);
            image.extend_from_slice(&field);
            image.extend_from_slice(&attrs);
            let digest = message_auth::calculate_message_authenticator(&image, &self.secret);
            attrs[offset..offset + 16].copy_from_slice(&digest);
        }

        if self.code.uses_hashed_authenticator() {
            self.authenticator =
                auth::calculate_request_authenticator(&header, &attrs, &self.secret);
        }

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.authenticator);
        out.extend_from_slice(&attrs);
        Ok(out)
    }

    /// Encode a reply, stamping the Response Authenticator
    ///
    /// The packet's authenticator field must hold the Request Authenticator
    /// of the request being answered ([`Packet::reply`] arranges this); it
    /// is replaced with the computed Response Authenticator.
    pub fn encode_response(&mut self) -> Result<Vec<u8>, EncodeError> {
        let ma_key = AttrKey::standard(consts::MESSAGE_AUTHENTICATOR);
        if self.message_authenticator && self.raw_values(ma_key).is_empty() {
            self.add_raw(ma_key, vec![0u8; 16]);
        }

        let (mut attrs, ma_offset) = self.wire_attributes()?;
        let total = Self::MIN_PACKET_SIZE + attrs.len();
        if total > Self::MAX_PACKET_SIZE {
            return Err(EncodeError::PacketTooLarge(total));
        }
        let header = [
            self.code.as_u8(),
            self.identifier,
            (total >> 8) as u8,
            total as u8,
        ];
        let request_authenticator = self.authenticator;

        if let Some(offset) = ma_offset {
            let mut image = Vec::with_capacity(total);
            image.extend_from_slice(&header);
            image.extend_from_slice(&request_authenticator);
            image.extend_from_slice(&attrs);
            let digest = message_auth::calculate_message_authenticator(&image, &self.secret);
            attrs[offset..offset + 16].copy_from_slice(&digest);
        }

        self.authenticator = auth::calculate_response_authenticator(
            &header,
            &request_authenticator,
            &attrs,
            &self.secret,
        );

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.authenticator);
        out.extend_from_slice(&attrs);
        Ok(out)
    }

    /// Decode a received wire image
    ///
    /// Performs full structural validation and, for request codes, verifies
    /// any Message-Authenticator (responses need the original Request
    /// Authenticator, which [`Packet::verify_reply`] supplies). Secret-bound
    /// authenticator checks are separate calls so the embedder controls
    /// where drops happen.
    pub fn decode(raw: &[u8], secret: &[u8], dict: &Arc<Dictionary>) -> Result<Self, DecodeError> {
        if raw.len() < Self::MIN_PACKET_SIZE {
            return Err(DecodeError::Truncated(raw.len()));
        }
        let code = Code::from_u8(raw[0]).ok_or(DecodeError::InvalidCode(raw[0]))?;
        let identifier = raw[1];
        let length = usize::from(raw[2]) << 8 | usize::from(raw[3]);
        if !(Self::MIN_PACKET_SIZE..=Self::MAX_PACKET_SIZE).contains(&length) {
            return Err(DecodeError::InvalidLength(length));
        }
        if raw.len() < length {
            return Err(DecodeError::Truncated(raw.len()));
        }
        let raw = &raw[..length];

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&raw[4..20]);

        let mut attributes = Vec::new();
        let mut message_authenticator = false;
        // Continuation state for RFC 6929 long-extended fragments
        let mut pending_more: Option<AttrKey> = None;
        // Merge state for >253-octet values split across instances
        let mut last_standard: Option<(AttrKey, usize)> = None;

        let mut offset = Self::MIN_PACKET_SIZE;
        while offset < length {
            if offset + 2 > length {
                return Err(DecodeError::AttributeOverrun);
            }
            let attr_type = raw[offset];
            let attr_len = usize::from(raw[offset + 1]);
            if attr_len < 2 {
                return Err(DecodeError::InvalidAttributeLength(attr_len));
            }
            if offset + attr_len > length {
                return Err(DecodeError::AttributeOverrun);
            }
            let value = &raw[offset + 2..offset + attr_len];

            match attr_type {
                consts::VENDOR_SPECIFIC => {
                    decode_vsa(dict, value, &mut attributes)?;
                    pending_more = None;
                    last_standard = None;
                }
                241..=246 => {
                    if value.is_empty() {
                        return Err(DecodeError::InvalidAttributeLength(attr_len));
                    }
                    let key = AttrKey {
                        vendor: None,
                        parent: Some(u32::from(attr_type)),
                        code: u32::from(value[0]),
                    };
                    let (data, more) = if attr_type >= 245 {
                        if value.len() < 2 {
                            return Err(DecodeError::InvalidAttributeLength(attr_len));
                        }
                        (&value[2..], value[1] & 0x80 != 0)
                    } else {
                        (&value[1..], false)
                    };
                    if pending_more == Some(key) {
                        let last = attributes.last_mut().expect("continuation has a head");
                        last.value.extend_from_slice(data);
                    } else {
                        attributes.push(Avp {
                            key,
                            value: data.to_vec(),
                        });
                    }
                    pending_more = if more { Some(key) } else { None };
                    last_standard = None;
                }
                _ => {
                    let key = AttrKey::standard(u32::from(attr_type));
                    let def = dict.find_by_code(key);

                    if attr_type == 80 {
                        if value.len() != 16 {
                            return Err(DecodeError::InvalidAttributeLength(attr_len));
                        }
                        message_authenticator = true;
                    }

                    if def.map(|d| d.data_type) == Some(DataType::Tlv) {
                        expand_tlv(None, u32::from(attr_type), value, &mut attributes)?;
                        last_standard = None;
                    } else {
                        let splittable = def
                            .map(|d| {
                                matches!(
                                    d.data_type,
                                    DataType::String | DataType::Octets | DataType::Abinary
                                )
                            })
                            .unwrap_or(true);
                        if splittable && last_standard == Some((key, MAX_VALUE_LEN)) {
                            let last = attributes.last_mut().expect("merge has a head");
                            last.value.extend_from_slice(value);
                        } else {
                            attributes.push(Avp {
                                key,
                                value: value.to_vec(),
                            });
                        }
                        last_standard = Some((key, value.len()));
                    }
                    pending_more = None;
                }
            }
            offset += attr_len;
        }

        if message_authenticator
            && code.is_request()
            && !message_auth::verify_message_authenticator(raw, secret, code, None)
        {
            return Err(AuthError::MessageAuthenticator.into());
        }

        Ok(Packet {
            code,
            identifier,
            authenticator,
            secret: secret.to_vec(),
            dict: Arc::clone(dict),
            attributes,
            message_authenticator,
            raw: Some(raw.to_vec()),
        })
    }

    /// Verify the hashed Request Authenticator of a decoded
    /// Accounting/CoA/Disconnect request
    pub fn verify_request_authenticator(&self) -> bool {
        match (&self.raw, self.code.uses_hashed_authenticator()) {
            (Some(raw), true) => auth::verify_request_authenticator(raw, &self.secret),
            _ => false,
        }
    }

    /// Verify a decoded reply against this request
    ///
    /// Checks the identifier, the reply code, the Response Authenticator,
    /// and the Message-Authenticator when present.
    pub fn verify_reply(&self, reply: &Packet) -> bool {
        if reply.identifier != self.identifier {
            return false;
        }
        if !self.code.expected_responses().contains(&reply.code) {
            return false;
        }
        let raw = match reply.raw() {
            Some(raw) => raw,
            None => return false,
        };
        if !auth::verify_response_authenticator(raw, &self.authenticator, &self.secret) {
            return false;
        }
        if message_auth::message_authenticator_offset(raw).is_some() {
            return message_auth::verify_message_authenticator(
                raw,
                &self.secret,
                reply.code,
                Some(&self.authenticator),
            );
        }
        true
    }

    /// Serialize the attribute list, returning the bytes and the offset of
    /// the (zeroed) Message-Authenticator value within them
    fn wire_attributes(&self) -> Result<(Vec<u8>, Option<usize>), EncodeError> {
        let mut out = Vec::new();
        let mut ma_offset = None;
        let mut emitted_tlv: HashSet<(Option<u32>, u32)> = HashSet::new();

        for avp in &self.attributes {
            let key = avp.key;

            if key == AttrKey::standard(consts::MESSAGE_AUTHENTICATOR) {
                out.push(80);
                out.push(18);
                ma_offset = Some(out.len());
                out.extend_from_slice(&[0u8; 16]);
                continue;
            }

            if key.is_extended() {
                emit_extended(&mut out, key.parent.unwrap() as u8, key.code, &avp.value)?;
                continue;
            }

            if let Some(parent) = key.parent {
                // TLV children group under one (or more) parent attributes
                // at the position of the first child.
                if !emitted_tlv.insert((key.vendor, parent)) {
                    continue;
                }
                let chunks = self.collect_tlv_chunks(key.vendor, parent)?;
                for chunk in chunks {
                    match key.vendor {
                        Some(vendor) => emit_vsa(
                            &mut out,
                            vendor,
                            parent,
                            &chunk,
                            self.dict.vendor_format(vendor),
                        )?,
                        None => emit_standard(&mut out, parent, &chunk)?,
                    }
                }
                continue;
            }

            match key.vendor {
                Some(vendor) => emit_vsa(
                    &mut out,
                    vendor,
                    key.code,
                    &avp.value,
                    self.dict.vendor_format(vendor),
                )?,
                None => emit_standard(&mut out, key.code, &avp.value)?,
            }
        }

        Ok((out, ma_offset))
    }

    fn collect_tlv_chunks(
        &self,
        vendor: Option<u32>,
        parent: u32,
    ) -> Result<Vec<Vec<u8>>, EncodeError> {
        // Sub-attributes of one TLV must share its 253-octet envelope; a
        // vendor envelope additionally spends 4 octets on the vendor id and
        // the sub-attribute header.
        let limit = if vendor.is_some() { 247 } else { 251 };
        let mut chunks: Vec<Vec<u8>> = vec![Vec::new()];
        for child in self
            .attributes
            .iter()
            .filter(|avp| avp.key.vendor == vendor && avp.key.parent == Some(parent))
        {
            if child.key.code > 0xff || child.value.len() > MAX_VALUE_LEN {
                return Err(EncodeError::Oversize(child.value.len()));
            }
            let mut sub = Vec::with_capacity(child.value.len() + 2);
            sub.push(child.key.code as u8);
            sub.push((child.value.len() + 2) as u8);
            sub.extend_from_slice(&child.value);

            let current = chunks.last_mut().expect("chunk list is never empty");
            if current.len() + sub.len() > limit {
                chunks.push(sub);
            } else {
                current.extend_from_slice(&sub);
            }
        }
        Ok(chunks)
    }
}

/// Emit a standard attribute, splitting values over 253 octets across
/// multiple instances (RFC 2865 Section 5.1.5)
fn emit_standard(out: &mut Vec<u8>, code: u32, value: &[u8]) -> Result<(), EncodeError> {
    if code > 0xff {
        return Err(EncodeError::InvalidValue {
            datatype: "attribute",
            reason: format!("code {code} does not fit a standard attribute"),
        });
    }
    if value.is_empty() {
        out.push(code as u8);
        out.push(2);
        return Ok(());
    }
    for chunk in value.chunks(MAX_VALUE_LEN) {
        out.push(code as u8);
        out.push((chunk.len() + 2) as u8);
        out.extend_from_slice(chunk);
    }
    Ok(())
}

/// Emit an RFC 6929 extended attribute
///
/// Parents 241-244 are the short form (one extra sub-type octet); 245-246
/// are the long form whose flags octet carries the More bit for
/// continuation across fragments.
fn emit_extended(out: &mut Vec<u8>, parent: u8, ext: u32, value: &[u8]) -> Result<(), EncodeError> {
    if ext > 0xff {
        return Err(EncodeError::InvalidValue {
            datatype: "attribute",
            reason: format!("extended sub-type {ext} out of range"),
        });
    }
    if parent < 245 {
        if value.len() > MAX_VALUE_LEN - 1 {
            return Err(EncodeError::Oversize(value.len()));
        }
        out.push(parent);
        out.push((value.len() + 3) as u8);
        out.push(ext as u8);
        out.extend_from_slice(value);
        return Ok(());
    }

    let fragment = MAX_VALUE_LEN - 2;
    let mut chunks: Vec<&[u8]> = value.chunks(fragment).collect();
    if chunks.is_empty() {
        chunks.push(&[]);
    }
    let last = chunks.len() - 1;
    for (index, chunk) in chunks.into_iter().enumerate() {
        out.push(parent);
        out.push((chunk.len() + 4) as u8);
        out.push(ext as u8);
        out.push(if index < last { 0x80 } else { 0x00 });
        out.extend_from_slice(chunk);
    }
    Ok(())
}

/// Wrap a vendor sub-attribute in a Vendor-Specific envelope
fn emit_vsa(
    out: &mut Vec<u8>,
    vendor: u32,
    sub_code: u32,
    value: &[u8],
    format: (u8, u8),
) -> Result<(), EncodeError> {
    let (type_width, length_width) = format;
    let type_width = usize::from(type_width);
    let length_width = usize::from(length_width);

    let sub_total = type_width + length_width + value.len();
    if 2 + 4 + sub_total > 255 {
        return Err(EncodeError::Oversize(value.len()));
    }
    let max_code = match type_width {
        1 => 0xff,
        2 => 0xffff,
        _ => u32::MAX,
    };
    if sub_code > max_code {
        return Err(EncodeError::InvalidValue {
            datatype: "attribute",
            reason: format!("vendor sub-type {sub_code} does not fit {type_width} octet(s)"),
        });
    }

    out.push(consts::VENDOR_SPECIFIC);
    out.push((2 + 4 + sub_total) as u8);
    out.extend_from_slice(&vendor.to_be_bytes());
    out.extend_from_slice(&sub_code.to_be_bytes()[4 - type_width..]);
    match length_width {
        0 => {}
        1 => out.push(sub_total as u8),
        _ => out.extend_from_slice(&(sub_total as u16).to_be_bytes()),
    }
    out.extend_from_slice(value);
    Ok(())
}

/// Unwrap a Vendor-Specific attribute into vendor-scoped sub-attributes
///
/// Known vendors are parsed with their declared format and rejected when
/// malformed; an unparseable payload from an unknown vendor is kept as the
/// opaque type-26 attribute.
fn decode_vsa(
    dict: &Arc<Dictionary>,
    value: &[u8],
    attributes: &mut Vec<Avp>,
) -> Result<(), DecodeError> {
    if value.len() < 4 {
        return Err(DecodeError::MalformedVsa);
    }
    let vendor = u32::from_be_bytes(value[..4].try_into().expect("length checked"));
    let known = dict.vendor_by_id(vendor).is_some();
    let format = dict.vendor_format(vendor);

    match parse_vsa_subs(dict, vendor, format, &value[4..]) {
        Ok(subs) => {
            attributes.extend(subs);
            Ok(())
        }
        Err(error) if known => Err(error),
        Err(_) => {
            attributes.push(Avp {
                key: AttrKey::standard(u32::from(consts::VENDOR_SPECIFIC)),
                value: value.to_vec(),
            });
            Ok(())
        }
    }
}

fn parse_vsa_subs(
    dict: &Arc<Dictionary>,
    vendor: u32,
    format: (u8, u8),
    mut rest: &[u8],
) -> Result<Vec<Avp>, DecodeError> {
    let (type_width, length_width) = (usize::from(format.0), usize::from(format.1));
    let mut subs = Vec::new();

    while !rest.is_empty() {
        if rest.len() < type_width + length_width {
            return Err(DecodeError::MalformedVsa);
        }
        let mut code_bytes = [0u8; 4];
        code_bytes[4 - type_width..].copy_from_slice(&rest[..type_width]);
        let sub_code = u32::from_be_bytes(code_bytes);

        let (data, consumed) = if length_width == 0 {
            // Without a length field a single sub-attribute fills the VSA
            (&rest[type_width..], rest.len())
        } else {
            let mut len_bytes = [0u8; 2];
            len_bytes[2 - length_width..]
                .copy_from_slice(&rest[type_width..type_width + length_width]);
            let sub_len = usize::from(u16::from_be_bytes(len_bytes));
            if sub_len < type_width + length_width || sub_len > rest.len() {
                return Err(DecodeError::MalformedVsa);
            }
            (&rest[type_width + length_width..sub_len], sub_len)
        };

        let key = AttrKey {
            vendor: Some(vendor),
            parent: None,
            code: sub_code,
        };
        if dict.find_by_code(key).map(|d| d.data_type) == Some(DataType::Tlv) {
            expand_tlv(Some(vendor), sub_code, data, &mut subs)?;
        } else {
            subs.push(Avp {
                key,
                value: data.to_vec(),
            });
        }
        rest = &rest[consumed..];
    }
    Ok(subs)
}

/// Split a TLV payload into individually keyed sub-attributes
fn expand_tlv(
    vendor: Option<u32>,
    parent: u32,
    data: &[u8],
    attributes: &mut Vec<Avp>,
) -> Result<(), DecodeError> {
    let mut rest = data;
    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(DecodeError::AttributeOverrun);
        }
        let code = u32::from(rest[0]);
        let len = usize::from(rest[1]);
        if len < 2 || len > rest.len() {
            return Err(DecodeError::InvalidAttributeLength(len));
        }
        attributes.push(Avp {
            key: AttrKey {
                vendor,
                parent: Some(parent),
                code,
            },
            value: rest[2..len].to_vec(),
        });
        rest = &rest[len..];
    }
    Ok(())
}

/// Strip the RFC 2868 tag octet from a wire value
fn strip_tag(datatype: DataType, data: &[u8]) -> &[u8] {
    match datatype {
        // String-typed tags are only present when the first octet is in
        // the tag range.
        DataType::String | DataType::Text | DataType::Octets => match data.first() {
            Some(&tag) if tag <= 0x1f => &data[1..],
            _ => data,
        },
        _ if !data.is_empty() => &data[1..],
        _ => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> Arc<Dictionary> {
        Arc::new(
            Dictionary::parse_str(
                "test",
                "\
ATTRIBUTE User-Name 1 string
ATTRIBUTE User-Password 2 string encrypt=1
ATTRIBUTE NAS-IP-Address 4 ipaddr
ATTRIBUTE NAS-Port 5 integer
ATTRIBUTE Service-Type 6 integer
ATTRIBUTE Framed-IP-Address 8 ipaddr
ATTRIBUTE Reply-Message 18 string
ATTRIBUTE State 24 string
ATTRIBUTE Class 25 octets
ATTRIBUTE Session-Timeout 27 integer
ATTRIBUTE Proxy-State 33 octets
ATTRIBUTE Acct-Status-Type 40 integer
ATTRIBUTE Acct-Delay-Time 41 integer
ATTRIBUTE Acct-Session-Id 44 string
ATTRIBUTE Tunnel-Type 64 integer has_tag
ATTRIBUTE Tunnel-Medium-Type 65 integer has_tag
ATTRIBUTE Tunnel-Password 69 string has_tag,encrypt=2
ATTRIBUTE EAP-Message 79 octets
ATTRIBUTE Message-Authenticator 80 octets
ATTRIBUTE Frag-Status 241.1 integer
ATTRIBUTE Extended-Blob 245.4 octets
VALUE Service-Type Login-User 1
VALUE Service-Type Framed-User 2
VALUE Acct-Status-Type Start 1
VALUE Acct-Status-Type Stop 2
VENDOR Cisco 9
BEGIN-VENDOR Cisco
ATTRIBUTE Cisco-AVPair 1 string
END-VENDOR Cisco
VENDOR WidePort 311 format=2,1
BEGIN-VENDOR WidePort
ATTRIBUTE WidePort-Group 5 string
END-VENDOR WidePort
",
            )
            .unwrap(),
        )
    }

    #[test]
    fn rfc2865_section_7_1_access_request_wire_image() {
        // The worked example from RFC 2865 Section 7.1: user "nemo",
        // password "arctangent", NAS 192.168.1.16 port 3, secret
        // "xyzzy5461".
        let authenticator = [
            0x0f, 0x40, 0x3f, 0x94, 0x73, 0x97, 0x80, 0x57, 0xbd, 0x83, 0xd5, 0xcb, 0x98, 0xf4,
            0x22, 0x7a,
        ];
        let mut packet = Packet::new(Code::AccessRequest, &b"xyzzy5461"[..], dict())
            .with_authenticator(authenticator)
            .with_identifier(0);
        packet.add("User-Name", "nemo").unwrap();
        packet.add("User-Password", "arctangent").unwrap();
        packet.add("NAS-IP-Address", "192.168.1.16").unwrap();
        packet.add("NAS-Port", 3u32).unwrap();

        let wire = packet.encode_request().unwrap();
        let mut expected = vec![0x01, 0x00, 0x00, 0x38];
        expected.extend_from_slice(&authenticator);
        expected.extend_from_slice(&[0x01, 0x06, 0x6e, 0x65, 0x6d, 0x6f]);
        expected.extend_from_slice(&[
            0x02, 0x12, 0x0d, 0xbe, 0x70, 0x8d, 0x93, 0xd4, 0x13, 0xce, 0x31, 0x96, 0xe4, 0x3f,
            0x78, 0x2a, 0x0a, 0xee,
        ]);
        expected.extend_from_slice(&[0x04, 0x06, 0xc0, 0xa8, 0x01, 0x10]);
        expected.extend_from_slice(&[0x05, 0x06, 0x00, 0x00, 0x00, 0x03]);
        assert_eq!(wire, expected);

        assert_eq!(packet.decrypt_password().unwrap(), "arctangent");
    }

    #[test]
    fn encode_decode_round_trip_preserves_attributes() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"secret"[..], Arc::clone(&d));
        packet.add("User-Name", "alice").unwrap();
        packet.add("NAS-Port", 7u32).unwrap();
        packet.add("Framed-IP-Address", "10.0.0.1").unwrap();
        packet.add("Reply-Message", "first").unwrap();
        packet.add("Reply-Message", "second").unwrap();

        let wire = packet.encode_request().unwrap();
        let decoded = Packet::decode(&wire, b"secret", &d).unwrap();

        assert_eq!(decoded.code, packet.code);
        assert_eq!(decoded.identifier, packet.identifier);
        assert_eq!(decoded.authenticator, packet.authenticator);
        assert_eq!(decoded.attributes(), packet.attributes());

        // Duplicates stay ordered
        let messages = decoded.get("Reply-Message").unwrap();
        assert_eq!(
            messages,
            vec![Value::Text("first".into()), Value::Text("second".into())]
        );
    }

    #[test]
    fn symbolic_values_encode_to_integers() {
        let d = dict();
        let mut packet = Packet::new(Code::AccountingRequest, &b"s"[..], Arc::clone(&d));
        packet.add("Acct-Status-Type", "Start").unwrap();
        assert_eq!(
            packet.get_first("Acct-Status-Type").unwrap(),
            Some(Value::Integer(1))
        );

        let err = packet.add("Acct-Status-Type", "Nonsense").unwrap_err();
        assert!(matches!(err, EncodeError::UnknownValue { .. }));
    }

    #[test]
    fn unknown_attribute_names_are_encode_errors() {
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], dict());
        assert!(matches!(
            packet.add("No-Such-Thing", "x"),
            Err(EncodeError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn accounting_request_authenticator_is_the_hash() {
        let d = dict();
        let mut packet = Packet::new(Code::AccountingRequest, &b"s"[..], d).with_identifier(0);
        let wire = packet.encode_request().unwrap();

        let mut digest_input = Vec::new();
        digest_input.extend_from_slice(&[0x04, 0x00, 0x00, 0x14]);
        digest_input.extend_from_slice(&[0u8; 16]);
        digest_input.push(b's');
        assert_eq!(wire[4..20], md5::compute(&digest_input).0);
        assert_eq!(wire.len(), 20);
    }

    #[test]
    fn response_authenticator_verifies_and_rejects_tampering() {
        let d = dict();
        let mut request = Packet::new(Code::AccessRequest, &b"secret"[..], Arc::clone(&d));
        request.add("User-Name", "bob").unwrap();
        let request_wire = request.encode_request().unwrap();
        let decoded_request = Packet::decode(&request_wire, b"secret", &d).unwrap();

        let mut reply = decoded_request.reply(Code::AccessAccept);
        reply.add("Reply-Message", "welcome").unwrap();
        let reply_wire = reply.encode_response().unwrap();

        let decoded_reply = Packet::decode(&reply_wire, b"secret", &d).unwrap();
        assert!(request.verify_reply(&decoded_reply));

        // Any flipped byte invalidates the reply
        for index in 0..reply_wire.len() {
            let mut tampered = reply_wire.clone();
            tampered[index] ^= 0x01;
            if let Ok(bad) = Packet::decode(&tampered, b"secret", &d) {
                assert!(!request.verify_reply(&bad), "byte {index} tamper accepted");
            }
        }

        // A reply produced with secret S must not verify under S'
        assert!(!auth::verify_response_authenticator(
            &reply_wire,
            &request.authenticator,
            b"other"
        ));
    }

    #[test]
    fn cisco_vsa_wire_format() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], d);
        packet.add("Cisco-AVPair", "shell:priv-lvl=15").unwrap();

        let wire = packet.encode_request().unwrap();
        let attrs = &wire[20..];
        assert_eq!(attrs[0], 0x1a);
        assert_eq!(attrs[1], 0x19);
        assert_eq!(&attrs[2..6], &[0x00, 0x00, 0x00, 0x09]);
        assert_eq!(attrs[6], 0x01);
        assert_eq!(attrs[7], 0x13);
        assert_eq!(&attrs[8..], b"shell:priv-lvl=15");
    }

    #[test]
    fn vsa_round_trip_with_wide_type_format() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        packet.add("WidePort-Group", "operators").unwrap();

        let wire = packet.encode_request().unwrap();
        let decoded = Packet::decode(&wire, b"s", &d).unwrap();

        assert_eq!(decoded.attributes(), packet.attributes());
        assert_eq!(
            decoded.get_first("WidePort-Group").unwrap(),
            Some(Value::Text("operators".into()))
        );
        let avp = &decoded.attributes()[0];
        assert_eq!(avp.key, AttrKey::vendor(311, 5));
    }

    #[test]
    fn long_values_split_and_merge() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        let blob = vec![0x5a; 300];
        packet.add("Class", blob.clone()).unwrap();

        let wire = packet.encode_request().unwrap();
        // Two instances of type 25 on the wire
        let attrs = &wire[20..];
        assert_eq!(attrs[0], 25);
        assert_eq!(usize::from(attrs[1]), 255);
        let second = 255;
        assert_eq!(attrs[second], 25);
        assert_eq!(usize::from(attrs[second + 1]), 300 - 253 + 2);

        let decoded = Packet::decode(&wire, b"s", &d).unwrap();
        assert_eq!(
            decoded.get_first("Class").unwrap(),
            Some(Value::Bytes(blob))
        );
    }

    #[test]
    fn long_extended_attributes_carry_the_more_flag() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        let blob = vec![0xa5; 400];
        packet.add("Extended-Blob", blob.clone()).unwrap();

        let wire = packet.encode_request().unwrap();
        let attrs = &wire[20..];
        assert_eq!(attrs[0], 245);
        assert_eq!(attrs[2], 4);
        assert_eq!(attrs[3], 0x80);
        let first_len = usize::from(attrs[1]);
        assert_eq!(attrs[first_len], 245);
        assert_eq!(attrs[first_len + 3], 0x00);

        let decoded = Packet::decode(&wire, b"s", &d).unwrap();
        assert_eq!(
            decoded.get_first("Extended-Blob").unwrap(),
            Some(Value::Bytes(blob))
        );
    }

    #[test]
    fn short_extended_attribute_round_trip() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        packet.add("Frag-Status", 2u32).unwrap();

        let wire = packet.encode_request().unwrap();
        let attrs = &wire[20..];
        assert_eq!(attrs[0], 241);
        assert_eq!(attrs[1], 7);
        assert_eq!(attrs[2], 1);

        let decoded = Packet::decode(&wire, b"s", &d).unwrap();
        assert_eq!(
            decoded.get_first("Frag-Status").unwrap(),
            Some(Value::Integer(2))
        );
    }

    #[test]
    fn tagged_attributes_round_trip() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        packet.add("Tunnel-Type:1", 3u32).unwrap();

        let wire = packet.encode_request().unwrap();
        let attrs = &wire[20..];
        assert_eq!(attrs[0], 64);
        assert_eq!(attrs[1], 6);
        assert_eq!(attrs[2], 1); // tag replaces the first integer octet
        assert_eq!(&attrs[3..6], &[0, 0, 3]);

        let decoded = Packet::decode(&wire, b"s", &d).unwrap();
        assert_eq!(
            decoded.get_first("Tunnel-Type").unwrap(),
            Some(Value::Integer(3))
        );
        assert_eq!(decoded.tag_of("Tunnel-Type").unwrap(), Some(1));
    }

    #[test]
    fn tunnel_password_is_salted_and_recoverable() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"secret"[..], Arc::clone(&d));
        packet.add("Tunnel-Password:1", "tunnelpw").unwrap();

        let wire = packet.encode_request().unwrap();
        let decoded = Packet::decode(&wire, b"secret", &d).unwrap();
        let obfuscated = decoded.get_first("Tunnel-Password").unwrap().unwrap();
        let Value::Bytes(cipher) = obfuscated else {
            panic!("encrypted attribute must decode as bytes");
        };
        assert!(cipher[0] & 0x80 != 0);
        let plain = auth::salt_decrypt(&cipher, b"secret", &packet.authenticator).unwrap();
        assert_eq!(plain, b"tunnelpw");
    }

    #[test]
    fn message_authenticator_is_stamped_and_verified() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"secret"[..], Arc::clone(&d));
        packet.add("User-Name", "eve").unwrap();
        packet
            .add("EAP-Message", vec![0x02, 0x00, 0x00, 0x05, 0x01])
            .unwrap();

        let wire = packet.encode_request().unwrap();
        // EAP-Message mandates a Message-Authenticator
        assert!(message_auth::message_authenticator_offset(&wire).is_some());
        assert!(Packet::decode(&wire, b"secret", &d).is_ok());

        // Tampering after the HMAC was computed must be rejected
        let mut tampered = wire.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0xff;
        assert!(matches!(
            Packet::decode(&tampered, b"secret", &d),
            Err(DecodeError::Auth(AuthError::MessageAuthenticator))
        ));

        // Wrong secret fails HMAC verification
        assert!(Packet::decode(&wire, b"other", &d).is_err());
    }

    #[test]
    fn tlv_children_group_under_one_parent() {
        let d = Arc::new(
            Dictionary::parse_str(
                "tlv",
                "\
ATTRIBUTE Top-Frame 190 tlv
ATTRIBUTE Frame-Kind 190.1 integer
ATTRIBUTE Frame-Label 190.2 string
",
            )
            .unwrap(),
        );
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        packet.add("Frame-Kind", 7u32).unwrap();
        packet.add("Frame-Label", "edge").unwrap();

        let wire = packet.encode_request().unwrap();
        let attrs = &wire[20..];
        assert_eq!(attrs[0], 190);
        assert_eq!(usize::from(attrs[1]), 2 + 6 + 6);

        let decoded = Packet::decode(&wire, b"s", &d).unwrap();
        let Some(Value::Tlv(children)) = decoded.get_first("Top-Frame").unwrap() else {
            panic!("expected tlv value");
        };
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], (1, vec![0, 0, 0, 7]));
        assert_eq!(children[1], (2, b"edge".to_vec()));
    }

    #[test]
    fn chap_password_verifies_against_the_authenticator_challenge() {
        let d = Arc::new(
            Dictionary::parse_str(
                "chap",
                "ATTRIBUTE User-Name 1 string\nATTRIBUTE CHAP-Password 3 octets\nATTRIBUTE CHAP-Challenge 60 octets\n",
            )
            .unwrap(),
        );
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        packet.add("User-Name", "alice").unwrap();

        // NAS side: response = MD5(ident + password + challenge)
        let ident = 0x2au8;
        let mut input = vec![ident];
        input.extend_from_slice(b"wonderland");
        input.extend_from_slice(&packet.authenticator);
        let mut chap = vec![ident];
        chap.extend_from_slice(&md5::compute(&input).0);
        packet.add("CHAP-Password", chap).unwrap();

        assert!(packet.verify_chap_password("wonderland"));
        assert!(!packet.verify_chap_password("queenofhearts"));
    }

    #[test]
    fn malformed_packets_are_rejected() {
        let d = dict();
        // Too short
        assert!(matches!(
            Packet::decode(&[0u8; 19], b"s", &d),
            Err(DecodeError::Truncated(19))
        ));
        // Unknown code
        let mut wire = vec![99, 0, 0, 20];
        wire.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            Packet::decode(&wire, b"s", &d),
            Err(DecodeError::InvalidCode(99))
        ));
        // Length field larger than the buffer
        let mut wire = vec![1, 0, 0, 30];
        wire.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            Packet::decode(&wire, b"s", &d),
            Err(DecodeError::Truncated(_))
        ));
        // Attribute length below the header size
        let mut wire = vec![1, 0, 0, 22];
        wire.extend_from_slice(&[0u8; 16]);
        wire.extend_from_slice(&[1, 1]);
        assert!(matches!(
            Packet::decode(&wire, b"s", &d),
            Err(DecodeError::InvalidAttributeLength(1))
        ));
        // Attribute overrunning the packet
        let mut wire = vec![1, 0, 0, 24];
        wire.extend_from_slice(&[0u8; 16]);
        wire.extend_from_slice(&[1, 10, b'x', b'y']);
        assert!(matches!(
            Packet::decode(&wire, b"s", &d),
            Err(DecodeError::AttributeOverrun)
        ));
    }

    #[test]
    fn wire_length_conflicting_with_type_is_rejected_on_get() {
        let d = dict();
        // NAS-Port is integer; hand it three octets
        let mut wire = vec![1, 0, 0, 25];
        wire.extend_from_slice(&[0u8; 16]);
        wire.extend_from_slice(&[5, 5, 1, 2, 3]);
        let decoded = Packet::decode(&wire, b"s", &d).unwrap();
        assert!(decoded.get("NAS-Port").is_err());
    }

    #[test]
    fn proxy_state_echo_preserves_order() {
        let d = dict();
        let mut request = Packet::new(Code::AccessRequest, &b"s"[..], Arc::clone(&d));
        request.add("Proxy-State", vec![1u8, 2]).unwrap();
        request.add("Proxy-State", vec![3u8, 4]).unwrap();

        let mut reply = request.reply(Code::AccessAccept);
        reply.echo_proxy_state(&request);
        let values = reply.raw_values(AttrKey::standard(33));
        assert_eq!(values, vec![&[1u8, 2][..], &[3u8, 4][..]]);
    }

    #[test]
    fn remove_and_contains() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], d);
        packet.add("User-Name", "zoe").unwrap();
        assert!(packet.contains("User-Name"));
        assert_eq!(packet.remove("User-Name"), 1);
        assert!(!packet.contains("User-Name"));
        assert_eq!(packet.remove("User-Name"), 0);
    }

    #[test]
    fn oversize_packet_is_an_encode_error() {
        let d = dict();
        let mut packet = Packet::new(Code::AccessRequest, &b"s"[..], d);
        for _ in 0..20 {
            packet.add("Class", vec![0u8; 250]).unwrap();
        }
        assert!(matches!(
            packet.encode_request(),
            Err(EncodeError::PacketTooLarge(_))
        ));
    }
}
