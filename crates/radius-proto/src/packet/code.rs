/// RADIUS packet codes (RFC 2865 Section 4, RFC 2866, RFC 5176)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Code {
    /// Access-Request (1)
    AccessRequest = 1,
    /// Access-Accept (2)
    AccessAccept = 2,
    /// Access-Reject (3)
    AccessReject = 3,
    /// Accounting-Request (4) - RFC 2866
    AccountingRequest = 4,
    /// Accounting-Response (5) - RFC 2866
    AccountingResponse = 5,
    /// Access-Challenge (11)
    AccessChallenge = 11,
    /// Status-Server (12) - RFC 5997
    StatusServer = 12,
    /// Status-Client (13) - RFC 5997
    StatusClient = 13,
    /// Disconnect-Request (40) - RFC 5176
    DisconnectRequest = 40,
    /// Disconnect-ACK (41) - RFC 5176
    DisconnectAck = 41,
    /// Disconnect-NAK (42) - RFC 5176
    DisconnectNak = 42,
    /// CoA-Request (43) - RFC 5176
    CoARequest = 43,
    /// CoA-ACK (44) - RFC 5176
    CoAAck = 44,
    /// CoA-NAK (45) - RFC 5176
    CoANak = 45,
}

impl Code {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Code::AccessRequest),
            2 => Some(Code::AccessAccept),
            3 => Some(Code::AccessReject),
            4 => Some(Code::AccountingRequest),
            5 => Some(Code::AccountingResponse),
            11 => Some(Code::AccessChallenge),
            12 => Some(Code::StatusServer),
            13 => Some(Code::StatusClient),
            40 => Some(Code::DisconnectRequest),
            41 => Some(Code::DisconnectAck),
            42 => Some(Code::DisconnectNak),
            43 => Some(Code::CoARequest),
            44 => Some(Code::CoAAck),
            45 => Some(Code::CoANak),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for codes a client originates
    pub fn is_request(self) -> bool {
        matches!(
            self,
            Code::AccessRequest
                | Code::AccountingRequest
                | Code::StatusServer
                | Code::StatusClient
                | Code::DisconnectRequest
                | Code::CoARequest
        )
    }

    /// Request codes whose Request Authenticator is random (RFC 2865 Section 3)
    pub fn uses_random_authenticator(self) -> bool {
        matches!(
            self,
            Code::AccessRequest | Code::StatusServer | Code::StatusClient
        )
    }

    /// Request codes whose Request Authenticator is an MD5 hash over the
    /// packet with a zeroed authenticator field (RFC 2866, RFC 5176)
    pub fn uses_hashed_authenticator(self) -> bool {
        matches!(
            self,
            Code::AccountingRequest | Code::DisconnectRequest | Code::CoARequest
        )
    }

    /// The reply codes a request may legitimately be answered with
    pub fn expected_responses(self) -> &'static [Code] {
        match self {
            Code::AccessRequest => &[
                Code::AccessAccept,
                Code::AccessReject,
                Code::AccessChallenge,
            ],
            Code::AccountingRequest => &[Code::AccountingResponse],
            Code::StatusServer => &[Code::AccessAccept, Code::AccountingResponse],
            Code::DisconnectRequest => &[Code::DisconnectAck, Code::DisconnectNak],
            Code::CoARequest => &[Code::CoAAck, Code::CoANak],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_codes() {
        for value in [1u8, 2, 3, 4, 5, 11, 12, 13, 40, 41, 42, 43, 44, 45] {
            let code = Code::from_u8(value).unwrap();
            assert_eq!(code.as_u8(), value);
        }
        assert!(Code::from_u8(99).is_none());
    }

    #[test]
    fn authenticator_style_partitions_requests() {
        assert!(Code::AccessRequest.uses_random_authenticator());
        assert!(Code::AccountingRequest.uses_hashed_authenticator());
        assert!(Code::CoARequest.uses_hashed_authenticator());
        assert!(Code::DisconnectRequest.uses_hashed_authenticator());
        assert!(!Code::AccessAccept.is_request());
    }

    #[test]
    fn expected_responses_match_request_kind() {
        assert!(Code::AccessRequest
            .expected_responses()
            .contains(&Code::AccessChallenge));
        assert_eq!(
            Code::CoARequest.expected_responses(),
            &[Code::CoAAck, Code::CoANak]
        );
        assert!(Code::AccessAccept.expected_responses().is_empty());
    }
}
