//! The shipped dictionary set must load and resolve the working core

use radius_proto::{AttrKey, DataType, Dictionary};
use std::path::Path;

fn shipped() -> Dictionary {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../dictionaries/dictionary");
    Dictionary::load(path).expect("shipped dictionary must parse")
}

#[test]
fn base_dictionary_loads_through_includes() {
    let dict = shipped();
    assert!(dict.len() > 80);

    let user_name = dict.attribute("User-Name").unwrap();
    assert_eq!(user_name.key, AttrKey::standard(1));
    assert_eq!(user_name.data_type, DataType::String);

    let password = dict.attribute("User-Password").unwrap();
    assert_eq!(password.encrypt, 1);

    let message_auth = dict.find_by_code(AttrKey::standard(80)).unwrap();
    assert_eq!(message_auth.name, "Message-Authenticator");
}

#[test]
fn tunnel_attributes_carry_their_flags() {
    let dict = shipped();
    let tunnel_password = dict.attribute("Tunnel-Password").unwrap();
    assert!(tunnel_password.has_tag);
    assert_eq!(tunnel_password.encrypt, 2);

    let tunnel_type = dict.attribute("Tunnel-Type").unwrap();
    assert!(tunnel_type.has_tag);
    assert_eq!(dict.value_by_name("Tunnel-Type", "L2TP"), Some(3));
}

#[test]
fn enumerated_values_resolve_both_ways() {
    let dict = shipped();
    assert_eq!(dict.value_by_name("Service-Type", "Framed-User"), Some(2));
    assert_eq!(dict.value_name("Service-Type", 2), Some("Framed-User"));
    assert_eq!(dict.value_by_name("Acct-Status-Type", "Interim-Update"), Some(3));
    assert_eq!(
        dict.value_by_name("Error-Cause", "Session-Context-Not-Found"),
        Some(503)
    );
}

#[test]
fn cisco_vendor_block_is_scoped() {
    let dict = shipped();
    let vendor = dict.vendor_by_name("Cisco").unwrap();
    assert_eq!(vendor.id, 9);
    assert_eq!((vendor.type_width, vendor.length_width), (1, 1));

    let avpair = dict.find_by_name(Some(9), "Cisco-AVPair").unwrap();
    assert_eq!(avpair.key, AttrKey::vendor(9, 1));
    // The bare-name convenience lookup reaches into vendor scope
    assert_eq!(dict.attribute("Cisco-AVPair").unwrap().key, avpair.key);
}

#[test]
fn ipv6_attributes_use_rfc3162_types() {
    let dict = shipped();
    assert_eq!(
        dict.attribute("Framed-IPv6-Prefix").unwrap().data_type,
        DataType::Ipv6prefix
    );
    assert_eq!(
        dict.attribute("Framed-Interface-Id").unwrap().data_type,
        DataType::Ifid
    );
}
