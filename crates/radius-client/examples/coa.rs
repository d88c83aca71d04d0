//! Send a CoA-Request or Disconnect-Request (RFC 5176)
//!
//! Usage: coa {coa|dis} <nas-identifier>

use radius_client::{Client, ClientSettings};
use radius_proto::{Code, Dictionary};
use std::sync::Arc;

const DICTIONARY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../dictionaries/dictionary");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (kind, nas_identifier) = match (args.next(), args.next()) {
        (Some(kind), Some(nas)) => (kind, nas),
        _ => {
            eprintln!("usage: coa {{coa|dis}} daemon-1234");
            std::process::exit(1);
        }
    };
    let code = match kind.as_str() {
        "coa" => Code::CoARequest,
        "dis" => Code::DisconnectRequest,
        _ => {
            eprintln!("usage: coa {{coa|dis}} daemon-1234");
            std::process::exit(1);
        }
    };

    let dict = Arc::new(Dictionary::load(DICTIONARY)?);
    let mut settings = ClientSettings::new("127.0.0.1", "Kah3choteereethiejeimaeziecumi");
    settings.timeout_secs = 30;
    let client = Client::new(settings, dict);

    let mut request = client.create_coa_packet(code);
    request.add("Acct-Session-Id", "1337")?;
    request.add("NAS-Identifier", nas_identifier.as_str())?;

    let reply = client.send_packet(&mut request).await?;
    println!("Server answered with {:?}", reply.code);
    Ok(())
}
