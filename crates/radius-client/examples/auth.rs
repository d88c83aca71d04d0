//! Send a PAP Access-Request to a server on localhost

use radius_client::{Client, ClientError, ClientSettings};
use radius_proto::{Code, Dictionary};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DICTIONARY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../dictionaries/dictionary");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dict = Arc::new(Dictionary::load(DICTIONARY)?);
    let client = Client::new(
        ClientSettings::new("127.0.0.1", "Kah3choteereethiejeimaeziecumi"),
        dict,
    );

    let mut request = client.create_auth_packet();
    request.add("User-Name", "wichert")?;
    request.add("User-Password", "s3cret")?;
    request.add("NAS-IP-Address", "192.168.1.10")?;
    request.add("NAS-Port", 0u32)?;
    request.add("Service-Type", "Login-User")?;
    request.add("NAS-Identifier", "trillian")?;
    request.add("Called-Station-Id", "00-04-5F-00-0F-D1")?;
    request.add("Calling-Station-Id", "00-01-24-80-B3-9C")?;
    request.add("Framed-IP-Address", "10.0.0.100")?;

    println!("Sending authentication request");
    match client.send_packet(&mut request).await {
        Ok(reply) => {
            if reply.code == Code::AccessAccept {
                println!("Access accepted");
            } else {
                println!("Access denied");
            }
            println!("Attributes returned by server:");
            for avp in reply.attributes() {
                println!("  {:?}: {} octet(s)", avp.key, avp.value.len());
            }
        }
        Err(ClientError::Timeout) => {
            eprintln!("RADIUS server does not reply");
            std::process::exit(1);
        }
        Err(error) => {
            eprintln!("Network error: {error}");
            std::process::exit(1);
        }
    }

    Ok(())
}
