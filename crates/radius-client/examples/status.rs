//! Probe server liveness with Status-Server (RFC 5997)

use radius_client::{Client, ClientError, ClientSettings};
use radius_proto::Dictionary;
use std::sync::Arc;

const DICTIONARY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../dictionaries/dictionary");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dict = Arc::new(Dictionary::load(DICTIONARY)?);
    let client = Client::new(
        ClientSettings::new("127.0.0.1", "Kah3choteereethiejeimaeziecumi"),
        dict,
    );

    let mut probe = client.create_status_packet();
    probe.set_message_authenticator(true);

    match client.send_packet(&mut probe).await {
        Ok(reply) => println!("Server is alive: {:?}", reply.code),
        Err(ClientError::Timeout) => println!("Server did not answer"),
        Err(error) => return Err(error.into()),
    }
    Ok(())
}
