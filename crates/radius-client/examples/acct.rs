//! Send an accounting start/stop pair for one session

use radius_client::{Client, ClientSettings};
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

    let session_id = "1337";

    let mut start = client.create_acct_packet();
    start.add("User-Name", "wichert")?;
    start.add("Acct-Status-Type", "Start")?;
    start.add("Acct-Session-Id", session_id)?;
    start.add("NAS-Identifier", "trillian")?;
    println!("Sending accounting start");
    let reply = client.send_packet(&mut start).await?;
    println!("Server answered with {:?}", reply.code);

    let mut stop = client.create_acct_packet();
    stop.add("User-Name", "wichert")?;
    stop.add("Acct-Status-Type", "Stop")?;
    stop.add("Acct-Session-Id", session_id)?;
    stop.add("NAS-Identifier", "trillian")?;
    stop.add("Acct-Session-Time", 900u32)?;
    stop.add("Acct-Terminate-Cause", "User-Request")?;
    println!("Sending accounting stop");
    let reply = client.send_packet(&mut stop).await?;
    println!("Server answered with {:?}", reply.code);

    Ok(())
}
