//! Client transaction behavior against scripted peers

use radius_client::{Client, ClientError, ClientSettings};
use radius_proto::{Code, Dictionary, Packet, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

fn dict() -> Arc<Dictionary> {
    Arc::new(
        Dictionary::parse_str(
            "transactions",
            "\
ATTRIBUTE User-Name 1 string
ATTRIBUTE User-Password 2 string encrypt=1
ATTRIBUTE Reply-Message 18 string
ATTRIBUTE Acct-Status-Type 40 integer
ATTRIBUTE Acct-Delay-Time 41 integer
ATTRIBUTE Acct-Session-Id 44 string
VALUE Acct-Status-Type Start 1
",
        )
        .unwrap(),
    )
}

fn client_for(auth_port: u16, acct_port: u16, retries: u32, timeout: Duration) -> Client {
    let mut settings = ClientSettings::new("127.0.0.1", "secret");
    settings.auth_port = auth_port;
    settings.acct_port = acct_port;
    settings.retries = retries;
    Client::new(settings, dict()).with_timeout(timeout)
}

#[tokio::test]
async fn timeout_after_exhausting_identical_retransmissions() {
    // A sink that never answers
    let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = sink.local_addr().unwrap().port();

    let receiver = tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        let mut seen = Vec::new();
        while seen.len() < 3 {
            let (len, _) = sink.recv_from(&mut buf).await.unwrap();
            seen.push(buf[..len].to_vec());
        }
        seen
    });

    let client = client_for(port, 0, 3, Duration::from_millis(200));
    let mut request = client.create_auth_packet();
    request.add("User-Name", "nemo").unwrap();

    let started = std::time::Instant::now();
    let result = client.send_packet(&mut request).await;
    assert!(matches!(result, Err(ClientError::Timeout)));
    assert!(started.elapsed() >= Duration::from_millis(550));

    // All three datagrams share identifier and authenticator
    let seen = receiver.await.unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[1], seen[2]);
}

#[tokio::test]
async fn non_matching_datagrams_are_silently_discarded() {
    let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = responder.local_addr().unwrap().port();
    let d = dict();

    tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        let (len, peer) = responder.recv_from(&mut buf).await.unwrap();
        let request = Packet::decode(&buf[..len], b"secret", &d).unwrap();

        // Undecodable garbage first
        responder.send_to(b"not radius", peer).await.unwrap();

        // Then a correctly authenticated reply under the wrong identifier
        let mut wrong_id = request.reply(Code::AccessAccept);
        wrong_id.identifier = request.identifier.wrapping_add(1);
        let wire = wrong_id.encode_response().unwrap();
        responder.send_to(&wire, peer).await.unwrap();

        // Then a reply signed with the wrong secret
        let mut bad_auth = Packet::new(Code::AccessAccept, &b"other"[..], Arc::clone(&d))
            .with_identifier(request.identifier)
            .with_authenticator(request.authenticator);
        let wire = bad_auth.encode_response().unwrap();
        responder.send_to(&wire, peer).await.unwrap();

        // Finally the real answer
        let mut reply = request.reply(Code::AccessAccept);
        reply.add("Reply-Message", "welcome").unwrap();
        let wire = reply.encode_response().unwrap();
        responder.send_to(&wire, peer).await.unwrap();
    });

    let client = client_for(port, 0, 3, Duration::from_secs(2));
    let mut request = client.create_auth_packet();
    request.add("User-Name", "nemo").unwrap();
    request.add("User-Password", "arctangent").unwrap();

    let reply = client.send_packet(&mut request).await.unwrap();
    assert_eq!(reply.code, Code::AccessAccept);
    assert_eq!(
        reply.get_first("Reply-Message").unwrap(),
        Some(Value::Text("welcome".into()))
    );
}

#[tokio::test]
async fn accounting_retries_bump_acct_delay_time() {
    let sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = sink.local_addr().unwrap().port();

    let receiver = tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        let mut seen = Vec::new();
        while seen.len() < 2 {
            let (len, _) = sink.recv_from(&mut buf).await.unwrap();
            seen.push(buf[..len].to_vec());
        }
        seen
    });

    let client = client_for(0, port, 2, Duration::from_millis(200));
    let mut request = client.create_acct_packet();
    request.add("Acct-Status-Type", "Start").unwrap();
    request.add("Acct-Session-Id", "abc123").unwrap();

    let result = client.send_packet(&mut request).await;
    assert!(matches!(result, Err(ClientError::Timeout)));

    let seen = receiver.await.unwrap();
    let d = dict();
    let first = Packet::decode(&seen[0], b"secret", &d).unwrap();
    let second = Packet::decode(&seen[1], b"secret", &d).unwrap();
    assert_eq!(first.identifier, second.identifier);
    assert!(first.get("Acct-Delay-Time").unwrap().is_empty());
    assert_eq!(
        second.get_first("Acct-Delay-Time").unwrap(),
        Some(Value::Integer(0))
    );
    // The retransmission carries a fresh hashed authenticator
    assert!(second.verify_request_authenticator());
}

#[tokio::test]
async fn unresolvable_server_reports_no_host() {
    let mut settings = ClientSettings::new("host.invalid.", "secret");
    settings.retries = 1;
    let client = Client::new(settings, dict()).with_timeout(Duration::from_millis(100));
    let mut request = client.create_auth_packet();
    request.add("User-Name", "nemo").unwrap();
    let result = client.send_packet(&mut request).await;
    assert!(matches!(
        result,
        Err(ClientError::NoHostFound(_)) | Err(ClientError::Io(_))
    ));
}
