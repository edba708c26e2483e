//! Scenario 4: a server that negotiates a non-positive session timeout during
//! the handshake signals that the session has expired; pending watchers are
//! torn down and the client never retries against that response.

use crate::support::{bind, read_frame, write_frame};
use keepersession::codec::{Reader, Writer};
use keepersession::error::SystemErrorKind;
use keepersession::{ClientConfig, Error, KeeperClient, KeeperState};
use std::time::Duration;

#[tokio::test]
async fn session_expiry_on_non_positive_negotiated_timeout() {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let req = read_frame(&mut sock).await;
        let mut r = Reader::new(&req);
        let _protocol_version = r.i32().unwrap();
        let _last_zxid = r.i64().unwrap();
        let _timeout_ms = r.i32().unwrap();

        let mut w = Writer::new();
        w.i32(0).i32(0).i64(0).bytes(Some(&[0u8; 16]));
        write_frame(&mut sock, &w.into_bytes()).await;
        // keep the socket alive; the client should not attempt another request
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let config = ClientConfig::new(&addr, Duration::from_secs(10)).unwrap();
    let client = KeeperClient::connect(config);

    for _ in 0..100 {
        if client.keeper_state() == KeeperState::Expired {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(client.keeper_state(), KeeperState::Expired);

    let result = client.exists("/whatever", None, None).await;
    match result {
        Err(Error::SystemError { kind: SystemErrorKind::ConnectionLoss, .. }) | Err(Error::Closed) => {}
        other => panic!("expected the expired session to refuse further work, got {other:?}"),
    }
}
