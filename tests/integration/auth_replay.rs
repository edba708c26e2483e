//! Scenario 6: credentials registered with `add_auth` are replayed on every
//! reconnect, sent before any user request the caller queues afterward.

use crate::support::{accept_handshake, bind, read_frame, write_frame};
use keepersession::codec::{Reader, Writer};
use keepersession::protocol::xid;
use keepersession::{ClientConfig, KeeperClient};
use std::time::Duration;

#[tokio::test]
async fn auth_replayed_on_reconnect() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        let (mut sock1, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock1, 1, 10_000).await;

        // first Auth frame, from the initial add_auth call
        let req = read_frame(&mut sock1).await;
        let mut r = Reader::new(&req);
        let xid_val = r.i32().unwrap();
        assert_eq!(xid_val, xid::AUTH);
        let _opcode = r.i32().unwrap();
        let _auth_type = r.i32().unwrap();
        let scheme = r.string().unwrap();
        assert_eq!(scheme, "digest");

        let mut w = Writer::new();
        w.i32(xid::AUTH).i64(1).i32(0);
        write_frame(&mut sock1, &w.into_bytes()).await;
        drop(sock1);

        let (mut sock2, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock2, 1, 10_000).await;

        // the replayed Auth frame must arrive before anything else
        let req = read_frame(&mut sock2).await;
        let mut r = Reader::new(&req);
        let xid_val = r.i32().unwrap();
        assert_eq!(xid_val, xid::AUTH, "auth must be replayed before the next user request");
        let _opcode = r.i32().unwrap();
        let _auth_type = r.i32().unwrap();
        let scheme = r.string().unwrap();
        assert_eq!(scheme, "digest");
    });

    let config = ClientConfig::new(&addr, Duration::from_secs(10)).unwrap();
    let client = KeeperClient::connect(config);
    client.add_auth("digest", b"alice:secret".to_vec()).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("mock server should observe the replayed Auth frame within 5s")
        .expect("mock server task panicked");
}
