//! Scenario 1: a fresh connect establishes a session before the first
//! request is allowed through, and that request round-trips normally.

use crate::support::{accept_handshake, bind, read_frame, write_frame};
use keepersession::codec::Writer;
use keepersession::{ClientConfig, CreateMode, KeeperClient, KeeperState};
use std::time::Duration;

#[tokio::test]
async fn handshake_then_create() {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock, 42, 10_000).await;

        let req = read_frame(&mut sock).await;
        let mut r = keepersession::codec::Reader::new(&req);
        let xid = r.i32().unwrap();
        let mut w = Writer::new();
        w.i32(xid).i64(1).i32(0).string("/widget");
        write_frame(&mut sock, &w.into_bytes()).await;
        // hold the connection open so the state check below isn't racing a close
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let config = ClientConfig::new(&addr, Duration::from_secs(10)).unwrap();
    let client = KeeperClient::connect(config);
    let created = client.create("/widget", b"hello", CreateMode::Persistent).await.unwrap();
    assert_eq!(created, "/widget");
    assert_eq!(client.keeper_state(), KeeperState::SyncConnected);
}
