//! Scenario 5: after the transport drops, the reactor reconnects and replays
//! every still-armed watch path in a single `SetWatches` request before any
//! new user request is allowed through.

use crate::support::{accept_handshake, bind, read_frame, write_frame};
use keepersession::codec::{Reader, Writer};
use keepersession::{ClientConfig, KeeperClient};
use std::time::Duration;

#[tokio::test]
async fn reconnect_replays_set_watches() {
    let (listener, addr) = bind().await;

    let server = tokio::spawn(async move {
        // First connection: handshake, answer one exists() call that arms a
        // watch, then drop the socket to force a reconnect.
        let (mut sock1, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock1, 1, 10_000).await;

        let req = read_frame(&mut sock1).await;
        let mut r = Reader::new(&req);
        let xid = r.i32().unwrap();
        let mut w = Writer::new();
        w.i32(xid).i64(1).i32(-101); // NoNode, watch still arms on exists()
        write_frame(&mut sock1, &w.into_bytes()).await;
        drop(sock1);

        // Second connection: expect the replayed SetWatches naming the path
        // before anything else arrives.
        let (mut sock2, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock2, 1, 10_000).await;
        let req = read_frame(&mut sock2).await;
        let mut r = Reader::new(&req);
        let _xid = r.i32().unwrap();
        let _opcode = r.i32().unwrap();
        let _relative_zxid = r.i64().unwrap();
        let data_paths = r.string_vec().unwrap();
        let exist_paths = r.string_vec().unwrap();
        let child_paths = r.string_vec().unwrap();
        assert!(data_paths.is_empty());
        assert_eq!(exist_paths, vec!["/watched".to_string()]);
        assert!(child_paths.is_empty());
    });

    let config = ClientConfig::new(&addr, Duration::from_secs(10)).unwrap();
    let client = KeeperClient::connect(config);

    let watcher = keepersession::FnWatcher::new(|_event| {});
    let stat = client.exists("/watched", Some(watcher), None).await.unwrap();
    assert!(stat.is_none());

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("mock server should observe the replayed SetWatches within 5s")
        .expect("mock server task panicked");

    let _ = client.keeper_state(); // session stays usable past the reconnect
}
