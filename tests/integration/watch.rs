//! Scenario 3: a watcher armed on a successful read fires exactly once when
//! the server pushes the matching event, and not again after.

use crate::support::{accept_handshake, bind, read_frame, write_frame};
use keepersession::codec::{Reader, Writer};
use keepersession::protocol::xid;
use keepersession::{ClientConfig, EventType, KeeperClient, KeeperState, WatchedEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn watch_fires_once() {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock, 1, 10_000).await;

        let req = read_frame(&mut sock).await;
        let mut r = Reader::new(&req);
        let xid_val = r.i32().unwrap();
        let mut w = Writer::new();
        w.i32(xid_val).i64(1).i32(0).bytes(Some(b"hello")).i64(0).i64(0).i64(0).i64(0).i32(0).i32(0).i32(0).i64(
            0,
        ).i32(0).i32(0).i64(0);
        write_frame(&mut sock, &w.into_bytes()).await;

        // give the client task a chance to register the watcher before the
        // event arrives, mirroring how a real server never races its own ack
        tokio::time::sleep(Duration::from_millis(50)).await;

        let event = WatchedEvent { event_type: EventType::NodeDataChanged, keeper_state: KeeperState::SyncConnected, path: "/widget".into() };
        let mut ew = Writer::new();
        ew.i32(xid::WATCH_EVENT).i64(2).i32(0);
        let mut body = ew.into_bytes();
        body.extend_from_slice(&event.encode());
        write_frame(&mut sock, &body).await;

        // hold the connection open so the test doesn't race a reconnect attempt
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let config = ClientConfig::new(&addr, Duration::from_secs(10)).unwrap();
    let client = KeeperClient::connect(config);

    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = fired.clone();
    let watcher = keepersession::FnWatcher::new(move |event: WatchedEvent| {
        assert_eq!(event.path, "/widget");
        fired_clone.fetch_add(1, Ordering::SeqCst);
    });

    let (data, _stat) = client.get_data("/widget", Some(watcher), None).await.unwrap();
    assert_eq!(data, b"hello");

    // give the dispatched notification time to run on its own task
    for _ in 0..50 {
        if fired.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
