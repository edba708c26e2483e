//! Scenario 2: a configured chroot is transparently prepended to outgoing
//! paths and stripped from paths the server echoes back.

use crate::support::{accept_handshake, bind, read_frame, write_frame};
use keepersession::codec::{Reader, Writer};
use keepersession::{ClientConfig, CreateMode, KeeperClient};
use std::time::Duration;

#[tokio::test]
async fn chroot_path_rewrite() {
    let (listener, addr) = bind().await;
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        accept_handshake(&mut sock, 1, 10_000).await;

        let req = read_frame(&mut sock).await;
        let mut r = Reader::new(&req);
        let xid = r.i32().unwrap();
        let _opcode = r.i32().unwrap();
        let path = r.string().unwrap();
        assert_eq!(path, "/app/widget", "server should see the chroot-prefixed path");

        let mut w = Writer::new();
        w.i32(xid).i64(1).i32(0).string("/app/widget");
        write_frame(&mut sock, &w.into_bytes()).await;
    });

    let config = ClientConfig::new(&addr, Duration::from_secs(10)).unwrap().with_chroot("/app").unwrap();
    let client = KeeperClient::connect(config);
    let created = client.create("/widget", b"hello", CreateMode::Persistent).await.unwrap();
    assert_eq!(created, "/widget", "client should see the chroot stripped back off");
}
