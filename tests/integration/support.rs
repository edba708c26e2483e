//! Shared mock-server plumbing for the end-to-end tests. Each test drives a
//! bare `TcpListener` by hand rather than a real cluster, speaking the wire
//! protocol directly through `keepersession::codec`.

use keepersession::codec::{ConnectRequest, ConnectResponse, Writer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub async fn read_frame(sock: &mut TcpStream) -> Vec<u8> {
    let mut len_buf = [0u8; 4];
    sock.read_exact(&mut len_buf).await.unwrap();
    let len = i32::from_be_bytes(len_buf) as usize;
    let mut body = vec![0u8; len];
    sock.read_exact(&mut body).await.unwrap();
    body
}

pub async fn write_frame(sock: &mut TcpStream, body: &[u8]) {
    sock.write_all(&(body.len() as i32).to_be_bytes()).await.unwrap();
    sock.write_all(body).await.unwrap();
}

/// Reads the handshake `ConnectRequest` off `sock` and replies with a
/// successful `ConnectResponse`, returning the decoded request for the
/// caller to inspect (e.g. to assert on `last_zxid` across a reconnect).
pub async fn accept_handshake(sock: &mut TcpStream, session_id: i64, timeout_ms: i32) -> ConnectRequest {
    let req = read_frame(sock).await;
    let connect_req = decode_connect_request(&req);
    let resp = ConnectResponse { protocol_version: 0, timeout_ms, session_id, password: [7u8; 16] };
    let mut w = Writer::new();
    w.i32(resp.protocol_version).i32(resp.timeout_ms).i64(resp.session_id).bytes(Some(&resp.password));
    write_frame(sock, &w.into_bytes()).await;
    connect_req
}

fn decode_connect_request(body: &[u8]) -> ConnectRequest {
    use keepersession::codec::Reader;
    let mut r = Reader::new(body);
    let protocol_version = r.i32().unwrap();
    let last_zxid = r.i64().unwrap();
    let timeout_ms = r.i32().unwrap();
    let session_id = r.i64().unwrap();
    let password_vec = r.bytes().unwrap().unwrap_or_default();
    let mut password = [0u8; 16];
    let n = password_vec.len().min(16);
    password[..n].copy_from_slice(&password_vec[..n]);
    ConnectRequest { protocol_version, last_zxid, timeout_ms, session_id, password }
}

pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    (listener, addr)
}
