//! The session machine: a reactor task that owns the transport exclusively and
//! is the only thing in the process allowed to read or write it.
//!
//! Callers talk to it through [`SessionHandle`], which ships requests over an
//! `mpsc` channel and gets the response back on a `oneshot`. This keeps the
//! hot path lock-free: the pending-request table, the auth list and the
//! transport are all single-task-owned state, never touched from outside the
//! reactor loop.

use crate::codec::{request_frame, ConnectRequest, ConnectResponse, ResponseHeader, SetWatchesRequest};
use crate::config::ClientConfig;
use crate::endpoint::EndpointList;
use crate::error::{Error, Result, SystemErrorKind};
use crate::path;
use crate::pending::{PendingRequest, PendingTable};
use crate::protocol::{self, xid, AuthRequest, KeeperState, OpCode, WatchedEvent};
use crate::watch::{self, WatchRegistry};
use bytes::BytesMut;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch as watch_channel};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

const RECONNECT_BACKOFF: Duration = Duration::from_millis(500);
const AUTH_SCHEME_TYPE: i32 = 0;

/// A unit of work handed from a caller task to the reactor.
pub(crate) enum Command {
    Send {
        opcode: OpCode,
        body: BytesMut,
        path: Option<String>,
        timeout: Option<Duration>,
        reply: oneshot::Sender<Result<BytesMut>>,
    },
    AddAuth { scheme: String, credential: Vec<u8>, reply: oneshot::Sender<Result<()>> },
    Close { reply: oneshot::Sender<Result<()>> },
}

/// A cheaply-cloneable capability to submit work to a running session reactor.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<Command>,
    watches: Arc<WatchRegistry>,
    state_rx: watch_channel::Receiver<KeeperState>,
    chroot: Option<String>,
}

impl SessionHandle {
    pub fn keeper_state(&self) -> KeeperState {
        *self.state_rx.borrow()
    }

    pub fn chroot(&self) -> Option<&str> {
        self.chroot.as_deref()
    }

    pub fn watches(&self) -> &Arc<WatchRegistry> {
        &self.watches
    }

    pub(crate) async fn send(
        &self,
        opcode: OpCode,
        body: BytesMut,
        path: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<BytesMut> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Send { opcode, body, path, timeout, reply })
            .await
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    pub(crate) async fn add_auth(&self, scheme: String, credential: Vec<u8>) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx.send(Command::AddAuth { scheme, credential, reply }).await.map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    pub(crate) async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Close { reply }).await.map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }
}

/// Spawns the reactor task and returns a handle to it immediately; the first
/// connection attempt happens in the background.
pub fn spawn(config: ClientConfig) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (state_tx, state_rx) = watch_channel::channel(KeeperState::Disconnected);
    let watches = Arc::new(WatchRegistry::new(config.default_watcher.clone()));
    let handle = SessionHandle {
        cmd_tx,
        watches: watches.clone(),
        state_rx,
        chroot: config.chroot.clone(),
    };
    tokio::spawn(run(config.endpoints, config.chroot, config.session_timeout, watches, state_tx, cmd_rx));
    handle
}

/// Why a connected session dropped its transport.
enum DisconnectReason {
    Closed,
    Fatal(KeeperState),
    Lost,
}
use DisconnectReason::{Closed, Fatal, Lost};

fn next_xid(counter: &mut i32) -> i32 {
    let xid = *counter;
    *counter = counter.checked_add(1).filter(|v| *v > 0).unwrap_or(1);
    xid
}

async fn run(
    mut endpoints: EndpointList,
    chroot: Option<String>,
    session_timeout: Duration,
    watches: Arc<WatchRegistry>,
    state_tx: watch_channel::Sender<KeeperState>,
    mut cmd_rx: mpsc::Receiver<Command>,
) {
    let mut session_id: i64 = 0;
    let mut password = [0u8; 16];
    let mut last_zxid: i64 = 0;
    let mut auths: Vec<AuthRequest> = Vec::new();
    let mut xid_counter: i32 = 1;

    'outer: loop {
        let endpoint = endpoints.next_endpoint();
        let _ = state_tx.send(KeeperState::Disconnected);

        let mut transport = match crate::transport::Transport::connect(&endpoint).await {
            Ok(t) => t,
            Err(e) => {
                warn!(peer = %endpoint, error = %e, "connect failed, retrying");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
                continue 'outer;
            }
        };

        let connect_req = ConnectRequest {
            protocol_version: 0,
            last_zxid,
            timeout_ms: session_timeout.as_millis() as i32,
            session_id,
            password,
        };
        if let Err(e) = transport.send(&connect_req.encode()).await {
            warn!(peer = %endpoint, error = %e, "handshake send failed, retrying");
            tokio::time::sleep(RECONNECT_BACKOFF).await;
            continue 'outer;
        }
        let connect_resp = match transport.recv().await.and_then(|body| ConnectResponse::decode(&body)) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(peer = %endpoint, error = %e, "handshake response invalid, retrying");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
                continue 'outer;
            }
        };
        if connect_resp.timeout_ms <= 0 {
            warn!(peer = %endpoint, "server negotiated non-positive timeout, session expired");
            let _ = state_tx.send(KeeperState::Expired);
            let fired = watches.fail_all(KeeperState::Expired);
            watch::dispatch(fired, session_event(KeeperState::Expired));
            break 'outer;
        }
        session_id = connect_resp.session_id;
        password = connect_resp.password;
        let negotiated_timeout = Duration::from_millis(connect_resp.timeout_ms as u64);
        let _ = state_tx.send(KeeperState::SyncConnected);
        info!(session_id, peer = %endpoint, ?negotiated_timeout, "session established");

        for auth in &auths {
            let frame = request_frame(xid::AUTH, OpCode::Auth as i32, &auth.encode(AUTH_SCHEME_TYPE));
            if transport.send(&frame).await.is_err() {
                break;
            }
        }
        let (data_paths, exist_paths, child_paths) = watches.snapshot();
        if !data_paths.is_empty() || !exist_paths.is_empty() || !child_paths.is_empty() {
            let sw = SetWatchesRequest { relative_zxid: last_zxid, data_paths, exist_paths, child_paths };
            let frame = request_frame(xid::SET_WATCHES, OpCode::SetWatches as i32, &sw.encode());
            let _ = transport.send(&frame).await;
        }

        let mut pending = PendingTable::new();
        let mut auth_waiters: VecDeque<oneshot::Sender<Result<()>>> = VecDeque::new();
        let mut ping_interval = tokio::time::interval(Duration::from_secs(3));
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ping_interval.tick().await; // first tick fires immediately; consume it
        let mut last_recv = Instant::now();
        let mut closing = false;

        let reason = loop {
            let read_deadline = last_recv + negotiated_timeout;
            let next_request_deadline = pending.next_deadline();
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Send { opcode, body, path, timeout, reply }) => {
                            let xid = next_xid(&mut xid_counter);
                            let deadline = timeout.map(|d| Instant::now() + d);
                            if pending.register(xid, PendingRequest { sink: reply, deadline, path: path.clone() }).is_err() {
                                continue;
                            }
                            trace!(xid, opcode = ?opcode, "sending request");
                            let frame = request_frame(xid, opcode as i32, &body);
                            if let Err(e) = transport.send(&frame).await {
                                pending.fail(xid, Error::SystemError { kind: SystemErrorKind::ConnectionLoss, path });
                                warn!(error = %e, "send failed, connection lost");
                                break Lost;
                            }
                        }
                        Some(Command::AddAuth { scheme, credential, reply }) => {
                            auths.push(AuthRequest { scheme: scheme.clone(), credential: credential.clone() });
                            let frame = request_frame(
                                xid::AUTH,
                                OpCode::Auth as i32,
                                &AuthRequest { scheme, credential }.encode(AUTH_SCHEME_TYPE),
                            );
                            if let Err(e) = transport.send(&frame).await {
                                let _ = reply.send(Err(Error::SystemError { kind: SystemErrorKind::ConnectionLoss, path: None }));
                                warn!(error = %e, "auth send failed, connection lost");
                                break Lost;
                            }
                            auth_waiters.push_back(reply);
                        }
                        Some(Command::Close { reply }) => {
                            closing = true;
                            let frame = request_frame(next_xid(&mut xid_counter), OpCode::CloseSession as i32, &[]);
                            let _ = transport.send(&frame).await;
                            let _ = reply.send(Ok(()));
                            break Closed;
                        }
                        None => {
                            closing = true;
                            break Closed;
                        }
                    }
                }

                _ = ping_interval.tick(), if matches!(*state_tx.borrow(), KeeperState::SyncConnected) => {
                    let frame = request_frame(xid::PING, OpCode::Ping as i32, &[]);
                    if let Err(e) = transport.send(&frame).await {
                        warn!(error = %e, "ping send failed, connection lost");
                        break Lost;
                    }
                    trace!("ping sent");
                }

                _ = tokio::time::sleep_until(next_request_deadline.unwrap_or(read_deadline)), if next_request_deadline.is_some() => {
                    let expired = pending.expire_due(Instant::now());
                    if expired > 0 {
                        trace!(expired, "per-request deadline(s) fired");
                    }
                }

                result = transport.recv() => {
                    match result {
                        Ok(body) => {
                            last_recv = Instant::now();
                            match ResponseHeader::decode(&body) {
                                Ok((header, rest)) => {
                                    if header.zxid > last_zxid {
                                        last_zxid = header.zxid;
                                    }
                                    match header.xid {
                                        xid::WATCH_EVENT => {
                                            if let Ok(wire_event) = WatchedEvent::decode(rest) {
                                                let event = WatchedEvent {
                                                    path: path::remove_chroot(chroot.as_deref(), &wire_event.path),
                                                    ..wire_event
                                                };
                                                trace!(path = %event.path, event_type = ?event.event_type, "watch event");
                                                let fired = watches.materialize(&event);
                                                watch::dispatch(fired, event);
                                            }
                                        }
                                        xid::PING => trace!("pong received"),
                                        xid::AUTH => {
                                            let result = if header.err == 0 {
                                                Ok(())
                                            } else {
                                                Err(Error::from_code(header.err, None))
                                            };
                                            let fatal = result.as_ref().err().is_some_and(Error::is_session_fatal);
                                            if let Some(waiter) = auth_waiters.pop_front() {
                                                let _ = waiter.send(result);
                                            }
                                            if fatal {
                                                break Fatal(KeeperState::AuthFailed);
                                            }
                                        }
                                        xid::SET_WATCHES => {
                                            if header.err != 0 {
                                                warn!(err = header.err, "set_watches replay failed");
                                            }
                                        }
                                        req_xid => {
                                            let err = header.err;
                                            let rest = BytesMut::from(rest);
                                            let completed = pending.complete_with(req_xid, move |path| {
                                                if err == 0 {
                                                    Ok(rest)
                                                } else {
                                                    Err(Error::from_code(err, path.map(String::from)))
                                                }
                                            });
                                            if !completed {
                                                debug!(xid = req_xid, "response for unknown or expired xid");
                                            }
                                        }
                                    }
                                }
                                Err(e) => warn!(error = %e, "failed to decode response header"),
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "read failed, connection lost");
                            break Lost;
                        }
                    }
                }

                _ = tokio::time::sleep_until(read_deadline) => {
                    warn!(?negotiated_timeout, "read timeout, treating connection as lost");
                    break Lost;
                }
            }
        };

        pending.fail_all(|path| Error::SystemError {
            kind: SystemErrorKind::ConnectionLoss,
            path: path.map(String::from),
        });
        for waiter in auth_waiters.drain(..) {
            let _ = waiter.send(Err(Error::SystemError { kind: SystemErrorKind::ConnectionLoss, path: None }));
        }

        match reason {
            DisconnectReason::Closed => {
                let _ = state_tx.send(KeeperState::Disconnected);
                let fired = watches.fail_all(KeeperState::Disconnected);
                watch::dispatch(fired, session_event(KeeperState::Disconnected));
                break 'outer;
            }
            DisconnectReason::Fatal(state) => {
                let _ = state_tx.send(state);
                let fired = watches.fail_all(state);
                watch::dispatch(fired, session_event(state));
                break 'outer;
            }
            DisconnectReason::Lost => {
                let _ = state_tx.send(KeeperState::Disconnected);
                let fired = watches.fail_all(KeeperState::Disconnected);
                watch::dispatch(fired, session_event(KeeperState::Disconnected));
                if closing {
                    break 'outer;
                }
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

fn session_event(state: KeeperState) -> WatchedEvent {
    WatchedEvent { event_type: protocol::EventType::None, keeper_state: state, path: String::new() }
}
