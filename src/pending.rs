//! Pending request table: correlates in-flight transaction ids with their waiters.
//!
//! Owned exclusively by the session reactor task (see [`crate::session`]), so no
//! internal locking is needed — every mutation happens on that one task.

use crate::error::{Error, Result};
use std::collections::HashMap;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// A response body handed back to the waiting public-API future, already past the
/// response-header error check: `Ok(body)` for success, `Err` for a server error,
/// decode error, or connection loss.
pub type PendingResult = Result<bytes::BytesMut>;

/// An in-flight request awaiting its response.
pub struct PendingRequest {
    pub sink: oneshot::Sender<PendingResult>,
    pub deadline: Option<Instant>,
    /// The pre-chroot client path, attached to any error this request fails with.
    pub path: Option<String>,
}

/// Maps XID to waiter. At most one entry per XID at any time.
#[derive(Default)]
pub struct PendingTable {
    entries: HashMap<i32, PendingRequest>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a new pending request. Returns an error if `xid` is already in use
    /// (a programming error — XIDs are assigned by an increasing counter and must
    /// never collide within a live session).
    pub fn register(&mut self, xid: i32, request: PendingRequest) -> Result<()> {
        if self.entries.contains_key(&xid) {
            return Err(Error::Decode(format!("duplicate xid {xid}")));
        }
        self.entries.insert(xid, request);
        Ok(())
    }

    /// Completes the pending request for `xid` with `result`. Returns `true` if a
    /// waiter was found; a response for an unknown XID is not an error here — the
    /// caller (the reactor) logs it as an unexpected message and moves on.
    pub fn complete(&mut self, xid: i32, result: PendingResult) -> bool {
        match self.entries.remove(&xid) {
            Some(req) => {
                let _ = req.sink.send(result);
                true
            }
            None => false,
        }
    }

    /// Completes the pending request for `xid`, building the result from the
    /// request's own stored path (needed to attach the path to a server error
    /// after the entry has been looked up). Returns `true` if a waiter was found.
    pub fn complete_with(&mut self, xid: i32, make_result: impl FnOnce(Option<&str>) -> PendingResult) -> bool {
        match self.entries.remove(&xid) {
            Some(req) => {
                let result = make_result(req.path.as_deref());
                let _ = req.sink.send(result);
                true
            }
            None => false,
        }
    }

    /// Fails a single pending request by XID, e.g. on local encode failure.
    pub fn fail(&mut self, xid: i32, error: Error) {
        if let Some(req) = self.entries.remove(&xid) {
            let _ = req.sink.send(Err(error));
        }
    }

    /// Fails every pending request, e.g. on connection loss or session expiry.
    /// `make_error` is invoked once per request so each failure can carry that
    /// request's own client path.
    pub fn fail_all(&mut self, make_error: impl Fn(Option<&str>) -> Error) {
        for (_, req) in self.entries.drain() {
            let error = make_error(req.path.as_deref());
            let _ = req.sink.send(Err(error));
        }
    }

    /// The earliest still-pending per-request deadline, if any request carries one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().filter_map(|req| req.deadline).min()
    }

    /// Removes and fails every request whose deadline has passed, returning the
    /// count removed.
    pub fn expire_due(&mut self, now: Instant) -> usize {
        let expired: Vec<i32> = self
            .entries
            .iter()
            .filter(|(_, req)| req.deadline.is_some_and(|d| d <= now))
            .map(|(xid, _)| *xid)
            .collect();
        let count = expired.len();
        for xid in expired {
            if let Some(req) = self.entries.remove(&xid) {
                let _ = req.sink.send(Err(Error::SystemError {
                    kind: crate::error::SystemErrorKind::OperationTimeout,
                    path: req.path,
                }));
            }
        }
        count
    }
}
