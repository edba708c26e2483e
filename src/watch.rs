//! Watch registry: one-shot, path-keyed subscriptions fanned out to watcher
//! callbacks when a matching event arrives.

use crate::protocol::{EventType, KeeperState, WatchedEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A callback capability that receives watch and session-state events.
///
/// Held by the registry as `Arc<dyn Watcher>`; the registry never holds a
/// reference back to the client, so a registered watcher never prevents session
/// shutdown.
pub trait Watcher: Send + Sync {
    fn on_event(&self, event: WatchedEvent);
}

/// Adapts a plain closure into a [`Watcher`].
pub struct FnWatcher<F: Fn(WatchedEvent) + Send + Sync>(F);

impl<F: Fn(WatchedEvent) + Send + Sync> FnWatcher<F> {
    pub fn new(f: F) -> Arc<Self> {
        Arc::new(Self(f))
    }
}

impl<F: Fn(WatchedEvent) + Send + Sync> Watcher for FnWatcher<F> {
    fn on_event(&self, event: WatchedEvent) {
        (self.0)(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Data,
    Exist,
    Child,
}

type WatcherSet = HashMap<String, Vec<Arc<dyn Watcher>>>;

fn insert_dedup(set: &mut WatcherSet, path: &str, watcher: Arc<dyn Watcher>) {
    let bucket = set.entry(path.to_string()).or_default();
    if !bucket.iter().any(|w| Arc::ptr_eq(w, &watcher)) {
        bucket.push(watcher);
    }
}

/// Three path-keyed watcher sets (data, exist, child) plus one default slot,
/// guarded by a short-held mutex since both the reactor and caller tasks touch it.
#[derive(Default)]
pub struct WatchRegistry {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    data: WatcherSet,
    exist: WatcherSet,
    child: WatcherSet,
    default: Option<Arc<dyn Watcher>>,
}

impl WatchRegistry {
    pub fn new(default_watcher: Option<Arc<dyn Watcher>>) -> Self {
        Self { inner: Mutex::new(Inner { default: default_watcher, ..Default::default() }) }
    }

    pub fn register_data_watcher(&self, path: &str, watcher: Arc<dyn Watcher>) {
        insert_dedup(&mut self.inner.lock().unwrap().data, path, watcher);
    }

    pub fn register_exist_watcher(&self, path: &str, watcher: Arc<dyn Watcher>) {
        insert_dedup(&mut self.inner.lock().unwrap().exist, path, watcher);
    }

    pub fn register_child_watcher(&self, path: &str, watcher: Arc<dyn Watcher>) {
        insert_dedup(&mut self.inner.lock().unwrap().child, path, watcher);
    }

    /// Computes the watchers to fire for `event` and removes them from the
    /// registry atomically (the one-shot contract), returning them for delivery.
    pub fn materialize(&self, event: &WatchedEvent) -> Vec<Arc<dyn Watcher>> {
        let mut inner = self.inner.lock().unwrap();
        match event.event_type {
            EventType::NodeCreated | EventType::NodeDataChanged => {
                let mut fired = inner.data.remove(&event.path).unwrap_or_default();
                fired.extend(inner.exist.remove(&event.path).unwrap_or_default());
                fired
            }
            EventType::NodeDeleted => {
                let mut fired = inner.data.remove(&event.path).unwrap_or_default();
                fired.extend(inner.exist.remove(&event.path).unwrap_or_default());
                fired.extend(inner.child.remove(&event.path).unwrap_or_default());
                fired
            }
            EventType::NodeChildrenChanged => inner.child.remove(&event.path).unwrap_or_default(),
            EventType::None => inner.default.iter().cloned().collect(),
        }
    }

    /// Returns the currently-armed paths for each watch kind, for re-arming via
    /// `SetWatches` after a reconnect.
    pub fn snapshot(&self) -> (Vec<String>, Vec<String>, Vec<String>) {
        let inner = self.inner.lock().unwrap();
        (
            inner.data.keys().cloned().collect(),
            inner.exist.keys().cloned().collect(),
            inner.child.keys().cloned().collect(),
        )
    }

    /// Synthesizes a session-level `None` event with `state` and fires it to every
    /// registered watcher (not just the default slot: every still-armed watcher
    /// learns the session died so it can stop waiting). Clears the registry if
    /// `state` is terminal (Expired / AuthFailed).
    pub fn fail_all(&self, state: KeeperState) -> Vec<Arc<dyn Watcher>> {
        let mut inner = self.inner.lock().unwrap();
        let mut all: Vec<Arc<dyn Watcher>> = Vec::new();
        for set in [&inner.data, &inner.exist, &inner.child] {
            for bucket in set.values() {
                all.extend(bucket.iter().cloned());
            }
        }
        all.extend(inner.default.iter().cloned());

        if matches!(state, KeeperState::Expired | KeeperState::AuthFailed) {
            inner.data.clear();
            inner.exist.clear();
            inner.child.clear();
        }
        all
    }
}

/// Delivers `event` to each watcher off the I/O path, so a slow watcher callback
/// cannot stall protocol processing.
pub fn dispatch(watchers: Vec<Arc<dyn Watcher>>, event: WatchedEvent) {
    for watcher in watchers {
        let event = event.clone();
        tokio::spawn(async move {
            tokio::task::spawn_blocking(move || watcher.on_event(event)).await.ok();
        });
    }
}
