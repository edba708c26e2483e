//! Async client for a ZooKeeper-like hierarchical coordination service.
//!
//! A session is a single reconnecting, ordered connection to a cluster of
//! servers. [`KeeperClient::connect`] spawns a reactor task that owns the
//! transport; every call on [`KeeperClient`] is a cheap message send to that
//! task and an await on the reply.
//!
//! ```no_run
//! use keepersession::{ClientConfig, KeeperClient};
//! use std::time::Duration;
//!
//! # async fn run() -> keepersession::Result<()> {
//! let config = ClientConfig::new("localhost:2181", Duration::from_secs(10))?;
//! let client = KeeperClient::connect(config);
//! let path = client.create("/widget", b"v1", keepersession::CreateMode::Persistent).await?;
//! let (data, _stat) = client.get_data(&path, None, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod path;
pub mod pending;
pub mod protocol;
mod session;
pub mod transport;
pub mod watch;

pub use client::KeeperClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use protocol::{Acl, CreateMode, EventType, KeeperState, Stat, WatchedEvent};
pub use watch::{FnWatcher, Watcher};
