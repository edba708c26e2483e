//! Protocol-level constants and plain data records (see the wire protocol table).
//!
//! This module only defines shapes and numeric enums; encoding/decoding lives in
//! [`crate::codec`].

/// Request opcodes (stable wire values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OpCode {
    Notification = 0,
    Create = 1,
    Delete = 2,
    Exists = 3,
    GetData = 4,
    SetData = 5,
    GetAcl = 6,
    SetAcl = 7,
    GetChildren = 8,
    Sync = 9,
    Ping = 11,
    GetChildren2 = 12,
    Check = 13,
    Multi = 14,
    Auth = 100,
    SetWatches = 101,
    CreateSession = -10,
    CloseSession = -11,
}

/// `CreateMode` flags for `Create` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CreateMode {
    Persistent = 0,
    Ephemeral = 1,
    PersistentSequential = 2,
    EphemeralSequential = 3,
}

impl CreateMode {
    pub fn is_sequential(self) -> bool {
        matches!(self, CreateMode::PersistentSequential | CreateMode::EphemeralSequential)
    }
}

/// The externally visible connection condition of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeeperState {
    Disconnected,
    SyncConnected,
    Expired,
    AuthFailed,
    NoSyncConnected,
    Unknown,
}

impl KeeperState {
    pub fn from_wire(code: i32) -> Self {
        match code {
            0 => KeeperState::Disconnected,
            3 => KeeperState::SyncConnected,
            -112 => KeeperState::Expired,
            4 => KeeperState::AuthFailed,
            2 => KeeperState::NoSyncConnected,
            _ => KeeperState::Unknown,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            KeeperState::Disconnected => 0,
            KeeperState::NoSyncConnected => 2,
            KeeperState::SyncConnected => 3,
            KeeperState::AuthFailed => 4,
            KeeperState::Expired => -112,
            KeeperState::Unknown => -1,
        }
    }
}

/// The kind of change a `WatchedEvent` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    None,
    NodeCreated,
    NodeDeleted,
    NodeDataChanged,
    NodeChildrenChanged,
}

impl EventType {
    pub fn from_wire(code: i32) -> Self {
        match code {
            1 => EventType::NodeCreated,
            2 => EventType::NodeDeleted,
            3 => EventType::NodeDataChanged,
            4 => EventType::NodeChildrenChanged,
            _ => EventType::None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            EventType::None => -1,
            EventType::NodeCreated => 1,
            EventType::NodeDeleted => 2,
            EventType::NodeDataChanged => 3,
            EventType::NodeChildrenChanged => 4,
        }
    }
}

/// An access-control entry: permission bitmask, authentication scheme, and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub perms: i32,
    pub scheme: String,
    pub id: String,
}

pub mod perms {
    pub const READ: i32 = 1 << 0;
    pub const WRITE: i32 = 1 << 1;
    pub const CREATE: i32 = 1 << 2;
    pub const DELETE: i32 = 1 << 3;
    pub const ADMIN: i32 = 1 << 4;
    pub const ALL: i32 = READ | WRITE | CREATE | DELETE | ADMIN;
}

impl Acl {
    /// `world:anyone` with every permission, the common "open" ACL.
    pub fn open_unsafe() -> Vec<Acl> {
        vec![Acl { perms: perms::ALL, scheme: "world".into(), id: "anyone".into() }]
    }
}

/// Znode metadata returned alongside data/children reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub czxid: i64,
    pub mzxid: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub version: i32,
    pub cversion: i32,
    pub aversion: i32,
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    pub pzxid: i64,
}

/// An auth credential registered with `add_auth`, replayed on every reconnect.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub scheme: String,
    pub credential: Vec<u8>,
}

/// A watch notification delivered out-of-band (xid == -1).
#[derive(Debug, Clone)]
pub struct WatchedEvent {
    pub event_type: EventType,
    pub keeper_state: KeeperState,
    pub path: String,
}

/// Reserved transaction ids used for frames that aren't ordinary user requests.
pub mod xid {
    pub const WATCH_EVENT: i32 = -1;
    pub const PING: i32 = -2;
    pub const AUTH: i32 = -4;
    pub const SET_WATCHES: i32 = -8;
}
