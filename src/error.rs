//! Error types for the session client.

use std::io;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// System-level error subcodes (all map to the `-1` server error bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemErrorKind {
    RuntimeInconsistency,
    DataInconsistency,
    ConnectionLoss,
    MarshallingError,
    Unimplemented,
    OperationTimeout,
    BadArguments,
    ApiError,
    Unknown(i32),
}

impl std::fmt::Display for SystemErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RuntimeInconsistency => write!(f, "runtime inconsistency"),
            Self::DataInconsistency => write!(f, "data inconsistency"),
            Self::ConnectionLoss => write!(f, "connection loss"),
            Self::MarshallingError => write!(f, "marshalling error"),
            Self::Unimplemented => write!(f, "unimplemented"),
            Self::OperationTimeout => write!(f, "operation timeout"),
            Self::BadArguments => write!(f, "bad arguments"),
            Self::ApiError => write!(f, "API error"),
            Self::Unknown(code) => write!(f, "system error {code}"),
        }
    }
}

/// Errors that can occur while using the session client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A client-supplied path failed validation before anything was sent.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A wire record was truncated while decoding.
    #[error("truncated message: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A wire record carried a nonsensical length prefix.
    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    /// A byte array or string was not valid according to the codec contract.
    #[error("decode error: {0}")]
    Decode(String),

    /// Server reported a system-level error (bucket code `-1`).
    #[error("{kind} (path: {path:?})")]
    SystemError { kind: SystemErrorKind, path: Option<String> },

    /// No such node.
    #[error("no node: {path}")]
    NoNode { path: String },
    /// Not authorized to perform the operation.
    #[error("not authorized: {path}")]
    NoAuth { path: String },
    /// Version of a `SetData`/`SetACL`/`Delete` did not match.
    #[error("bad version for {path}")]
    BadVersion { path: String },
    /// Ephemeral nodes may not have children.
    #[error("ephemeral node cannot have children: {path}")]
    NoChildrenForEphemerals { path: String },
    /// Node already exists.
    #[error("node exists: {path}")]
    NodeExists { path: String },
    /// Node has children and the operation requires it to be empty.
    #[error("node not empty: {path}")]
    NotEmpty { path: String },
    /// The supplied ACL was invalid.
    #[error("invalid ACL for {path}")]
    InvalidAcl { path: String },
    /// Authentication failed; the session is terminated.
    #[error("authentication failed")]
    AuthFailed,
    /// An invalid callback was supplied.
    #[error("invalid callback for {path}")]
    InvalidCallback { path: String },
    /// The session has expired; it can no longer be used.
    #[error("session expired")]
    SessionExpired,
    /// The session's state has moved to a different server than expected.
    #[error("session moved")]
    SessionMoved,

    /// An error code the client does not recognize.
    #[error("unknown server error {code} (path: {path:?})")]
    UnknownError { code: i32, path: Option<String> },

    /// The session is closed and can no longer accept requests.
    #[error("session is closed")]
    Closed,
}

impl Error {
    /// Translate a server-reported error code (see protocol::ErrorCode) into a typed `Error`.
    pub fn from_code(code: i32, path: impl Into<Option<String>>) -> Self {
        let path = path.into();
        match code {
            -1 => Error::SystemError { kind: SystemErrorKind::Unknown(code), path },
            -2 => Error::SystemError { kind: SystemErrorKind::RuntimeInconsistency, path },
            -3 => Error::SystemError { kind: SystemErrorKind::DataInconsistency, path },
            -4 => Error::SystemError { kind: SystemErrorKind::ConnectionLoss, path },
            -5 => Error::SystemError { kind: SystemErrorKind::MarshallingError, path },
            -6 => Error::SystemError { kind: SystemErrorKind::Unimplemented, path },
            -7 => Error::SystemError { kind: SystemErrorKind::OperationTimeout, path },
            -8 => Error::SystemError { kind: SystemErrorKind::BadArguments, path },
            -100 => Error::SystemError { kind: SystemErrorKind::ApiError, path },
            -101 => Error::NoNode { path: path.unwrap_or_default() },
            -102 => Error::NoAuth { path: path.unwrap_or_default() },
            -103 => Error::BadVersion { path: path.unwrap_or_default() },
            -108 => Error::NoChildrenForEphemerals { path: path.unwrap_or_default() },
            -110 => Error::NodeExists { path: path.unwrap_or_default() },
            -111 => Error::NotEmpty { path: path.unwrap_or_default() },
            -112 => Error::SessionExpired,
            -114 => Error::InvalidAcl { path: path.unwrap_or_default() },
            -115 => Error::AuthFailed,
            -116 => Error::InvalidCallback { path: path.unwrap_or_default() },
            -118 => Error::SessionMoved,
            other => Error::UnknownError { code: other, path },
        }
    }

    /// True if this error is session-fatal (terminates the whole session, not just one op).
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Error::SessionExpired | Error::AuthFailed)
    }
}
