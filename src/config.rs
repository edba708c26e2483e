//! Client configuration surface.

use crate::endpoint::EndpointList;
use crate::error::Result;
use crate::path::validate_path;
use crate::watch::Watcher;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a session client. The connection string and chroot are
/// validated eagerly at construction so a malformed config never reaches the
/// reactor.
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) endpoints: EndpointList,
    pub(crate) session_timeout: Duration,
    pub(crate) chroot: Option<String>,
    pub(crate) default_watcher: Option<Arc<dyn Watcher>>,
}

impl ClientConfig {
    /// `connect_string` is a comma-separated `host:port` list, e.g.
    /// `"a.example.com:2181,b.example.com:2181"`.
    pub fn new(connect_string: &str, session_timeout: Duration) -> Result<Self> {
        let endpoints = EndpointList::parse(connect_string)?;
        Ok(Self { endpoints, session_timeout, chroot: None, default_watcher: None })
    }

    /// Roots every path the client sends at `chroot`, transparently stripped back
    /// off of every path the client returns.
    pub fn with_chroot(mut self, chroot: impl Into<String>) -> Result<Self> {
        let chroot = chroot.into();
        validate_path(&chroot, false)?;
        self.chroot = if chroot == "/" { None } else { Some(chroot) };
        Ok(self)
    }

    pub fn with_default_watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.default_watcher = Some(watcher);
        self
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn chroot(&self) -> Option<&str> {
        self.chroot.as_deref()
    }
}
