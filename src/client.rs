//! Public API surface: the handle application code actually calls.

use crate::codec::{
    CreateRequest, CreateResponse, DeleteRequest, ExistsRequest, GetAclRequest, GetAclResponse,
    GetChildren2Response, GetChildrenRequest, GetChildrenResponse, GetDataRequest, GetDataResponse,
    SetAclRequest, SetAclResponse, SetDataRequest, SetDataResponse,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::path::{self, validate_path};
use crate::protocol::{Acl, CreateMode, KeeperState, OpCode, Stat};
use crate::session::{self, SessionHandle};
use crate::watch::Watcher;
use std::sync::Arc;
use std::time::Duration;

/// A cheaply-cloneable handle to a session with a coordination-service cluster.
///
/// Cloning shares the same underlying reactor task and connection; it does not
/// open a second connection.
#[derive(Clone)]
pub struct KeeperClient {
    session: SessionHandle,
}

impl KeeperClient {
    /// Spawns the session reactor and returns immediately; the first connection
    /// attempt happens in the background. Use [`KeeperClient::keeper_state`] to
    /// observe when the handshake completes.
    pub fn connect(config: ClientConfig) -> Self {
        Self { session: session::spawn(config) }
    }

    pub fn keeper_state(&self) -> KeeperState {
        self.session.keeper_state()
    }

    fn server_path(&self, client_path: &str) -> String {
        path::prepend_chroot(self.session.chroot(), client_path)
    }

    fn client_path(&self, server_path: &str) -> String {
        path::remove_chroot(self.session.chroot(), server_path)
    }

    /// Creates a znode with the open-unsafe (`world:anyone`, all permissions)
    /// ACL. Returns the path actually created, with any sequence suffix the
    /// server appended.
    pub async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        self.create_with_acl(path, data, Acl::open_unsafe(), mode, None).await
    }

    /// `timeout`, if set, bounds this single request; it fires `Error::SystemError`
    /// with `OperationTimeout` independently of the session's own liveness timer.
    pub async fn create_with_acl(
        &self,
        path: &str,
        data: &[u8],
        acl: Vec<Acl>,
        mode: CreateMode,
        timeout: Option<Duration>,
    ) -> Result<String> {
        validate_path(path, mode.is_sequential())?;
        let body = CreateRequest { path: self.server_path(path), data: data.to_vec(), acl, flags: mode as i32 }
            .encode();
        let resp = self.session.send(OpCode::Create, body, Some(path.to_string()), timeout).await?;
        let resp = CreateResponse::decode(&resp)?;
        Ok(self.client_path(&resp.path))
    }

    pub async fn delete(&self, path: &str, version: i32, timeout: Option<Duration>) -> Result<()> {
        validate_path(path, false)?;
        let body = DeleteRequest { path: self.server_path(path), version }.encode();
        self.session.send(OpCode::Delete, body, Some(path.to_string()), timeout).await?;
        Ok(())
    }

    /// Checks whether `path` exists. If `watcher` is set, it is armed whether
    /// the node exists now or not: either way, the next create/delete/data
    /// change at `path` fires it exactly once.
    pub async fn exists(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
        timeout: Option<Duration>,
    ) -> Result<Option<Stat>> {
        validate_path(path, false)?;
        let body = ExistsRequest { path: self.server_path(path), watch: watcher.is_some() }.encode();
        let result = self.session.send(OpCode::Exists, body, Some(path.to_string()), timeout).await;
        match result {
            Ok(resp) => {
                if let Some(watcher) = watcher {
                    self.session.watches().register_data_watcher(path, watcher);
                }
                Ok(Some(SetDataResponse::decode(&resp)?.stat))
            }
            Err(Error::NoNode { .. }) => {
                if let Some(watcher) = watcher {
                    self.session.watches().register_exist_watcher(path, watcher);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Reads a znode's data. If `watcher` is set and the read succeeds, it fires
    /// once on the next data change or deletion at `path`.
    pub async fn get_data(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
        timeout: Option<Duration>,
    ) -> Result<(Vec<u8>, Stat)> {
        validate_path(path, false)?;
        let body = GetDataRequest { path: self.server_path(path), watch: watcher.is_some() }.encode();
        let resp = self.session.send(OpCode::GetData, body, Some(path.to_string()), timeout).await?;
        let resp = GetDataResponse::decode(&resp)?;
        if let Some(watcher) = watcher {
            self.session.watches().register_data_watcher(path, watcher);
        }
        Ok((resp.data, resp.stat))
    }

    pub async fn set_data(
        &self,
        path: &str,
        data: &[u8],
        version: i32,
        timeout: Option<Duration>,
    ) -> Result<Stat> {
        validate_path(path, false)?;
        let body = SetDataRequest { path: self.server_path(path), data: data.to_vec(), version }.encode();
        let resp = self.session.send(OpCode::SetData, body, Some(path.to_string()), timeout).await?;
        Ok(SetDataResponse::decode(&resp)?.stat)
    }

    pub async fn get_acl(&self, path: &str, timeout: Option<Duration>) -> Result<(Vec<Acl>, Stat)> {
        validate_path(path, false)?;
        let body = GetAclRequest { path: self.server_path(path) }.encode();
        let resp = self.session.send(OpCode::GetAcl, body, Some(path.to_string()), timeout).await?;
        let resp = GetAclResponse::decode(&resp)?;
        Ok((resp.acl, resp.stat))
    }

    pub async fn set_acl(
        &self,
        path: &str,
        acl: Vec<Acl>,
        version: i32,
        timeout: Option<Duration>,
    ) -> Result<Stat> {
        validate_path(path, false)?;
        let body = SetAclRequest { path: self.server_path(path), acl, version }.encode();
        let resp = self.session.send(OpCode::SetAcl, body, Some(path.to_string()), timeout).await?;
        Ok(SetAclResponse::decode(&resp)?.stat)
    }

    /// Lists a znode's children. If `watcher` is set and the read succeeds, it
    /// fires once on the next child added or removed under `path`.
    pub async fn get_children(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
        timeout: Option<Duration>,
    ) -> Result<Vec<String>> {
        validate_path(path, false)?;
        let body = GetChildrenRequest { path: self.server_path(path), watch: watcher.is_some() }.encode();
        let resp = self.session.send(OpCode::GetChildren, body, Some(path.to_string()), timeout).await?;
        let resp = GetChildrenResponse::decode(&resp)?;
        if let Some(watcher) = watcher {
            self.session.watches().register_child_watcher(path, watcher);
        }
        Ok(resp.children)
    }

    pub async fn get_children2(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
        timeout: Option<Duration>,
    ) -> Result<(Vec<String>, Stat)> {
        validate_path(path, false)?;
        let body = GetChildrenRequest { path: self.server_path(path), watch: watcher.is_some() }.encode();
        let resp = self.session.send(OpCode::GetChildren2, body, Some(path.to_string()), timeout).await?;
        let resp = GetChildren2Response::decode(&resp)?;
        if let Some(watcher) = watcher {
            self.session.watches().register_child_watcher(path, watcher);
        }
        Ok((resp.children, resp.stat))
    }

    /// Registers an auth credential. Replayed automatically on every reconnect
    /// for the lifetime of the session.
    pub async fn add_auth(&self, scheme: &str, credential: Vec<u8>) -> Result<()> {
        self.session.add_auth(scheme.to_string(), credential).await
    }

    /// Closes the session, notifying the server so ephemeral nodes are removed
    /// promptly instead of waiting out the session timeout.
    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }
}
