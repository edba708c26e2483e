//! Big-endian wire codec for the session protocol's fixed-layout records.
//!
//! Integral widths: `i32` (4B), `i64` (8B), `bool` (1B), byte array (`i32` length
//! prefix then bytes; `-1` length denotes null), string (same as byte array, UTF-8).
//! Composite records concatenate fields in declaration order. The codec is total: it
//! fails deterministically on truncated input or a negative length prefix other than
//! the reserved `-1`, and never interprets the semantics of what it moves.

use crate::error::{Error, Result};
use crate::protocol::{Acl, AuthRequest, Stat, WatchedEvent};
use bytes::{BufMut, BytesMut};

/// Appends big-endian primitives to an in-memory buffer.
pub struct Writer {
    buf: BytesMut,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.put_i64(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.buf.put_u8(v as u8);
        self
    }

    /// `None` is encoded as length `-1` with no payload.
    pub fn bytes(&mut self, v: Option<&[u8]>) -> &mut Self {
        match v {
            Some(b) => {
                self.buf.put_i32(b.len() as i32);
                self.buf.put_slice(b);
            }
            None => {
                self.buf.put_i32(-1);
            }
        }
        self
    }

    pub fn string(&mut self, v: &str) -> &mut Self {
        self.bytes(Some(v.as_bytes()));
        self
    }

    pub fn string_vec(&mut self, v: &[String]) -> &mut Self {
        self.i32(v.len() as i32);
        for s in v {
            self.string(s);
        }
        self
    }

    pub fn acl_vec(&mut self, v: &[Acl]) -> &mut Self {
        self.i32(v.len() as i32);
        for acl in v {
            self.i32(acl.perms).string(&acl.scheme).string(&acl.id);
        }
        self
    }

    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads big-endian primitives out of a borrowed buffer, failing deterministically
/// (never panicking) on truncated input.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Truncated { expected: n, actual: self.remaining() });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes(b.try_into().unwrap()))
    }

    pub fn i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes(b.try_into().unwrap()))
    }

    pub fn bool(&mut self) -> Result<bool> {
        let b = self.take(1)?;
        Ok(b[0] != 0)
    }

    /// Reads a length-prefixed byte array; `-1` length decodes to `None`.
    pub fn bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let len = self.i32()?;
        if len == -1 {
            return Ok(None);
        }
        if len < 0 {
            return Err(Error::InvalidLength(len));
        }
        Ok(Some(self.take(len as usize)?.to_vec()))
    }

    pub fn string(&mut self) -> Result<String> {
        let bytes = self.bytes()?.ok_or_else(|| Error::Decode("expected non-null string".into()))?;
        String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    pub fn string_vec(&mut self) -> Result<Vec<String>> {
        let len = self.i32()?;
        if len < 0 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            out.push(self.string()?);
        }
        Ok(out)
    }

    pub fn acl_vec(&mut self) -> Result<Vec<Acl>> {
        let len = self.i32()?;
        if len < 0 {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let perms = self.i32()?;
            let scheme = self.string()?;
            let id = self.string()?;
            out.push(Acl { perms, scheme, id });
        }
        Ok(out)
    }

    pub fn stat(&mut self) -> Result<Stat> {
        Ok(Stat {
            czxid: self.i64()?,
            mzxid: self.i64()?,
            ctime: self.i64()?,
            mtime: self.i64()?,
            version: self.i32()?,
            cversion: self.i32()?,
            aversion: self.i32()?,
            ephemeral_owner: self.i64()?,
            data_length: self.i32()?,
            num_children: self.i32()?,
            pzxid: self.i64()?,
        })
    }
}

#[cfg(test)]
fn write_stat(w: &mut Writer, s: &Stat) {
    w.i64(s.czxid)
        .i64(s.mzxid)
        .i64(s.ctime)
        .i64(s.mtime)
        .i32(s.version)
        .i32(s.cversion)
        .i32(s.aversion)
        .i64(s.ephemeral_owner)
        .i32(s.data_length)
        .i32(s.num_children)
        .i64(s.pzxid);
}

/// `ConnectRequest`: protoVer:i32, lastZxid:i64, timeout:i32, sessionId:i64, passwd:bytes.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub protocol_version: i32,
    pub last_zxid: i64,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub password: [u8; 16],
}

impl ConnectRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.i32(self.protocol_version)
            .i64(self.last_zxid)
            .i32(self.timeout_ms)
            .i64(self.session_id)
            .bytes(Some(&self.password));
        w.into_bytes()
    }
}

/// `ConnectResponse`: protoVer:i32, timeout:i32, sessionId:i64, passwd:bytes.
#[derive(Debug, Clone)]
pub struct ConnectResponse {
    pub protocol_version: i32,
    pub timeout_ms: i32,
    pub session_id: i64,
    pub password: [u8; 16],
}

impl ConnectResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let protocol_version = r.i32()?;
        let timeout_ms = r.i32()?;
        let session_id = r.i64()?;
        let password_vec = r.bytes()?.unwrap_or_default();
        let mut password = [0u8; 16];
        let n = password_vec.len().min(16);
        password[..n].copy_from_slice(&password_vec[..n]);
        Ok(Self { protocol_version, timeout_ms, session_id, password })
    }
}

/// Request frame body for `Create`.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub path: String,
    pub data: Vec<u8>,
    pub acl: Vec<Acl>,
    pub flags: i32,
}

impl CreateRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).bytes(Some(&self.data)).acl_vec(&self.acl).i32(self.flags);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct CreateResponse {
    pub path: String,
}

impl CreateResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        Ok(Self { path: r.string()? })
    }
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub path: String,
    pub version: i32,
}

impl DeleteRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).i32(self.version);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct ExistsRequest {
    pub path: String,
    pub watch: bool,
}

impl ExistsRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).bool(self.watch);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct GetDataRequest {
    pub path: String,
    pub watch: bool,
}

impl GetDataRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).bool(self.watch);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct GetDataResponse {
    pub data: Vec<u8>,
    pub stat: Stat,
}

impl GetDataResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let payload = r.bytes()?.unwrap_or_default();
        let stat = r.stat()?;
        Ok(Self { data: payload, stat })
    }
}

#[derive(Debug, Clone)]
pub struct SetDataRequest {
    pub path: String,
    pub data: Vec<u8>,
    pub version: i32,
}

impl SetDataRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).bytes(Some(&self.data)).i32(self.version);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct SetDataResponse {
    pub stat: Stat,
}

impl SetDataResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        Ok(Self { stat: r.stat()? })
    }
}

#[derive(Debug, Clone)]
pub struct GetAclRequest {
    pub path: String,
}

impl GetAclRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct GetAclResponse {
    pub acl: Vec<Acl>,
    pub stat: Stat,
}

impl GetAclResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let acl = r.acl_vec()?;
        let stat = r.stat()?;
        Ok(Self { acl, stat })
    }
}

#[derive(Debug, Clone)]
pub struct SetAclRequest {
    pub path: String,
    pub acl: Vec<Acl>,
    pub version: i32,
}

impl SetAclRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).acl_vec(&self.acl).i32(self.version);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct SetAclResponse {
    pub stat: Stat,
}

impl SetAclResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        Ok(Self { stat: r.stat()? })
    }
}

#[derive(Debug, Clone)]
pub struct GetChildrenRequest {
    pub path: String,
    pub watch: bool,
}

impl GetChildrenRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.string(&self.path).bool(self.watch);
        w.into_bytes()
    }
}

#[derive(Debug, Clone)]
pub struct GetChildrenResponse {
    pub children: Vec<String>,
}

impl GetChildrenResponse {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        Ok(Self { children: r.string_vec()? })
    }
}

#[derive(Debug, Clone)]
pub struct GetChildren2Response {
    pub children: Vec<String>,
    pub stat: Stat,
}

impl GetChildren2Response {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let children = r.string_vec()?;
        let stat = r.stat()?;
        Ok(Self { children, stat })
    }
}

/// `SetWatchesRequest`: replayed on reconnect with every currently-armed path.
#[derive(Debug, Clone)]
pub struct SetWatchesRequest {
    pub relative_zxid: i64,
    pub data_paths: Vec<String>,
    pub exist_paths: Vec<String>,
    pub child_paths: Vec<String>,
}

impl SetWatchesRequest {
    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.i64(self.relative_zxid)
            .string_vec(&self.data_paths)
            .string_vec(&self.exist_paths)
            .string_vec(&self.child_paths);
        w.into_bytes()
    }
}

impl AuthRequest {
    pub fn encode(&self, auth_type: i32) -> BytesMut {
        let mut w = Writer::new();
        w.i32(auth_type).string(&self.scheme).bytes(Some(&self.credential));
        w.into_bytes()
    }
}

impl WatchedEvent {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let event_type = crate::protocol::EventType::from_wire(r.i32()?);
        let keeper_state = crate::protocol::KeeperState::from_wire(r.i32()?);
        let path = r.string()?;
        Ok(Self { event_type, keeper_state, path })
    }

    pub fn encode(&self) -> BytesMut {
        let mut w = Writer::new();
        w.i32(self.event_type.to_wire()).i32(self.keeper_state.to_wire()).string(&self.path);
        w.into_bytes()
    }
}

/// A decoded response envelope: `{xid, zxid, err, body}`.
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    pub xid: i32,
    pub zxid: i64,
    pub err: i32,
}

impl ResponseHeader {
    /// Decodes the fixed `{xid, zxid, err}` prefix, returning it plus the remaining body.
    pub fn decode(data: &[u8]) -> Result<(Self, &[u8])> {
        let mut r = Reader::new(data);
        let xid = r.i32()?;
        let zxid = r.i64()?;
        let err = r.i32()?;
        Ok((Self { xid, zxid, err }, &data[r.pos..]))
    }
}

/// Prepends a request header `{xid, opcode}` to an already-encoded body.
pub fn request_frame(xid: i32, opcode: i32, body: &[u8]) -> BytesMut {
    let mut w = Writer::new();
    w.i32(xid).i32(opcode);
    let mut out = w.into_bytes();
    out.extend_from_slice(body);
    out
}
