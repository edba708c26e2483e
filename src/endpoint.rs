//! Endpoint list parsing and round-robin rotation.

use crate::error::{Error, Result};

/// A single `host:port` server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The ordered list of server endpoints parsed once from a connection string,
/// rotated round-robin on each reconnect attempt.
#[derive(Debug, Clone)]
pub struct EndpointList {
    endpoints: Vec<Endpoint>,
    next: usize,
}

impl EndpointList {
    /// Parses a comma-separated `host:port,host:port,...` connection string.
    pub fn parse(connect_string: &str) -> Result<Self> {
        let mut endpoints = Vec::new();
        for part in connect_string.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (host, port) = part.rsplit_once(':').ok_or_else(|| {
                Error::InvalidPath(format!("invalid endpoint (expected host:port): {part}"))
            })?;
            let port: u16 = port
                .parse()
                .map_err(|_| Error::InvalidPath(format!("invalid port in endpoint: {part}")))?;
            if host.is_empty() {
                return Err(Error::InvalidPath(format!("invalid endpoint (empty host): {part}")));
            }
            endpoints.push(Endpoint { host: host.to_string(), port });
        }
        if endpoints.is_empty() {
            return Err(Error::InvalidPath("connection string has no endpoints".into()));
        }
        Ok(Self { endpoints, next: 0 })
    }

    /// Returns the next endpoint to try and advances the round-robin cursor.
    pub fn next_endpoint(&mut self) -> Endpoint {
        let endpoint = self.endpoints[self.next % self.endpoints.len()].clone();
        self.next = (self.next + 1) % self.endpoints.len();
        endpoint
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_endpoint() {
        let list = EndpointList::parse("127.0.0.1:2181").unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn parses_and_rotates_multiple_endpoints() {
        let mut list = EndpointList::parse("a:1, b:2 ,c:3").unwrap();
        assert_eq!(list.len(), 3);
        let e1 = list.next_endpoint();
        let e2 = list.next_endpoint();
        let e3 = list.next_endpoint();
        let e4 = list.next_endpoint();
        assert_eq!(e1.host, "a");
        assert_eq!(e2.host, "b");
        assert_eq!(e3.host, "c");
        assert_eq!(e4, e1);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(EndpointList::parse("").is_err());
        assert!(EndpointList::parse("nohost").is_err());
        assert!(EndpointList::parse(":1234").is_err());
        assert!(EndpointList::parse("host:notaport").is_err());
    }
}
