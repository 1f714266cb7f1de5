//! etcdkit-common: shared types for the etcdkit workspace.
//!
//! Provides the `Endpoint` address type, the `KeyValueRecord` returned by
//! reads, and the error taxonomy shared by the client and its transports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Port used when an endpoint URL omits one (etcd client port).
pub const DEFAULT_PORT: u16 = 2379;

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// URL scheme of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network-reachable member of the key-value cluster.
///
/// Immutable once constructed. Parsed from `scheme://host:port`, or from a
/// bare `host:port` (scheme defaults to `http`, port to [`DEFAULT_PORT`]).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from its parts.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Result<Self, ClientError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ClientError::Configuration("endpoint host is empty".into()));
        }
        Ok(Self { scheme, host, port })
    }

    /// Shorthand for a plain-text `http` endpoint.
    pub fn http(host: impl Into<String>, port: u16) -> Result<Self, ClientError> {
        Self::new(Scheme::Http, host, port)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Canonical URI handed to transports, e.g. `http://etcd-00:2379`.
    pub fn uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint({})", self)
    }
}

impl FromStr for Endpoint {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| ClientError::Configuration(format!("invalid endpoint '{}': {}", s, why));

        let trimmed = s.trim();
        let (scheme, rest) = match trimmed.split_once("://") {
            Some(("http", rest)) => (Scheme::Http, rest),
            Some(("https", rest)) => (Scheme::Https, rest),
            Some((other, _)) => return Err(invalid(&format!("unsupported scheme '{}'", other))),
            None => (Scheme::Http, trimmed),
        };

        let authority = rest.strip_suffix('/').unwrap_or(rest);
        if authority.contains('/') {
            return Err(invalid("path components are not allowed"));
        }

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in IPv6 host"))?;
            let port = match after {
                "" => None,
                p => Some(p.strip_prefix(':').ok_or_else(|| invalid("expected ':' after ']'"))?),
            };
            (host, port)
        } else {
            let (host, port) = match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            };
            if host.contains(':') {
                return Err(invalid("IPv6 hosts must be enclosed in '[' ']'"));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = match port {
            Some(p) => p.parse::<u16>().map_err(|_| invalid("invalid port"))?,
            None => DEFAULT_PORT,
        };

        Self::new(scheme, host, port)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

// ---------------------------------------------------------------------------
// KeyValueRecord
// ---------------------------------------------------------------------------

/// A key and its value as reported by the store for a single read.
///
/// Revision metadata is informational; transports that do not carry it
/// leave it at zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyValueRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub create_revision: i64,
    pub mod_revision: i64,
    pub version: i64,
}

impl KeyValueRecord {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single failed attempt against one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("unsupported endpoint: {0}")]
    Unsupported(String),

    /// The server answered but refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Whether the next endpoint should be tried after this failure.
    pub fn is_failover(&self) -> bool {
        !matches!(self, TransportError::Rejected(_))
    }
}

/// The failure recorded for one endpoint during an exhausted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: Endpoint,
    pub cause: TransportError,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.cause)
    }
}

/// Why a call stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller flipped the cancel signal.
    Signal,
    /// The call deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Signal => f.write_str("cancelled by caller"),
            CancelReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("all {} endpoint(s) unreachable: {}", .failures.len(), join_failures(.failures))]
    AllEndpointsUnreachable { failures: Vec<EndpointFailure> },

    #[error("call cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("request rejected by {endpoint}: {message}")]
    Rejected { endpoint: Endpoint, message: String },
}

fn join_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
