//! Error classification for dataplane calls.
//!
//! A call fails in one of three ways: the RPC itself did not complete
//! ([`Error::Transport`]), the service answered with a nonzero status
//! ([`Error::Server`]), or a value could not be converted
//! ([`Error::Parse`], [`Error::InvalidEnum`]).

use std::fmt;

use thiserror::Error;

use crate::api::types::{Kind, Status};

/// Numeric domain status codes reported by dp-service.
pub mod codes {
    pub const BAD_REQUEST: i32 = 101;
    pub const NOT_FOUND: i32 = 201;
    pub const ALREADY_EXISTS: i32 = 202;
    pub const WRONG_TYPE: i32 = 203;
    pub const BAD_IPVER: i32 = 204;
    pub const NO_VM: i32 = 205;
    pub const NO_VNI: i32 = 206;
    pub const ITERATOR: i32 = 207;
    pub const OUT_OF_MEMORY: i32 = 208;
    pub const LIMIT_REACHED: i32 = 209;
    pub const ALREADY_RESET: i32 = 210;
    pub const NO_LB: i32 = 211;
    pub const NO_DROP_SUPPORT: i32 = 212;
    // Routing
    pub const ROUTE_EXISTS: i32 = 301;
    pub const ROUTE_NOT_FOUND: i32 = 302;
    pub const ROUTE_INSERT: i32 = 303;
    pub const ROUTE_BAD_PORT: i32 = 304;
    pub const ROUTE_RESET: i32 = 305;
    // DNAT
    pub const DNAT_NO_DATA: i32 = 321;
    pub const DNAT_CREATE: i32 = 322;
    pub const DNAT_EXISTS: i32 = 323;
    // SNAT
    pub const SNAT_NO_DATA: i32 = 341;
    pub const SNAT_CREATE: i32 = 342;
    pub const SNAT_ALLOC: i32 = 343;
    pub const SNAT_KEY: i32 = 344;
    pub const SNAT_EXISTS: i32 = 345;
    // VNI
    pub const VNI_INIT4: i32 = 361;
    pub const VNI_INIT6: i32 = 362;
    pub const VNI_FREE4: i32 = 363;
    pub const VNI_FREE6: i32 = 364;
    // Ports
    pub const PORT_START: i32 = 381;
    pub const PORT_STOP: i32 = 382;
    // Inserts
    pub const VNF_INSERT: i32 = 401;
    pub const VM_INSERT: i32 = 402;
    pub const VM_PREFIX_INSERT: i32 = 403;

    /// Process exit code for failures on the client side.
    pub const CLIENT_ERROR: i32 = 1;
    /// Process exit code for a nonzero domain status.
    pub const SERVER_ERROR: i32 = 2;
}

/// A wire value that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse {field}: {value:?}")]
pub struct ParseError {
    pub field: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// An enumeration token outside the accepted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEnumError {
    pub field: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

impl InvalidEnumError {
    pub fn new(field: &'static str, value: impl Into<String>, allowed: &'static [&'static str]) -> Self {
        Self {
            field,
            value: value.into(),
            allowed,
        }
    }
}

impl fmt::Display for InvalidEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value {:?} for {}, allowed: {}",
            self.value,
            self.field,
            self.allowed.join(", ")
        )
    }
}

impl std::error::Error for InvalidEnumError {}

/// Errors returned by [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The RPC did not complete.
    #[error("transport error on {kind} {name:?}: {status}")]
    Transport {
        kind: Kind,
        name: String,
        status: Box<tonic::Status>,
    },

    /// The channel could not be established.
    #[error("connect: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// The service answered with a nonzero status code.
    #[error("server error on {kind} {name:?}: {status}")]
    Server {
        kind: Kind,
        name: String,
        status: Status,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    InvalidEnum(#[from] InvalidEnumError),

    /// Sub-responses of one operation disagree with each other or the request.
    #[error("inconsistent response: {0}")]
    InconsistentResponse(String),
}

impl Error {
    pub fn transport(kind: Kind, name: impl Into<String>, status: tonic::Status) -> Self {
        Error::Transport {
            kind,
            name: name.into(),
            status: Box::new(status),
        }
    }

    /// Kind and name of the resource a failed call was about.
    pub fn resource(&self) -> Option<(Kind, &str)> {
        match self {
            Error::Transport { kind, name, .. } | Error::Server { kind, name, .. } => Some((*kind, name.as_str())),
            _ => None,
        }
    }

    /// gRPC status of a transport failure.
    pub fn grpc_status(&self) -> Option<&tonic::Status> {
        match self {
            Error::Transport { status, .. } => Some(&**status),
            _ => None,
        }
    }

    /// Domain status carried by a server error.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Error::Server { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Domain status code carried by a server error.
    pub fn status_code(&self) -> Option<i32> {
        self.status().map(|s| s.code)
    }

    /// True if this is a server error with one of the given codes.
    pub fn is_status_code(&self, codes: &[i32]) -> bool {
        self.status_code().is_some_and(|c| codes.contains(&c))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Connect(_))
    }

    /// Exit code a command line front end should use for this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_server_error() {
            codes::SERVER_ERROR
        } else {
            codes::CLIENT_ERROR
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Treats a server error with `code` as "nothing there".
///
/// `Ok(v)` becomes `Ok(Some(v))`, a server error with the given code becomes
/// `Ok(None)`, everything else is passed through.
pub fn ignore_status_code<T>(result: Result<T>, code: i32) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_status_code(&[code]) => Ok(None),
        Err(e) => Err(e),
    }
}
