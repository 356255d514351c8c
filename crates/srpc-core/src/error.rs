//! Error types for srpc.
//!
//! `WireError` is the one that crosses the network: servers produce it from
//! failing procedures, clients rebuild it from non-OK responses. The rest
//! are local to one side.

use std::fmt;
use std::io;

use http::StatusCode;

/// A status and message carried across the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    pub code: StatusCode,
    pub message: String,
}

impl WireError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error whose message is the canonical reason phrase of `code`.
    pub fn from_status(code: StatusCode) -> Self {
        Self::new(code, code.canonical_reason().unwrap_or_default())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.code.as_u16(),
            self.code.canonical_reason().unwrap_or("Unknown"),
            self.message
        )
    }
}

impl std::error::Error for WireError {}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for WireError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::header;

        let message = if self.message.is_empty() {
            self.code.canonical_reason().unwrap_or_default().to_string()
        } else {
            self.message
        };
        (
            self.code,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            message,
        )
            .into_response()
    }
}

/// Failure inside a codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Invalid endpoint description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("path must start with '/', {0:?} provided")]
    Path(String),
}

/// Invalid transport configuration.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bad transport origin: invalid URL: {0}")]
    InvalidUrl(String),

    #[error("bad transport origin: scheme must be \"http\" or \"https\": {0:?}")]
    Scheme(String),

    #[error("bad transport origin: path must be empty: {0:?}")]
    Path(String),

    #[error("bad transport origin: query must be empty: {0:?}")]
    Query(String),

    #[error("invalid cookie {name:?}: {reason}")]
    Cookie { name: String, reason: String },
}

/// Failure of a remote call, as seen by the caller.
#[cfg(feature = "client")]
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("encoding request: {0}")]
    Encode(#[source] CodecError),

    #[error("converting request to HTTP: {0}")]
    Build(String),

    #[error("issuing request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    #[error("{0}")]
    Wire(WireError),

    #[error("Content-Type: want {want:?} got {got:?}")]
    ContentType { want: String, got: String },

    #[error("decoding response: {0}")]
    Decode(#[source] CodecError),

    #[error("closing {what}: {source}")]
    Close {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{}", join_messages(.0))]
    Joined(Vec<ClientError>),
}

#[cfg(feature = "client")]
impl ClientError {
    /// Combine two failures of the same call, keeping both.
    pub fn join(self, other: ClientError) -> ClientError {
        let mut errors = match self {
            ClientError::Joined(errors) => errors,
            err => vec![err],
        };
        match other {
            ClientError::Joined(more) => errors.extend(more),
            err => errors.push(err),
        }
        ClientError::Joined(errors)
    }

    /// The remote status and message, if the server answered with an error.
    pub fn wire(&self) -> Option<&WireError> {
        match self {
            ClientError::Wire(wire) => Some(wire),
            ClientError::Joined(errors) => errors.iter().find_map(ClientError::wire),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ClientError::Request(err) => err.is_timeout(),
            ClientError::Joined(errors) => errors.iter().any(ClientError::is_timeout),
            _ => false,
        }
    }
}

#[cfg(feature = "client")]
fn join_messages(errors: &[ClientError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
