//! srpc core: typed remote procedures over plain HTTP exchanges.
//!
//! One [`Endpoint`] (method, path, request codec, response codec) yields both
//! sides of a procedure:
//!
//! - **server**: [`Endpoint::register`] binds a typed handler on an axum
//!   `Router`
//! - **client**: [`Endpoint::remote`] gives a typed callable bound to a
//!   [`Transport`]
//!
//! Both sides run the same codecs, so they cannot drift apart.
//!
//! # Wire format
//!
//! GET, HEAD and OPTIONS carry the encoded request in the `srpc` query
//! parameter and send no body; every other method sends it as the body.
//! `Content-Type` comes from the producing codec. `200 OK` is the only
//! success; any other status carries a plain-text message, rebuilt on the
//! client as a [`WireError`].
//!
//! # Example
//!
//! ```ignore
//! use srpc_core::{Endpoint, RequestContext, WireError};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Greet { name: String }
//! impl srpc_core::Validate for Greet {}
//!
//! let greet = Endpoint::<Greet, String>::json(http::Method::POST, "/greet");
//!
//! // Server
//! let app = greet.register(axum::Router::new(), |_ctx: RequestContext, req: Greet| async move {
//!     Ok::<_, WireError>(format!("Hello, {}!", req.name))
//! });
//!
//! // Client
//! let hello = greet.remote_with_origin("http://127.0.0.1:3210")?;
//! let text = hello.call(Greet { name: "Ada".into() }).await?;
//! ```
//!
//! # Feature Flags
//!
//! - `server` (default): server binding on axum.
//! - `client` (default): client binding on reqwest.

pub mod capability;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod oneway;
pub mod payload;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod server;

// Convenience re-exports
pub use capability::{ProcedureError, Validate};
pub use codec::{BytesCodec, Codec, Empty, EmptyCodec, JsonCodec, JSON_CONTENT_TYPE};
pub use endpoint::{Endpoint, QUERY_KEY};
pub use error::{CodecError, EndpointError, TransportError, WireError};
pub use oneway::{ReadEndpoint, WriteEndpoint};
pub use payload::Payload;

#[cfg(feature = "client")]
pub use client::{CallContext, Remote, Transport, TransportBuilder};
#[cfg(feature = "client")]
pub use error::ClientError;
#[cfg(feature = "client")]
pub use oneway::{ReadRemote, WriteRemote};

#[cfg(feature = "server")]
pub use server::{Mux, Procedure, RequestContext};

// Re-exported so callers can name methods and statuses without an extra
// dependency.
pub use http::{Method, StatusCode};
