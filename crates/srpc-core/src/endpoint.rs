//! Endpoint descriptors.
//!
//! An `Endpoint` is the single description both sides are derived from:
//! [`Endpoint::register`](crate::server) builds the server handler and
//! [`Endpoint::remote`](crate::client) builds the client callable. Clones
//! share one allocation.

use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, Empty, EmptyCodec, JsonCodec};
use crate::error::EndpointError;

/// Query parameter carrying the encoded request for non state-changing
/// methods.
pub const QUERY_KEY: &str = "srpc";

/// Typed description of one remote procedure.
pub struct Endpoint<Req, Resp> {
    inner: Arc<Inner<Req, Resp>>,
}

struct Inner<Req, Resp> {
    method: Method,
    path: String,
    state_changing: bool,
    request_codec: Arc<dyn Codec<Req>>,
    response_codec: Arc<dyn Codec<Resp>>,
}

impl<Req, Resp> Endpoint<Req, Resp> {
    /// Describe an endpoint with explicit codecs.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`. Use [`Endpoint::try_new`]
    /// when the path is not a literal.
    pub fn new<RC, SC>(
        method: Method,
        path: impl Into<String>,
        request_codec: RC,
        response_codec: SC,
    ) -> Self
    where
        RC: Codec<Req>,
        SC: Codec<Resp>,
    {
        match Self::try_new(method, path, request_codec, response_codec) {
            Ok(endpoint) => endpoint,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_new<RC, SC>(
        method: Method,
        path: impl Into<String>,
        request_codec: RC,
        response_codec: SC,
    ) -> Result<Self, EndpointError>
    where
        RC: Codec<Req>,
        SC: Codec<Resp>,
    {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(EndpointError::Path(path));
        }
        let state_changing = is_state_changing(&method);
        Ok(Self {
            inner: Arc::new(Inner {
                method,
                path,
                state_changing,
                request_codec: Arc::new(request_codec),
                response_codec: Arc::new(response_codec),
            }),
        })
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Whether the request travels in the body (true) or in the `srpc`
    /// query parameter (false).
    pub fn is_state_changing(&self) -> bool {
        self.inner.state_changing
    }

    /// Dispatcher pattern, e.g. `"POST /notes"`.
    pub fn pattern(&self) -> String {
        format!("{} {}", self.inner.method, self.inner.path)
    }

    pub fn request_codec(&self) -> &dyn Codec<Req> {
        self.inner.request_codec.as_ref()
    }

    pub fn response_codec(&self) -> &dyn Codec<Resp> {
        self.inner.response_codec.as_ref()
    }
}

impl<Req, Resp> Endpoint<Req, Resp>
where
    Req: Serialize + DeserializeOwned + Send + 'static,
    Resp: Serialize + DeserializeOwned + Send + 'static,
{
    /// Endpoint with JSON on both sides.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    pub fn json(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, JsonCodec::<Req>::new(), JsonCodec::<Resp>::new())
    }
}

impl Endpoint<Empty, Empty> {
    /// Endpoint that carries nothing either way.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    pub fn empty(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, EmptyCodec::new(), EmptyCodec::new())
    }
}

impl<Req, Resp> Clone for Endpoint<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Req: 'static, Resp: 'static> fmt::Debug for Endpoint<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .field("state_changing", &self.inner.state_changing)
            .field("request_content_type", &self.inner.request_codec.content_type())
            .field("response_content_type", &self.inner.response_codec.content_type())
            .finish()
    }
}

/// Everything but GET, HEAD and OPTIONS may change server state.
pub fn is_state_changing(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
