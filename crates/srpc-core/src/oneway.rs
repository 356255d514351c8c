//! Single-payload endpoints.
//!
//! `ReadEndpoint` takes no input and `WriteEndpoint` returns no output. Both
//! are plain wrappers around [`Endpoint`] with [`Empty`] on the unused side;
//! all wire behaviour comes from the general endpoint.

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Codec, Empty, EmptyCodec, JsonCodec};
use crate::endpoint::Endpoint;

/// Endpoint for procedures without parameters.
pub struct ReadEndpoint<Resp>(Endpoint<Empty, Resp>);

/// Endpoint for procedures without a result.
pub struct WriteEndpoint<Req>(Endpoint<Req, Empty>);

impl<Resp> ReadEndpoint<Resp> {
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    pub fn new<SC>(method: Method, path: impl Into<String>, response_codec: SC) -> Self
    where
        SC: Codec<Resp>,
    {
        Self(Endpoint::new(method, path, EmptyCodec::new(), response_codec))
    }

    pub fn endpoint(&self) -> &Endpoint<Empty, Resp> {
        &self.0
    }
}

impl<Resp> ReadEndpoint<Resp>
where
    Resp: Serialize + DeserializeOwned + Send + 'static,
{
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    pub fn json(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, JsonCodec::<Resp>::new())
    }
}

impl<Req> WriteEndpoint<Req> {
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    pub fn new<RC>(method: Method, path: impl Into<String>, request_codec: RC) -> Self
    where
        RC: Codec<Req>,
    {
        Self(Endpoint::new(method, path, request_codec, EmptyCodec::new()))
    }

    pub fn endpoint(&self) -> &Endpoint<Req, Empty> {
        &self.0
    }
}

impl<Req> WriteEndpoint<Req>
where
    Req: Serialize + DeserializeOwned + Send + 'static,
{
    /// # Panics
    ///
    /// Panics if `path` does not start with `/`.
    pub fn json(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, path, JsonCodec::<Req>::new())
    }
}

impl<Resp> Clone for ReadEndpoint<Resp> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<Req> Clone for WriteEndpoint<Req> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<Resp: 'static> std::fmt::Debug for ReadEndpoint<Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReadEndpoint").field(&self.0).finish()
    }
}

impl<Req: 'static> std::fmt::Debug for WriteEndpoint<Req> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WriteEndpoint").field(&self.0).finish()
    }
}

#[cfg(feature = "server")]
mod server {
    use std::future::Future;

    use super::{ReadEndpoint, WriteEndpoint};
    use crate::capability::{ProcedureError, Validate};
    use crate::codec::Empty;
    use crate::server::{Mux, RequestContext};

    impl<Resp> ReadEndpoint<Resp>
    where
        Resp: Send + 'static,
    {
        /// Like [`Endpoint::register`](crate::Endpoint::register), for
        /// procedures that only need the request context.
        pub fn register<M, F, Fut, E>(&self, mux: M, procedure: F) -> M
        where
            M: Mux,
            F: Fn(RequestContext) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Result<Resp, E>> + Send + 'static,
            E: ProcedureError,
        {
            self.0
                .register(mux, move |ctx: RequestContext, _: Empty| procedure(ctx))
        }
    }

    impl<Req> WriteEndpoint<Req>
    where
        Req: Validate + Send + 'static,
    {
        /// Like [`Endpoint::register`](crate::Endpoint::register), for
        /// procedures that return nothing on success.
        pub fn register<M, F, Fut, E>(&self, mux: M, procedure: F) -> M
        where
            M: Mux,
            F: Fn(RequestContext, Req) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Result<(), E>> + Send + 'static,
            E: ProcedureError,
        {
            self.0.register(mux, move |ctx: RequestContext, req: Req| {
                let done = procedure(ctx, req);
                async move { done.await.map(|()| Empty) }
            })
        }
    }
}

#[cfg(feature = "client")]
pub use self::client::{ReadRemote, WriteRemote};

#[cfg(feature = "client")]
mod client {
    use super::{ReadEndpoint, WriteEndpoint};
    use crate::client::{CallContext, Remote, Transport};
    use crate::codec::Empty;
    use crate::error::{ClientError, TransportError};

    /// Client side of a [`ReadEndpoint`].
    pub struct ReadRemote<Resp>(Remote<Empty, Resp>);

    /// Client side of a [`WriteEndpoint`].
    pub struct WriteRemote<Req>(Remote<Req, Empty>);

    impl<Resp> ReadEndpoint<Resp> {
        pub fn remote(&self, transport: &Transport) -> ReadRemote<Resp> {
            ReadRemote(self.0.remote(transport))
        }

        pub fn remote_with_origin(
            &self,
            origin: impl Into<String>,
        ) -> Result<ReadRemote<Resp>, TransportError> {
            self.0.remote_with_origin(origin).map(ReadRemote)
        }
    }

    impl<Req> WriteEndpoint<Req> {
        pub fn remote(&self, transport: &Transport) -> WriteRemote<Req> {
            WriteRemote(self.0.remote(transport))
        }

        pub fn remote_with_origin(
            &self,
            origin: impl Into<String>,
        ) -> Result<WriteRemote<Req>, TransportError> {
            self.0.remote_with_origin(origin).map(WriteRemote)
        }
    }

    impl<Resp: 'static> ReadRemote<Resp> {
        pub async fn call(&self) -> Result<Resp, ClientError> {
            self.0.call(Empty).await
        }

        pub async fn call_with(&self, ctx: &CallContext) -> Result<Resp, ClientError> {
            self.0.call_with(ctx, Empty).await
        }

        pub fn url(&self) -> &str {
            self.0.url()
        }
    }

    impl<Req: 'static> WriteRemote<Req> {
        pub async fn call(&self, req: Req) -> Result<(), ClientError> {
            self.0.call(req).await.map(|Empty| ())
        }

        pub async fn call_with(&self, ctx: &CallContext, req: Req) -> Result<(), ClientError> {
            self.0.call_with(ctx, req).await.map(|Empty| ())
        }

        pub fn url(&self) -> &str {
            self.0.url()
        }
    }

    impl<Resp> Clone for ReadRemote<Resp> {
        fn clone(&self) -> Self {
            Self(self.0.clone())
        }
    }

    impl<Req> Clone for WriteRemote<Req> {
        fn clone(&self) -> Self {
            Self(self.0.clone())
        }
    }
}
