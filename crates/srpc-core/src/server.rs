//! Server binding: turns an [`Endpoint`] plus a procedure into a handler on
//! a dispatcher.
//!
//! Each inbound exchange goes through five steps, any of the first four of
//! which can end it with an error response:
//!
//! 1. decode the request (body, or the `srpc` query parameter for GET,
//!    HEAD and OPTIONS)
//! 2. validate it
//! 3. invoke the procedure
//! 4. encode the response
//! 5. stream it back
//!
//! Once step 5 starts the status is committed; later failures are logged.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::Router;
use futures_util::stream::{Stream, StreamExt, TryStreamExt};

use crate::capability::{ProcedureError, Validate};
use crate::endpoint::{Endpoint, QUERY_KEY};
use crate::error::WireError;
use crate::payload::{ByteStream, Payload, Source};

/// The part of a dispatcher srpc needs: bind a method and path to a handler.
pub trait Mux: Sized {
    fn handle<H, Fut>(self, method: &Method, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static;
}

impl<S> Mux for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// # Panics
    ///
    /// Panics for methods axum cannot route (extension methods) and, like
    /// [`Router::route`], when the same method and path are bound twice.
    fn handle<H, Fut>(self, method: &Method, path: &str, handler: H) -> Self
    where
        H: Fn(Request) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => panic!("method {} cannot be routed for {}", method, path),
        };
        self.route(path, on(filter, move |request: Request| handler(request)))
    }
}

/// What a procedure gets to see of the inbound exchange.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of header `name`, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of the cookie `name` from the `Cookie` headers.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }
}

/// Application logic behind an endpoint.
///
/// Implemented for every `Fn(RequestContext, Req) -> impl Future<Output =
/// Result<Resp, E>>` where `E` is a [`ProcedureError`].
pub trait Procedure<Req, Resp>: Clone + Send + Sync + 'static {
    type Error: ProcedureError;
    type Future: Future<Output = Result<Resp, Self::Error>> + Send + 'static;

    fn call(&self, ctx: RequestContext, req: Req) -> Self::Future;
}

impl<F, Fut, Req, Resp, E> Procedure<Req, Resp> for F
where
    F: Fn(RequestContext, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, E>> + Send + 'static,
    E: ProcedureError,
{
    type Error = E;
    type Future = Fut;

    fn call(&self, ctx: RequestContext, req: Req) -> Self::Future {
        self(ctx, req)
    }
}

impl<Req, Resp> Endpoint<Req, Resp>
where
    Req: Validate + Send + 'static,
    Resp: Send + 'static,
{
    /// Bind this endpoint on `mux`, implemented by `procedure`.
    pub fn register<M, P>(&self, mux: M, procedure: P) -> M
    where
        M: Mux,
        P: Procedure<Req, Resp>,
    {
        tracing::debug!(pattern = %self.pattern(), "registering endpoint");
        let endpoint = self.clone();
        mux.handle(self.method(), self.path(), move |request: Request| {
            let endpoint = endpoint.clone();
            let procedure = procedure.clone();
            async move { endpoint.serve(&procedure, request).await }
        })
    }

    async fn serve<P>(&self, procedure: &P, request: Request) -> Response
    where
        P: Procedure<Req, Resp>,
    {
        let (parts, body) = request.into_parts();

        // Parse request

        let mut upstream = if self.is_state_changing() {
            Payload::from_stream(body.into_data_stream().map_err(io::Error::other))
        } else {
            Payload::from_bytes(query_value(parts.uri.query()))
        };
        let req = match self.request_codec().decode(&mut upstream).await {
            Ok(req) => req,
            Err(err) => {
                tracing::info!(
                    pattern = %self.pattern(),
                    error = %err,
                    "Bad request: decoding failed"
                );
                return WireError::bad_request("Unable to decode request.").into_response();
            }
        };
        drop(upstream);

        if let Err(reason) = req.validate() {
            tracing::info!(
                pattern = %self.pattern(),
                error = %reason,
                "Invalid request: validation failed"
            );
            return WireError::bad_request("Invalid request.").into_response();
        }

        // Create response

        let ctx = RequestContext::new(parts.method, parts.uri, parts.headers);
        let resp = match procedure.call(ctx, req).await {
            Ok(resp) => resp,
            Err(err) => {
                let wire = err
                    .wire_error()
                    .unwrap_or_else(|| WireError::from_status(StatusCode::BAD_REQUEST));
                tracing::info!(
                    pattern = %self.pattern(),
                    status = wire.code.as_u16(),
                    error = %err,
                    "Handler error"
                );
                return wire.into_response();
            }
        };
        let downstream = match self.response_codec().encode(resp) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    pattern = %self.pattern(),
                    error = %err,
                    "Encoder error"
                );
                return WireError::internal("Failed to encode response.").into_response();
            }
        };
        let content_type = match HeaderValue::from_str(self.response_codec().content_type()) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(
                    pattern = %self.pattern(),
                    error = %err,
                    "Encoder error: invalid content type"
                );
                return WireError::internal("Failed to encode response.").into_response();
            }
        };

        // Send response

        let mut response = Response::new(response_body(downstream, self.pattern()));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
        response
    }
}

/// Value of the `srpc` query parameter, percent-decoded. Missing means empty.
pub(crate) fn query_value(query: Option<&str>) -> Vec<u8> {
    let Some(query) = query else {
        return Vec::new();
    };
    query
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(key, _)| decode_component(key) == QUERY_KEY.as_bytes())
        .map(|(_, value)| decode_component(value))
        .unwrap_or_default()
}

fn decode_component(raw: &str) -> Vec<u8> {
    // Form encoding writes spaces as '+'; a literal '+' always arrives as %2B.
    let raw = raw.replace('+', " ");
    urlencoding::decode_binary(raw.as_bytes()).into_owned()
}

fn response_body(mut payload: Payload, pattern: String) -> Body {
    if payload.has_closer() {
        return Body::from_stream(Streaming {
            inner: payload.into_stream(),
            pattern,
        });
    }
    match payload.take_source() {
        Source::Empty => Body::empty(),
        Source::Full(bytes) => Body::from(bytes),
        source => Body::from_stream(Streaming {
            inner: source.into_stream(),
            pattern,
        }),
    }
}

/// Response stream. The payload's close hook runs through
/// [`Payload::into_stream`] once the body has been sent or abandoned; the
/// status is committed by then, so failures are only logged.
struct Streaming {
    inner: ByteStream,
    pattern: String,
}

impl Stream for Streaming {
    type Item = io::Result<bytes::Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = this.inner.poll_next_unpin(cx);
        if let Poll::Ready(Some(Err(err))) = &item {
            tracing::info!(
                pattern = %this.pattern,
                error = %err,
                "Response stream failed"
            );
        }
        item
    }
}
