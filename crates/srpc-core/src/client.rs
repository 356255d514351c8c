//! Client binding: turns an [`Endpoint`] plus a [`Transport`] into a typed
//! callable.
//!
//! One call is one exchange. There are no retries; a transport failure is
//! returned as is. Dropping the call future cancels the exchange.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::TryStreamExt;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;

use crate::endpoint::{Endpoint, QUERY_KEY};
use crate::error::{ClientError, TransportError, WireError};
use crate::payload::{Payload, Source};

/// Where and how to reach remote endpoints.
///
/// Cheap to clone; every clone shares the same `reqwest::Client` and
/// connection pool.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

struct TransportInner {
    origin: String,
    client: reqwest::Client,
    cookies: Option<HeaderValue>,
}

impl Transport {
    /// Transport with a default client and no cookies.
    ///
    /// `origin` must be an `http` or `https` URL without path or query,
    /// e.g. `http://127.0.0.1:3210`.
    pub fn new(origin: impl Into<String>) -> Result<Self, TransportError> {
        Self::builder(origin).build()
    }

    pub fn builder(origin: impl Into<String>) -> TransportBuilder {
        TransportBuilder {
            origin: origin.into(),
            client: None,
            cookies: Vec::new(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("origin", &self.inner.origin)
            .field("cookies", &self.inner.cookies.is_some())
            .finish()
    }
}

/// Builder for [`Transport`].
#[derive(Debug)]
pub struct TransportBuilder {
    origin: String,
    client: Option<reqwest::Client>,
    cookies: Vec<(String, String)>,
}

impl TransportBuilder {
    /// Use a pre-configured client (timeouts, TLS, proxies, pooling).
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Cookie attached to every call made through the transport.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<Transport, TransportError> {
        let origin = validate_origin(&self.origin)?;
        let cookies = cookie_header(&self.cookies)?;
        Ok(Transport {
            inner: Arc::new(TransportInner {
                origin,
                client: self.client.unwrap_or_default(),
                cookies,
            }),
        })
    }
}

/// Check `origin` and return it without an empty trailing `?` or `#`.
fn validate_origin(origin: &str) -> Result<String, TransportError> {
    let url =
        reqwest::Url::parse(origin).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TransportError::Scheme(origin.to_string()));
    }
    // The parser normalises a missing path to "/", so look at what was
    // actually written after the authority.
    let rest = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    if rest[authority_end..].starts_with('/') {
        return Err(TransportError::Path(url.path().to_string()));
    }
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        return Err(TransportError::Query(query.to_string()));
    }
    if url.fragment().is_some_and(|f| !f.is_empty()) {
        return Err(TransportError::InvalidUrl(format!(
            "fragment must be empty: {:?}",
            origin
        )));
    }
    Ok(origin.trim_end_matches(['?', '#']).to_string())
}

fn cookie_header(cookies: &[(String, String)]) -> Result<Option<HeaderValue>, TransportError> {
    if cookies.is_empty() {
        return Ok(None);
    }
    let mut pairs = Vec::with_capacity(cookies.len());
    for (name, value) in cookies {
        let invalid = |reason: &str| TransportError::Cookie {
            name: name.clone(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "=;,\"".contains(c))
        {
            return Err(invalid("name contains a separator"));
        }
        if value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || ";,\"\\".contains(c))
        {
            return Err(invalid("value contains a separator"));
        }
        let pair = format!("{}={}", name, value);
        HeaderValue::from_str(&pair).map_err(|e| invalid(&e.to_string()))?;
        pairs.push(pair);
    }
    HeaderValue::from_str(&pairs.join("; "))
        .map(Some)
        .map_err(|e| TransportError::Cookie {
            name: cookies
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            reason: e.to_string(),
        })
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Whole-call deadline, on top of whatever the client enforces.
    pub timeout: Option<Duration>,
    /// Extra headers. `Content-Type` is always taken from the codec.
    pub headers: HeaderMap,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Client side of an endpoint, bound to a transport.
pub struct Remote<Req, Resp> {
    endpoint: Endpoint<Req, Resp>,
    transport: Transport,
    url: String,
}

impl<Req, Resp> Endpoint<Req, Resp> {
    /// Callable for this endpoint on the server behind `transport`.
    pub fn remote(&self, transport: &Transport) -> Remote<Req, Resp> {
        Remote {
            endpoint: self.clone(),
            transport: transport.clone(),
            url: format!("{}{}", transport.origin(), self.path()),
        }
    }

    /// Like [`Endpoint::remote`], with a default transport for `origin`.
    pub fn remote_with_origin(
        &self,
        origin: impl Into<String>,
    ) -> Result<Remote<Req, Resp>, TransportError> {
        Ok(self.remote(&Transport::new(origin)?))
    }
}

impl<Req: 'static, Resp: 'static> Remote<Req, Resp> {
    pub fn endpoint(&self) -> &Endpoint<Req, Resp> {
        &self.endpoint
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Target URL, without the query parameter.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, req: Req) -> Result<Resp, ClientError> {
        self.call_with(&CallContext::default(), req).await
    }

    pub async fn call_with(&self, ctx: &CallContext, req: Req) -> Result<Resp, ClientError> {
        let request_codec = self.endpoint.request_codec();

        // Create request

        let mut upstream = request_codec.encode(req).map_err(ClientError::Encode)?;
        let result = self.exchange(ctx, &mut upstream).await;

        // Cleanups

        if request_codec.keep_open() {
            // The producer owns the stream's lifetime.
            drop(upstream.take_closer());
            return result;
        }
        match upstream.close() {
            Ok(()) => result,
            Err(source) => {
                let closing = ClientError::Close {
                    what: "request",
                    source,
                };
                match result {
                    Ok(_) => Err(closing),
                    Err(err) => Err(err.join(closing)),
                }
            }
        }
    }

    /// Caller headers, with `Content-Type` from the codec and the transport
    /// cookies merged into a single `Cookie` header.
    fn request_headers(&self, ctx: &CallContext) -> Result<HeaderMap, ClientError> {
        let mut headers = ctx.headers.clone();
        let content_type = HeaderValue::from_str(self.endpoint.request_codec().content_type())
            .map_err(|e| ClientError::Build(format!("invalid content type: {}", e)))?;
        headers.insert(header::CONTENT_TYPE, content_type);

        if let Some(ambient) = &self.transport.inner.cookies {
            let mut pairs: Vec<&str> = headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            let ambient = ambient
                .to_str()
                .map_err(|e| ClientError::Build(format!("invalid cookie header: {}", e)))?;
            pairs.push(ambient);
            let merged = HeaderValue::from_str(&pairs.join("; "))
                .map_err(|e| ClientError::Build(format!("invalid cookie header: {}", e)))?;
            headers.insert(header::COOKIE, merged);
        }
        Ok(headers)
    }

    async fn exchange(&self, ctx: &CallContext, upstream: &mut Payload) -> Result<Resp, ClientError> {
        let endpoint = &self.endpoint;
        let client = self.transport.client();

        let mut builder = if endpoint.is_state_changing() {
            client
                .request(endpoint.method().clone(), &self.url)
                .body(request_body(upstream.take_source()))
        } else {
            let raw = upstream
                .read_to_end()
                .await
                .map_err(|e| ClientError::Build(e.to_string()))?;
            let url = format!(
                "{}?{}={}",
                self.url,
                QUERY_KEY,
                urlencoding::encode_binary(&raw)
            );
            client.request(endpoint.method().clone(), url)
        };
        builder = builder.headers(self.request_headers(ctx)?);
        if let Some(timeout) = ctx.timeout {
            builder = builder.timeout(timeout);
        }

        // Roundtrip

        tracing::debug!(pattern = %endpoint.pattern(), url = %self.url, "calling remote endpoint");
        let response = builder.send().await.map_err(ClientError::Request)?;

        // Decoding

        let status = response.status();
        if status != StatusCode::OK {
            return Err(read_wire_error(response).await);
        }
        let response_codec = endpoint.response_codec();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type != response_codec.content_type() {
            return Err(ClientError::ContentType {
                want: response_codec.content_type().to_string(),
                got: content_type.to_string(),
            });
        }

        let mut downstream =
            Payload::from_stream(response.bytes_stream().map_err(io::Error::other));
        let decoded = response_codec
            .decode(&mut downstream)
            .await
            .map_err(ClientError::Decode);
        if response_codec.keep_open() {
            return decoded;
        }
        match (decoded, downstream.close()) {
            (decoded, Ok(())) => decoded,
            (Ok(_), Err(source)) => Err(ClientError::Close {
                what: "response",
                source,
            }),
            (Err(err), Err(source)) => Err(err.join(ClientError::Close {
                what: "response",
                source,
            })),
        }
    }
}

impl<Req, Resp> Clone for Remote<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            transport: self.transport.clone(),
            url: self.url.clone(),
        }
    }
}

impl<Req: 'static, Resp: 'static> fmt::Debug for Remote<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote")
            .field("endpoint", &self.endpoint)
            .field("url", &self.url)
            .finish()
    }
}

fn request_body(source: Source) -> reqwest::Body {
    match source {
        Source::Empty => reqwest::Body::from(bytes::Bytes::new()),
        Source::Full(bytes) => reqwest::Body::from(bytes),
        Source::Stream(stream) => reqwest::Body::wrap_stream(stream),
    }
}

/// Non-OK responses carry a plain-text message.
async fn read_wire_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    match response.bytes().await {
        Ok(body) => ClientError::Wire(WireError::new(status, String::from_utf8_lossy(&body))),
        Err(err) => ClientError::ReadBody(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_validation() {
        assert!(Transport::new("http://127.0.0.1:3210").is_ok());
        assert!(Transport::new("https://example.com").is_ok());
        assert!(Transport::new("HTTPS://example.com").is_ok());

        assert!(matches!(
            Transport::new("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            Transport::new("ftp://example.com"),
            Err(TransportError::Scheme(_))
        ));
        assert!(matches!(
            Transport::new("http://example.com/"),
            Err(TransportError::Path(_))
        ));
        assert!(matches!(
            Transport::new("http://example.com/api"),
            Err(TransportError::Path(_))
        ));
        assert!(matches!(
            Transport::new("http://example.com?x=1"),
            Err(TransportError::Query(_))
        ));
    }

    #[test]
    fn test_cookie_header() {
        let transport = Transport::builder("http://localhost:1")
            .cookie("session", "abc")
            .cookie("theme", "dark")
            .build()
            .unwrap();
        let cookies = transport.inner.cookies.as_ref().unwrap();
        assert_eq!(cookies.to_str().unwrap(), "session=abc; theme=dark");

        let err = Transport::builder("http://localhost:1")
            .cookie("bad name", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, TransportError::Cookie { .. }));
    }

    #[test]
    fn test_empty_query_or_fragment_is_accepted() {
        let transport = Transport::new("http://example.com?").unwrap();
        assert_eq!(transport.origin(), "http://example.com");
        let transport = Transport::new("http://example.com#").unwrap();
        assert_eq!(transport.origin(), "http://example.com");
        assert!(matches!(
            Transport::new("http://example.com#top"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_cookie_error_names_the_failing_cookie() {
        let err = Transport::builder("http://localhost:1")
            .cookie("session", "abc")
            .cookie("theme", "caf\u{e9}")
            .build()
            .unwrap_err();
        match err {
            TransportError::Cookie { name, .. } => assert_eq!(name, "theme"),
            other => panic!("expected cookie error, got {other:?}"),
        }
    }

    #[test]
    fn test_codec_content_type_wins_over_caller_header() {
        let ep = Endpoint::<String, String>::json(http::Method::POST, "/v1/echo");
        let transport = Transport::builder("http://localhost:1")
            .cookie("session", "abc")
            .build()
            .unwrap();
        let remote = ep.remote(&transport);
        let ctx = CallContext::new()
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_header(header::COOKIE, HeaderValue::from_static("trace=1"));

        let headers = remote.request_headers(&ctx).unwrap();
        let types: Vec<_> = headers
            .get_all(header::CONTENT_TYPE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(types, vec!["application/json"]);
        let cookies: Vec<_> = headers
            .get_all(header::COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies, vec!["trace=1; session=abc"]);
    }

    #[test]
    fn test_remote_url_joins_origin_and_path() {
        let ep = Endpoint::<String, String>::json(http::Method::POST, "/v1/echo");
        let remote = ep.remote_with_origin("http://localhost:8080").unwrap();
        assert_eq!(remote.url(), "http://localhost:8080/v1/echo");
    }
}
