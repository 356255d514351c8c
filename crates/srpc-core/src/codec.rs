//! Typed encode/decode contracts for endpoint payloads.
//!
//! A codec is built once per payload type and shared by every call of the
//! endpoints that use it. `encode` is synchronous so it either produces a
//! complete [`Payload`] or fails before a single byte reaches the wire.
//! `decode` is async because it may have to pull a streamed body.

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;
use crate::payload::Payload;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Bidirectional codec for one payload type.
#[async_trait]
pub trait Codec<T>: Send + Sync + 'static {
    /// Label sent in the `Content-Type` header.
    fn content_type(&self) -> &str;

    /// Whether the decoded value takes over the body's lifetime.
    ///
    /// When false, the caller closes the body once `decode` returns. When
    /// true, `decode` is expected to [`Payload::take`] the body and the
    /// caller leaves it alone.
    fn keep_open(&self) -> bool {
        false
    }

    fn encode(&self, value: T) -> Result<Payload, CodecError>;

    async fn decode(&self, body: &mut Payload) -> Result<T, CodecError>;
}

/// Marker for "no payload".
///
/// Endpoints that take or return nothing use `Empty` on that side together
/// with [`EmptyCodec`], so the wire carries no bytes at all instead of a
/// serialized unit value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Empty;

/// Codec for [`Empty`]: encodes to nothing, decodes without reading.
#[derive(Debug, Clone)]
pub struct EmptyCodec {
    content_type: String,
}

impl EmptyCodec {
    /// An empty codec advertising the JSON content type, so it can sit next
    /// to a [`JsonCodec`] on the other side of an endpoint.
    pub fn new() -> Self {
        Self::with_content_type(JSON_CONTENT_TYPE)
    }

    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }
}

impl Default for EmptyCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Codec<Empty> for EmptyCodec {
    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn encode(&self, _value: Empty) -> Result<Payload, CodecError> {
        Ok(Payload::empty())
    }

    async fn decode(&self, _body: &mut Payload) -> Result<Empty, CodecError> {
        Ok(Empty)
    }
}

/// JSON codec backed by serde.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn encode(&self, value: T) -> Result<Payload, CodecError> {
        let buf = serde_json::to_vec(&value)?;
        Ok(Payload::from_bytes(buf))
    }

    async fn decode(&self, body: &mut Payload) -> Result<T, CodecError> {
        let buf = body.read_to_end().await?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

/// Pass-through codec for raw bytes.
#[derive(Debug, Clone, Default)]
pub struct BytesCodec;

#[async_trait]
impl Codec<Bytes> for BytesCodec {
    fn content_type(&self) -> &str {
        OCTET_STREAM_CONTENT_TYPE
    }

    fn encode(&self, value: Bytes) -> Result<Payload, CodecError> {
        Ok(Payload::from_bytes(value))
    }

    async fn decode(&self, body: &mut Payload) -> Result<Bytes, CodecError> {
        Ok(body.read_to_end().await?)
    }
}
