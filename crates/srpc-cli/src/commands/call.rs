//! `srpc call`: Invoke one JSON endpoint on a remote server.
//!
//! The endpoint is declared on the fly from `--method` and `--path`, so any
//! JSON srpc endpoint can be reached without its Rust types.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use srpc_core::{
    CallContext, Codec, CodecError, Endpoint, JsonCodec, Method, Payload, Transport,
    JSON_CONTENT_TYPE,
};

/// Everything `srpc call` needs for one exchange.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub origin: String,
    pub method: String,
    pub path: String,
    /// Request as JSON text.
    pub body: String,
    /// `name=value` pairs.
    pub cookies: Vec<String>,
    pub timeout_secs: Option<u64>,
}

/// JSON codec that reads an empty body as `null`, so endpoints answering
/// with no payload can be called too.
struct AnyJson;

#[async_trait]
impl Codec<Value> for AnyJson {
    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn encode(&self, value: Value) -> Result<Payload, CodecError> {
        JsonCodec::<Value>::new().encode(value)
    }

    async fn decode(&self, body: &mut Payload) -> Result<Value, CodecError> {
        let buf = body.read_to_end().await?;
        if buf.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&buf)?)
    }
}

/// Perform the call and return the decoded response.
pub async fn call(options: &CallOptions) -> Result<Value, String> {
    let method = Method::from_bytes(options.method.to_uppercase().as_bytes())
        .map_err(|e| format!("Invalid method {:?}: {}", options.method, e))?;
    let body: Value = serde_json::from_str(&options.body)
        .map_err(|e| format!("Invalid JSON body: {}", e))?;

    let endpoint =
        Endpoint::<Value, Value>::try_new(method, options.path.clone(), AnyJson, AnyJson)
            .map_err(|e| e.to_string())?;

    let mut builder = Transport::builder(options.origin.clone());
    for cookie in &options.cookies {
        let (name, value) = cookie
            .split_once('=')
            .ok_or_else(|| format!("Invalid cookie {:?}: expected name=value", cookie))?;
        builder = builder.cookie(name, value);
    }
    let transport = builder.build().map_err(|e| e.to_string())?;

    let mut ctx = CallContext::new();
    if let Some(secs) = options.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    tracing::debug!(pattern = %endpoint.pattern(), origin = %options.origin, "calling");
    endpoint
        .remote(&transport)
        .call_with(&ctx, body)
        .await
        .map_err(|e| e.to_string())
}

pub async fn run(options: CallOptions) -> Result<(), String> {
    let value = call(&options).await?;
    super::print_json(&value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CallOptions {
        CallOptions {
            origin: "http://127.0.0.1:1".to_string(),
            method: "post".to_string(),
            path: "/greet".to_string(),
            body: "{}".to_string(),
            cookies: Vec::new(),
            timeout_secs: None,
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_body() {
        let err = call(&CallOptions {
            body: "{not json".to_string(),
            ..options()
        })
        .await
        .unwrap_err();
        assert!(err.starts_with("Invalid JSON body"), "got {err}");
    }

    #[tokio::test]
    async fn test_rejects_relative_path() {
        let err = call(&CallOptions {
            path: "greet".to_string(),
            ..options()
        })
        .await
        .unwrap_err();
        assert!(err.contains("must start with '/'"), "got {err}");
    }

    #[tokio::test]
    async fn test_rejects_malformed_cookie() {
        let err = call(&CallOptions {
            cookies: vec!["session".to_string()],
            ..options()
        })
        .await
        .unwrap_err();
        assert!(err.starts_with("Invalid cookie"), "got {err}");
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_null() {
        let mut payload = Payload::empty();
        assert_eq!(AnyJson.decode(&mut payload).await.unwrap(), Value::Null);
        let mut payload = Payload::from_bytes("[1,2]");
        assert_eq!(
            AnyJson.decode(&mut payload).await.unwrap(),
            serde_json::json!([1, 2])
        );
    }
}
