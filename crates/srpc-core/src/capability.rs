//! Optional capabilities of request and error types.
//!
//! Both traits default to "capability absent", so opting out is an empty
//! `impl`. The server binding only ever asks through these methods.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::fmt;

use crate::codec::Empty;
use crate::error::WireError;

/// Requests that can check themselves after decoding.
///
/// A request whose `validate` fails never reaches the procedure; the caller
/// gets a bad-request response instead.
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Errors returned by procedures.
///
/// `wire_error` lets an error pick the status and message sent back to the
/// caller. Errors that don't override it are answered with `400 Bad Request`.
/// The `Display` form is only ever logged server-side.
pub trait ProcedureError: fmt::Display + Send + 'static {
    fn wire_error(&self) -> Option<WireError> {
        None
    }
}

impl ProcedureError for WireError {
    fn wire_error(&self) -> Option<WireError> {
        Some(self.clone())
    }
}

impl ProcedureError for Infallible {}
impl ProcedureError for String {}
impl ProcedureError for &'static str {}
impl ProcedureError for std::io::Error {}
impl ProcedureError for Box<dyn std::error::Error + Send + Sync> {}

macro_rules! no_validation {
    ($($ty:ty),* $(,)?) => {
        $(impl Validate for $ty {})*
    };
}

no_validation!(
    Empty,
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    bytes::Bytes,
    serde_json::Value,
);

impl<T> Validate for Vec<T> {}
impl<T> Validate for Option<T> {}
impl<K, V, S> Validate for HashMap<K, V, S> {}
impl<K, V> Validate for BTreeMap<K, V> {}
impl Validate for Cow<'static, str> {}
impl<A, B> Validate for (A, B) {}
impl<A, B, C> Validate for (A, B, C) {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quota {
        limit: u32,
    }

    impl Validate for Quota {
        fn validate(&self) -> Result<(), String> {
            if self.limit == 0 {
                return Err("limit must be positive".to_string());
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Opaque;

    impl fmt::Display for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("opaque failure")
        }
    }

    impl ProcedureError for Opaque {}

    #[test]
    fn test_validate_defaults_to_ok() {
        assert!(Empty.validate().is_ok());
        assert!("text".to_string().validate().is_ok());
        assert!(Quota { limit: 3 }.validate().is_ok());
        assert_eq!(
            Quota { limit: 0 }.validate().unwrap_err(),
            "limit must be positive"
        );
    }

    #[test]
    fn test_wire_error_capability() {
        assert!(Opaque.wire_error().is_none());
        assert!("plain".wire_error().is_none());
        let wire = WireError::not_found("missing");
        assert_eq!(wire.wire_error(), Some(wire.clone()));
    }
}
