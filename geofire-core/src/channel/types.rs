//! Method-channel call and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GeofireError;

/// Name of the method channel the plugin registers.
pub const CHANNEL_NAME: &str = "flutter_custom_geofire";

/// One call from the Flutter side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Command name, e.g. `queryLocations`.
    pub method: String,
    /// Argument map (or `null` for commands without arguments).
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Creates a call.
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Parses a call from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or has no `method`.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The single response to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    /// The command succeeded.
    Success {
        /// Command result.
        result: Value,
    },
    /// The command failed.
    Error {
        /// Error code such as `INVALID_ARGUMENTS`.
        code: String,
        /// Human-readable message.
        message: String,
        /// Extra details (unused, always `null` today).
        details: Option<Value>,
    },
    /// The method name is not recognised.
    NotImplemented,
}

impl MethodResponse {
    /// Creates a success response.
    #[must_use]
    pub const fn success(result: Value) -> Self {
        Self::Success { result }
    }

    /// Returns the success value, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result } => Some(result),
            _ => None,
        }
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Converts this response to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<GeofireError> for MethodResponse {
    fn from(error: GeofireError) -> Self {
        Self::Error {
            code: error.error_code().to_string(),
            message: error.message(),
            details: None,
        }
    }
}

impl From<crate::error::Result<Value>> for MethodResponse {
    fn from(result: crate::error::Result<Value>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn call_from_json_defaults_arguments() {
        let call = MethodCall::from_json(r#"{"method": "stopListener"}"#).unwrap();
        assert_eq!(call.method, "stopListener");
        assert_eq!(call.arguments, Value::Null);
    }

    #[test]
    fn error_response_from_geofire_error() {
        let response: MethodResponse = GeofireError::StoreWrite("denied".to_string()).into();
        assert_eq!(response.error_code(), Some("ERROR"));
        assert_eq!(
            response,
            MethodResponse::Error {
                code: "ERROR".to_string(),
                message: "denied".to_string(),
                details: None,
            }
        );
    }

    #[test]
    fn response_json_shape() {
        let json = MethodResponse::success(json!(true)).to_json().unwrap();
        assert_eq!(json, r#"{"status":"success","result":true}"#);

        let json = MethodResponse::NotImplemented.to_json().unwrap();
        assert_eq!(json, r#"{"status":"not_implemented"}"#);
    }

    #[test]
    fn result_accessor() {
        assert_eq!(
            MethodResponse::success(json!(null)).result(),
            Some(&Value::Null)
        );
        assert!(MethodResponse::NotImplemented.result().is_none());
    }
}
