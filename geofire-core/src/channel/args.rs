//! Argument extraction for method-channel calls.
//!
//! Arguments arrive as a JSON map. Strings must be present and non-empty;
//! numbers may be sent as integers or floats.

use serde_json::{Map, Value};

use crate::error::{GeofireError, Result};

/// Borrowed view of a call's argument map.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Arguments<'a> {
    /// Wraps a call's raw arguments. Anything but a map reads as empty.
    #[must_use]
    pub fn new(arguments: &'a Value) -> Self {
        Self {
            map: arguments.as_object(),
        }
    }

    /// Returns a non-empty string argument.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&'a str> {
        self.map?
            .get(name)?
            .as_str()
            .filter(|value| !value.is_empty())
    }

    /// Returns a numeric argument as `f64`.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.map?.get(name)?.as_f64()
    }

    /// Returns a non-empty string argument or `InvalidArguments(message)`.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`] if the argument is missing.
    pub fn require_string(&self, name: &str, message: &str) -> Result<&'a str> {
        self.string(name)
            .ok_or_else(|| GeofireError::InvalidArguments(message.to_string()))
    }

    /// Returns a numeric argument or `InvalidArguments(message)`.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`] if the argument is missing.
    pub fn require_number(&self, name: &str, message: &str) -> Result<f64> {
        self.number(name)
            .ok_or_else(|| GeofireError::InvalidArguments(message.to_string()))
    }
}
