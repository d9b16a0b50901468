// Copyright 2025 Cowboy AI, LLC.

//! Error types for class composition and dispatch

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::value::Value;

/// Errors that can occur while composing classes or dispatching methods
#[derive(Debug, Clone, Error)]
pub enum MetalError {
    /// Malformed descriptor, property table or argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A super-call was made without an overridden method bound to it
    #[error("Super call misuse: {method} has no overridden method to call")]
    SuperCallMisuse {
        /// Display name of the method that attempted the call
        method: String,
    },

    /// Dispatch target not found on the receiver or its class chain
    #[error("Method not found: {name} on {receiver}")]
    MethodNotFound {
        /// Description of the receiver
        receiver: String,
        /// Name that was looked up
        name: String,
    },

    /// The resolved property is not callable
    #[error("Not callable: {name}")]
    NotCallable {
        /// Name of the property that was invoked
        name: String,
    },

    /// A typed error raised by a method body
    #[error("{0}")]
    Raised(ErrorInfo),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for composition operations
pub type MetalResult<T> = Result<T, MetalError>;

impl From<serde_json::Error> for MetalError {
    fn from(err: serde_json::Error) -> Self {
        MetalError::SerializationError(err.to_string())
    }
}

impl From<ErrorInfo> for MetalError {
    fn from(info: ErrorInfo) -> Self {
        MetalError::Raised(info)
    }
}

impl MetalError {
    /// Create an invalid argument error
    pub fn invalid(msg: impl Into<String>) -> Self {
        MetalError::InvalidArgument(msg.into())
    }

    /// Raise a typed error with the given message
    pub fn raise(message: impl Into<String>) -> Self {
        MetalError::Raised(ErrorInfo::new(message))
    }

    /// Check if this error comes from misusing the composition API
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            MetalError::InvalidArgument(_) | MetalError::SuperCallMisuse { .. }
        )
    }

    /// Check if this is a dispatch lookup failure
    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            MetalError::MethodNotFound { .. } | MetalError::NotCallable { .. }
        )
    }

    /// The raised error record, if any
    pub fn raised(&self) -> Option<&ErrorInfo> {
        match self {
            MetalError::Raised(info) => Some(info),
            _ => None,
        }
    }
}

/// Name given to errors that do not set one
pub const DEFAULT_ERROR_NAME: &str = "Error";

/// Property names accepted when building an [`ErrorInfo`] from options
pub const ERROR_PROPS: [&str; 7] = [
    "description",
    "file_name",
    "line_number",
    "name",
    "message",
    "number",
    "url",
];

/// A typed error record raised from method bodies
///
/// Carries the same properties as a host error object plus an optional
/// documentation url.
///
/// # Examples
///
/// ```rust
/// use metal_composition::ErrorInfo;
///
/// let err = ErrorInfo::new("Foo").with_name("Bar");
/// assert_eq!(err.to_string(), "Bar: Foo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error name, `"Error"` unless overridden
    pub name: String,
    /// Human readable message
    pub message: String,
    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source file the error refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Source line the error refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<String>,
    /// Error number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Documentation url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ErrorInfo {
    /// Create an error with a message and the default name
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_ERROR_NAME.to_string(),
            message: message.into(),
            description: None,
            file_name: None,
            line_number: None,
            number: None,
            url: None,
        }
    }

    /// Build an error from an options map
    ///
    /// Only the keys in [`ERROR_PROPS`] are read; anything else is ignored.
    /// Scalar values are stringified.
    pub fn from_options(options: &Value) -> MetalResult<Self> {
        let map = options
            .as_map()
            .ok_or_else(|| MetalError::invalid("error options must be a map"))?;

        let mut info = ErrorInfo::new("");
        for key in ERROR_PROPS {
            let Some(value) = map.get(key) else { continue };
            let text = match value {
                Value::Nil => continue,
                Value::Str(s) => s.clone(),
                Value::Int(i) => i.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(MetalError::invalid(format!(
                        "error option {key} must be a scalar, got {}",
                        other.type_name()
                    )))
                }
            };
            match key {
                "name" => info.name = text,
                "message" => info.message = text,
                "description" => info.description = Some(text),
                "file_name" => info.file_name = Some(text),
                "line_number" => info.line_number = Some(text),
                "number" => info.number = Some(text),
                "url" => info.url = Some(text),
                _ => {}
            }
        }
        Ok(info)
    }

    /// Build an error from a message and options; options win except for
    /// an empty message
    pub fn with_options(message: impl Into<String>, options: &Value) -> MetalResult<Self> {
        let message = message.into();
        let mut info = Self::from_options(options)?;
        if info.message.is_empty() {
            info.message = message;
        }
        Ok(info)
    }

    /// Override the error name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a documentation url
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Resolve a relative url (`#anchor` or `/path`) against `base`
    ///
    /// Only those two forms get the `base` prefix. Any other url, including an
    /// absolute `https://` link, is kept unchanged.
    pub fn resolve_url(mut self, base: &str) -> Self {
        if let Some(url) = self.url.take() {
            let resolved = if url.starts_with('#') || url.starts_with('/') {
                format!("{}{}", base.trim_end_matches('/'), url)
            } else {
                url
            };
            self.url = Some(resolved);
        }
        self
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)?;
        if let Some(url) = &self.url {
            write!(f, " See: {url}")?;
        }
        Ok(())
    }
}
