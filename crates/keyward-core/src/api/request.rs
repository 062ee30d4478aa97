//! Request configuration and argument validation.
//!
//! A request is configured by one of four shapes: nothing, a single
//! callback, a URL-encoded form string, or a JSON payload with optional
//! handlers. [`RequestConfig::from_value`] parses the same shapes out of a
//! dynamic JSON value and rejects everything else.

use std::fmt;

use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::response::Outcome;
use crate::error::{Error, Result};

/// Completion handler, called with the parsed body and the HTTP status.
pub type Handler = Box<dyn FnOnce(&Value, u16) + Send + 'static>;

/// Methods that are normalized to upper case, matching browser behaviour
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

/// Methods a client is never allowed to send
const FORBIDDEN_METHODS: [&str; 3] = ["CONNECT", "TRACE", "TRACK"];

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub enum RequestConfig {
    /// No body, default handlers
    Absent,
    /// One handler for both success and failure
    Callback(Handler),
    /// URL-encoded form body
    Form(String),
    /// JSON body with optional handlers
    Json(JsonConfig),
}

impl RequestConfig {
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(&Value, u16) + Send + 'static,
    {
        RequestConfig::Callback(Box::new(f))
    }

    pub fn form(body: impl Into<String>) -> Self {
        RequestConfig::Form(body.into())
    }

    /// JSON body with default handlers
    pub fn json<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        Ok(RequestConfig::Json(JsonConfig::new().data(data)?))
    }

    /// Parse a dynamically shaped config: `null` is absent, a string is a
    /// form body, an object is a JSON config whose `data` member becomes the
    /// body. Anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(RequestConfig::Absent),
            Value::String(body) => Ok(RequestConfig::Form(body)),
            Value::Object(mut map) => Ok(RequestConfig::Json(JsonConfig {
                data: map.remove("data"),
                ..JsonConfig::new()
            })),
            other => Err(Error::invalid(format!(
                "unsupported request config: expected null, string or object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub(crate) fn into_parts(self) -> (Body, Handlers) {
        match self {
            RequestConfig::Absent => (Body::Empty, Handlers::default()),
            RequestConfig::Callback(f) => (Body::Empty, Handlers::Dual(f)),
            RequestConfig::Form(body) => (Body::Form(body), Handlers::default()),
            RequestConfig::Json(config) => (
                Body::Json(config.data),
                Handlers::Split {
                    on_success: config.on_success,
                    on_failure: config.on_failure,
                },
            ),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig::Absent
    }
}

impl From<JsonConfig> for RequestConfig {
    fn from(config: JsonConfig) -> Self {
        RequestConfig::Json(config)
    }
}

impl From<String> for RequestConfig {
    fn from(body: String) -> Self {
        RequestConfig::Form(body)
    }
}

impl From<&str> for RequestConfig {
    fn from(body: &str) -> Self {
        RequestConfig::Form(body.to_string())
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestConfig::Absent => f.write_str("Absent"),
            RequestConfig::Callback(_) => f.write_str("Callback(..)"),
            RequestConfig::Form(body) => f.debug_tuple("Form").field(body).finish(),
            RequestConfig::Json(config) => f.debug_tuple("Json").field(config).finish(),
        }
    }
}

/// JSON payload plus optional success/failure handlers.
#[derive(Default)]
pub struct JsonConfig {
    pub(crate) data: Option<Value>,
    pub(crate) on_success: Option<Handler>,
    pub(crate) on_failure: Option<Handler>,
}

impl JsonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request body; fails if `data` can't be represented as JSON
    pub fn data<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self> {
        let value = serde_json::to_value(data)
            .map_err(|e| Error::invalid(format!("request data is not JSON-serializable: {}", e)))?;
        self.data = Some(value);
        Ok(self)
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Value, u16) + Send + 'static,
    {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Value, u16) + Send + 'static,
    {
        self.on_failure = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for JsonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonConfig")
            .field("data", &self.data)
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// Request body after the config has been taken apart.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Body {
    Empty,
    Form(String),
    /// JSON content type; `None` sends the header without a body
    Json(Option<Value>),
}

/// Where completion is routed.
pub(crate) enum Handlers {
    Split {
        on_success: Option<Handler>,
        on_failure: Option<Handler>,
    },
    Dual(Handler),
}

impl Default for Handlers {
    fn default() -> Self {
        Handlers::Split {
            on_success: None,
            on_failure: None,
        }
    }
}

impl Handlers {
    pub(crate) fn new(on_success: Option<Handler>, on_failure: Option<Handler>) -> Self {
        Handlers::Split {
            on_success,
            on_failure,
        }
    }

    /// Invoke the handler matching `outcome`, or log when there is none
    pub(crate) fn dispatch(self, outcome: &Outcome) {
        let reply = outcome.reply();
        let handler = match self {
            Handlers::Dual(f) => Some(f),
            Handlers::Split { on_success, .. } if outcome.is_success() => on_success,
            Handlers::Split { on_failure, .. } => on_failure,
        };
        match handler {
            Some(f) => f(&reply.body, reply.status),
            None if outcome.is_success() => {
                debug!(status = reply.status, "Request succeeded (no handler)")
            }
            None => debug!(status = reply.status, "Request failed (no handler)"),
        }
    }
}

/// Validate and normalize an HTTP method name
pub fn parse_method(method: &str) -> Result<Method> {
    if method.is_empty() {
        return Err(Error::invalid("method must be a non-empty string"));
    }
    let upper = method.to_ascii_uppercase();
    if FORBIDDEN_METHODS.contains(&upper.as_str()) {
        return Err(Error::invalid(format!("method {} is not allowed", method)));
    }
    let name = if NORMALIZED_METHODS.contains(&upper.as_str()) {
        upper.as_str()
    } else {
        method
    };
    Method::from_bytes(name.as_bytes())
        .map_err(|_| Error::invalid(format!("invalid method: {:?}", method)))
}

/// Validate that `url` is an absolute http(s) URL
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid(format!("invalid URL {:?}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::invalid(format!(
            "unsupported URL scheme {:?} in {:?}",
            scheme, url
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
