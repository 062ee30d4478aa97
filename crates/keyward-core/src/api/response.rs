use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

/// Status reported when the request never produced a response
pub const STATUS_NONE: u16 = 0;

/// Statuses a general request treats as success
pub const SUCCESS_STATUSES: [u16; 5] = [200, 201, 202, 203, 204];

/// Status a login treats as success
pub const LOGIN_SUCCESS_STATUS: u16 = 200;

pub fn is_dispatch_success(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

pub fn is_login_success(status: u16) -> bool {
    status == LOGIN_SUCCESS_STATUS
}

/// Status and parsed JSON body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

/// A completed request, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Reply),
    Failure(Reply),
}

impl Outcome {
    pub fn classify(reply: Reply, is_success: fn(u16) -> bool) -> Self {
        if is_success(reply.status) {
            Outcome::Success(reply)
        } else {
            Outcome::Failure(reply)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn reply(&self) -> &Reply {
        match self {
            Outcome::Success(reply) | Outcome::Failure(reply) => reply,
        }
    }

    pub fn status(&self) -> u16 {
        self.reply().status
    }

    pub fn into_reply(self) -> Reply {
        match self {
            Outcome::Success(reply) | Outcome::Failure(reply) => reply,
        }
    }
}

/// Parse a response body as JSON. An empty body parses as `null`.
pub(crate) fn parse_body(status: u16, bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|source| Error::Parse { status, source })
}

/// Turn a transport result into a reply.
///
/// Transport failures, including failing to read the body, become status
/// [`STATUS_NONE`] with a `null` body. Only a body that arrived but is not
/// JSON is an error.
pub(crate) async fn read_reply(result: reqwest::Result<reqwest::Response>) -> Result<Reply> {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Request failed before a response arrived");
            return Ok(Reply::new(STATUS_NONE, Value::Null));
        }
    };

    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(bytes) => Ok(Reply::new(status, parse_body(status, &bytes)?)),
        Err(e) => {
            warn!(error = %e, status, "Failed to read response body");
            Ok(Reply::new(STATUS_NONE, Value::Null))
        }
    }
}
