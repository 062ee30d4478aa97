//! Authenticated HTTP request dispatch.
//!
//! Every request carries `Authorization: Basic base64(username:secret)`
//! built from the current session. Responses are parsed as JSON and
//! classified by status: exactly 200-204 is success, anything else
//! (including transport failure, reported as status 0) is failure.

pub mod client;
pub mod request;
pub mod response;

pub use client::{basic_authorization, Dispatch, Dispatcher};
pub use request::{Handler, JsonConfig, RequestConfig};
pub use response::{Outcome, Reply};
