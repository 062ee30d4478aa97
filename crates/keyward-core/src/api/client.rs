//! Authenticated request dispatch.
//!
//! `send` does all validation and reads the session synchronously, so the
//! `Authorization` header reflects the session at call time. The returned
//! [`Dispatch`] performs the I/O when awaited.

use std::future::IntoFuture;

use base64::{engine::general_purpose, Engine as _};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client, Method, Url};
use tracing::debug;

use super::request::{
    parse_method, parse_url, Body, Handlers, RequestConfig, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE,
};
use super::response::{is_dispatch_success, read_reply, Outcome};
use crate::auth::{CredentialStore, Identity};
use crate::error::Result;

/// Placeholder encoded for each missing field when logged out
const NULL_IDENTITY: &str = "null";

/// `Basic base64(username:credential)`
pub fn basic_authorization(username: &str, credential: &str) -> String {
    let token = general_purpose::STANDARD.encode(format!("{}:{}", username, credential));
    format!("Basic {}", token)
}

/// Sends requests on behalf of the current session.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Dispatcher {
    http: Client,
    store: CredentialStore,
    null_identity_header: bool,
}

impl Dispatcher {
    pub fn new(http: Client, store: CredentialStore, null_identity_header: bool) -> Self {
        Self {
            http,
            store,
            null_identity_header,
        }
    }

    /// Header value for `identity`, or for the logged-out state
    pub fn authorization_for(&self, identity: Option<&Identity>) -> Option<String> {
        match identity {
            Some(identity) => Some(basic_authorization(&identity.username, &identity.secret)),
            None if self.null_identity_header => {
                Some(basic_authorization(NULL_IDENTITY, NULL_IDENTITY))
            }
            None => None,
        }
    }

    /// Validate the arguments and prepare a request.
    ///
    /// Fails with a type-validation error, before any I/O, when `method` or
    /// `url` is invalid.
    pub fn send(&self, method: &str, url: &str, config: RequestConfig) -> Result<Dispatch> {
        let method = parse_method(method)?;
        let url = parse_url(url)?;
        let (body, handlers) = config.into_parts();

        let authorization = self.authorization_for(self.store.snapshot().as_ref());

        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(ref value) = authorization {
            request = request.header(header::AUTHORIZATION, value.as_str());
        }
        request = match body {
            Body::Empty => request,
            Body::Form(form) => request
                .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(form),
            Body::Json(data) => {
                let request = request.header(header::CONTENT_TYPE, JSON_CONTENT_TYPE);
                match data {
                    Some(data) => request.body(data.to_string()),
                    None => request,
                }
            }
        };

        Ok(Dispatch {
            method,
            url,
            authorization,
            request,
            handlers,
        })
    }
}

/// A validated request whose header has already been computed.
pub struct Dispatch {
    method: Method,
    url: Url,
    authorization: Option<String>,
    request: reqwest::RequestBuilder,
    handlers: Handlers,
}

impl Dispatch {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The `Authorization` header value captured when the request was prepared
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Send the request, route the outcome to the handlers, and return it.
    ///
    /// Only a non-JSON response body is an error; it skips the handlers.
    pub async fn run(self) -> Result<Outcome> {
        debug!(method = %self.method, url = %self.url, "Sending request");
        let reply = read_reply(self.request.send().await).await?;
        let outcome = Outcome::classify(reply, is_dispatch_success);
        debug!(
            method = %self.method,
            url = %self.url,
            status = outcome.status(),
            success = outcome.is_success(),
            "Request completed"
        );
        self.handlers.dispatch(&outcome);
        Ok(outcome)
    }
}

impl IntoFuture for Dispatch {
    type Output = Result<Outcome>;
    type IntoFuture = BoxFuture<'static, Result<Outcome>>;

    fn into_future(self) -> Self::IntoFuture {
        self.run().boxed()
    }
}

// ============================================================================
// Tests
// ============================================================================
