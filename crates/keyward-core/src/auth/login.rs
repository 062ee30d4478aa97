//! The login handshake.
//!
//! The password is hashed first, then sent as the Basic credential in a
//! single GET. Only an exact 200 commits the session; unlike general
//! requests, other 2xx statuses count as failure here.

use std::fmt;
use std::future::IntoFuture;

use futures::future::{BoxFuture, FutureExt};
use reqwest::{header, Client, Url};
use serde_json::Value;
use tracing::{info, warn};

use super::credentials::CredentialStore;
use super::hash::PasswordHasher;
use super::session::Identity;
use crate::api::client::basic_authorization;
use crate::api::request::{Handler, Handlers};
use crate::api::response::{is_login_success, read_reply, Outcome};
use crate::error::Result;

/// Login input: credentials, persistence choice and completion handlers.
pub struct LoginRequest {
    username: String,
    password: String,
    remember: bool,
    on_success: Option<Handler>,
    on_failure: Option<Handler>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember: false,
            on_success: None,
            on_failure: None,
        }
    }

    /// Persist into the durable scope instead of the ephemeral one
    pub fn remember(mut self, remember: bool) -> Self {
        self.remember = remember;
        self
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

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("remember", &self.remember)
            .finish_non_exhaustive()
    }
}

/// A validated login, run when awaited.
pub struct PendingLogin {
    pub(crate) http: Client,
    pub(crate) store: CredentialStore,
    pub(crate) hasher: PasswordHasher,
    pub(crate) url: Url,
    pub(crate) request: LoginRequest,
}

impl PendingLogin {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Hash, authenticate, and commit on success.
    ///
    /// Hashing errors and non-JSON bodies are returned as errors; every
    /// other failure goes to `on_failure` and comes back as
    /// [`Outcome::Failure`].
    pub async fn run(self) -> Result<Outcome> {
        let PendingLogin {
            http,
            store,
            hasher,
            url,
            request,
        } = self;
        let LoginRequest {
            username,
            password,
            remember,
            on_success,
            on_failure,
        } = request;

        info!(username = %username, url = %url, "Logging in");
        let hash = hasher.hash(password).await?;

        let response = http
            .get(url)
            .header(header::AUTHORIZATION, basic_authorization(&username, &hash))
            .send()
            .await;
        let reply = read_reply(response).await?;
        let outcome = Outcome::classify(reply, is_login_success);

        if outcome.is_success() {
            store.commit(Identity::new(username.as_str(), hash), remember)?;
            info!(username = %username, remember, "Login succeeded");
        } else {
            warn!(username = %username, status = outcome.status(), "Login rejected");
        }

        Handlers::new(on_success, on_failure).dispatch(&outcome);
        Ok(outcome)
    }
}

impl IntoFuture for PendingLogin {
    type Output = Result<Outcome>;
    type IntoFuture = BoxFuture<'static, Result<Outcome>>;

    fn into_future(self) -> Self::IntoFuture {
        self.run().boxed()
    }
}

// ============================================================================
// Tests
// ============================================================================
