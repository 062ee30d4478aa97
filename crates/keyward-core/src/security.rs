//! The service facade tying the credential store, login flow and request
//! dispatcher together.
//!
//! Construct one `Security` per application (or per test) and share it by
//! cloning; clones see the same session.

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::api::request::parse_url;
use crate::api::{Dispatch, Dispatcher, RequestConfig};
use crate::auth::{
    CredentialStore, FileScope, KeyringScope, LoginRequest, MemoryScope, PasswordHasher,
    PendingLogin, StorageScope,
};
use crate::config::{Config, DurableBackend, APP_NAME};
use crate::error::Result;

#[derive(Clone)]
pub struct Security {
    http: Client,
    store: CredentialStore,
    dispatcher: Dispatcher,
    hasher: PasswordHasher,
}

impl Security {
    /// Build the service with the scopes `config` selects: a file or keychain
    /// durable scope and an in-memory ephemeral scope.
    pub fn new(config: &Config) -> Result<Self> {
        let durable: Arc<dyn StorageScope> = match config.durable_backend {
            DurableBackend::File => Arc::new(FileScope::in_dir(
                config.storage_dir.as_deref(),
                APP_NAME,
            )?),
            DurableBackend::Keyring => Arc::new(KeyringScope::new(APP_NAME)),
        };
        Self::with_scopes(config, durable, Arc::new(MemoryScope::new()))
    }

    /// Build the service over caller-supplied scopes
    pub fn with_scopes(
        config: &Config,
        durable: Arc<dyn StorageScope>,
        ephemeral: Arc<dyn StorageScope>,
    ) -> Result<Self> {
        let mut builder = Client::builder().cookie_store(true);
        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let http = builder.build()?;

        let store = CredentialStore::new(durable, ephemeral);
        let dispatcher = Dispatcher::new(http.clone(), store.clone(), config.null_identity_header);
        let hasher = PasswordHasher::new(config.hash)?;

        Ok(Self {
            http,
            store,
            dispatcher,
            hasher,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    // ===== Session =====

    pub fn username(&self) -> Option<String> {
        self.store.username()
    }

    pub fn password(&self) -> Option<String> {
        self.store.password()
    }

    pub fn is_logged_in(&self) -> bool {
        self.store.is_logged_in()
    }

    /// Hydrate the session from storage, durable scope first
    pub fn start(&self) -> Result<&Self> {
        match self.store.start()? {
            Some(scope) => info!(scope = %scope, "Session restored"),
            None => info!("Starting logged out"),
        }
        Ok(self)
    }

    pub fn load_stored(&self) -> Result<&Self> {
        self.store.load_stored()?;
        Ok(self)
    }

    pub fn load_session(&self) -> Result<&Self> {
        self.store.load_session()?;
        Ok(self)
    }

    pub fn logout(&self) -> Result<&Self> {
        self.store.logout()?;
        Ok(self)
    }

    // ===== Login =====

    /// Validate a login against `url`; await the result to run it
    pub fn login(&self, url: &str, request: LoginRequest) -> Result<PendingLogin> {
        Ok(PendingLogin {
            http: self.http.clone(),
            store: self.store.clone(),
            hasher: self.hasher.clone(),
            url: parse_url(url)?,
            request,
        })
    }

    // ===== Requests =====

    pub fn send(
        &self,
        method: &str,
        url: &str,
        config: impl Into<RequestConfig>,
    ) -> Result<Dispatch> {
        self.dispatcher.send(method, url, config.into())
    }

    pub fn get(&self, url: &str, config: impl Into<RequestConfig>) -> Result<Dispatch> {
        self.send("GET", url, config)
    }

    pub fn post(&self, url: &str, config: impl Into<RequestConfig>) -> Result<Dispatch> {
        self.send("POST", url, config)
    }

    pub fn put(&self, url: &str, config: impl Into<RequestConfig>) -> Result<Dispatch> {
        self.send("PUT", url, config)
    }

    pub fn delete(&self, url: &str, config: impl Into<RequestConfig>) -> Result<Dispatch> {
        self.send("DELETE", url, config)
    }

    pub fn options(&self, url: &str, config: impl Into<RequestConfig>) -> Result<Dispatch> {
        self.send("OPTIONS", url, config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use httpmock::MockServer;
    use serde_json::{json, Value};

    use super::*;
    use crate::api::basic_authorization;
    use crate::auth::hash::cheap_cost;
    use crate::auth::storage::{FIELD_PASS, FIELD_USER};
    use crate::error::Error;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            storage_dir: Some(dir.to_path_buf()),
            hash: cheap_cost(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_remembered_login_survives_restart() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/auth");
            then.status(200).json_body(json!({"ok": true}));
        });
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let security = Security::new(&config).unwrap();
        security
            .login(&server.url("/auth"), LoginRequest::new("alice", "pw").remember(true))
            .unwrap()
            .await
            .unwrap();
        let hash = security.password().unwrap();

        // A new process: fresh service, same durable file, empty memory scope
        let restarted = Security::new(&config).unwrap();
        assert!(!restarted.is_logged_in());
        restarted.start().unwrap();
        assert_eq!(restarted.username().as_deref(), Some("alice"));
        assert_eq!(restarted.password(), Some(hash));
    }

    #[tokio::test]
    async fn test_unremembered_login_leaves_durable_scope_empty() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/auth");
            then.status(200).json_body(json!({}));
        });
        let durable = Arc::new(MemoryScope::new());
        let ephemeral = Arc::new(MemoryScope::new());
        let config = Config {
            hash: cheap_cost(),
            ..Config::default()
        };
        let security = Security::with_scopes(&config, durable.clone(), ephemeral.clone()).unwrap();

        security
            .login(&server.url("/auth"), LoginRequest::new("alice", "pw"))
            .unwrap()
            .await
            .unwrap();

        assert!(durable.is_empty());
        assert_eq!(ephemeral.read(FIELD_USER).unwrap(), Some(json!("alice")));
        assert_eq!(
            ephemeral.read(FIELD_PASS).unwrap(),
            security.password().map(Value::String)
        );
    }

    #[tokio::test]
    async fn test_logout_then_start_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let durable = Arc::new(FileScope::in_dir(Some(dir.path()), APP_NAME).unwrap());
        let ephemeral = Arc::new(MemoryScope::new());
        durable.write(FIELD_USER, "alice").unwrap();
        durable.write(FIELD_PASS, "h1").unwrap();
        ephemeral.write(FIELD_USER, "bob").unwrap();
        ephemeral.write(FIELD_PASS, "h2").unwrap();

        let security = Security::with_scopes(&config, durable, ephemeral).unwrap();
        assert!(security.start().unwrap().is_logged_in());
        assert!(!security.logout().unwrap().start().unwrap().is_logged_in());
        assert_eq!(security.username(), None);
    }

    #[tokio::test]
    async fn test_session_requests_carry_basic_auth() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/items/7")
                .header("authorization", basic_authorization("alice", "h1"));
            then.status(202).json_body(json!({"deleted": 7}));
        });
        let durable = Arc::new(MemoryScope::new());
        durable.write(FIELD_USER, "alice").unwrap();
        durable.write(FIELD_PASS, "h1").unwrap();
        let config = Config {
            hash: cheap_cost(),
            ..Config::default()
        };
        let security =
            Security::with_scopes(&config, durable, Arc::new(MemoryScope::new())).unwrap();
        security.load_stored().unwrap();

        let outcome = security
            .delete(&server.url("/items/7"), RequestConfig::Absent)
            .unwrap()
            .await
            .unwrap();
        mock.assert();
        assert!(outcome.is_success());
        assert_eq!(outcome.reply().body, json!({"deleted": 7}));
    }

    #[tokio::test]
    async fn test_convenience_wrappers_use_fixed_methods() {
        let dir = tempfile::tempdir().unwrap();
        let security = Security::new(&test_config(dir.path())).unwrap();
        let url = "http://localhost/resource";

        assert_eq!(security.get(url, RequestConfig::Absent).unwrap().method().as_str(), "GET");
        assert_eq!(security.post(url, "a=1").unwrap().method().as_str(), "POST");
        assert_eq!(security.put(url, RequestConfig::Absent).unwrap().method().as_str(), "PUT");
        assert_eq!(
            security.delete(url, RequestConfig::Absent).unwrap().method().as_str(),
            "DELETE"
        );
        assert_eq!(
            security.options(url, RequestConfig::Absent).unwrap().method().as_str(),
            "OPTIONS"
        );
    }

    #[tokio::test]
    async fn test_unsupported_config_never_reaches_the_network() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });
        let dir = tempfile::tempdir().unwrap();
        let security = Security::new(&test_config(dir.path())).unwrap();

        let err = RequestConfig::from_value(json!(42))
            .and_then(|config| security.send("GET", &server.url("/x"), config))
            .err()
            .unwrap();
        assert!(err.is_type_validation());
        mock.assert_calls(0);
    }

    #[test]
    fn test_login_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let security = Security::new(&test_config(dir.path())).unwrap();
        let err = security
            .login("not a url", LoginRequest::new("alice", "pw"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::TypeValidation(_)));
    }

    #[test]
    fn test_load_session_without_data_fails() {
        let dir = tempfile::tempdir().unwrap();
        let security = Security::new(&test_config(dir.path())).unwrap();
        assert!(matches!(
            security.load_session().err().unwrap(),
            Error::Hydration { .. }
        ));
    }
}
