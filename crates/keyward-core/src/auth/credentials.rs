use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::session::{Identity, Session};
use super::storage::{ScopeKind, StorageError, StorageScope, FIELD_PASS, FIELD_USER};
use crate::error::{Error, Result};

/// Session identity plus its two persistence scopes.
///
/// Clone is cheap and clones share the same session.
#[derive(Clone)]
pub struct CredentialStore {
    session: Arc<RwLock<Session>>,
    durable: Arc<dyn StorageScope>,
    ephemeral: Arc<dyn StorageScope>,
}

impl CredentialStore {
    pub fn new(durable: Arc<dyn StorageScope>, ephemeral: Arc<dyn StorageScope>) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new())),
            durable,
            ephemeral,
        }
    }

    pub fn username(&self) -> Option<String> {
        self.session.read().username().map(str::to_string)
    }

    /// The stored secret (the login-time hash)
    pub fn password(&self) -> Option<String> {
        self.session.read().secret().map(str::to_string)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.read().is_logged_in()
    }

    /// Copy of the current identity, taken under a single read lock
    pub fn snapshot(&self) -> Option<Identity> {
        self.session.read().data.clone()
    }

    /// Hydrate the session from whichever scope holds a complete identity.
    ///
    /// The durable scope wins over the ephemeral one. Returns the scope used,
    /// or `None` when neither is hydratable (the session is left as is).
    pub fn start(&self) -> Result<Option<ScopeKind>> {
        for kind in [ScopeKind::Durable, ScopeKind::Ephemeral] {
            if let Some(identity) = self.hydratable(kind)? {
                debug!(scope = %kind, username = %identity.username, "Session hydrated");
                self.session.write().update(identity);
                return Ok(Some(kind));
            }
        }
        debug!("No stored credentials found");
        Ok(None)
    }

    /// Load the session from the durable scope
    pub fn load_stored(&self) -> Result<()> {
        self.load_scope(ScopeKind::Durable)
    }

    /// Load the session from the ephemeral scope
    pub fn load_session(&self) -> Result<()> {
        self.load_scope(ScopeKind::Ephemeral)
    }

    /// Clear the session and both scopes.
    ///
    /// Every removal is attempted; the first failure is returned afterwards.
    pub fn logout(&self) -> Result<()> {
        self.session.write().clear();
        let mut first_error = None;
        for kind in [ScopeKind::Durable, ScopeKind::Ephemeral] {
            for field in [FIELD_USER, FIELD_PASS] {
                if let Err(e) = self.scope(kind).remove(field) {
                    warn!(scope = %kind, field, error = %e, "Failed to clear stored credential");
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => {
                info!("Logged out");
                Ok(())
            }
        }
    }

    /// Persist `identity` into one scope, then make it the current session.
    /// The other scope is not touched.
    pub(crate) fn commit(&self, identity: Identity, remember: bool) -> Result<()> {
        let kind = if remember {
            ScopeKind::Durable
        } else {
            ScopeKind::Ephemeral
        };
        let scope = self.scope(kind);
        scope.write(FIELD_USER, &identity.username)?;
        if let Err(e) = scope.write(FIELD_PASS, &identity.secret) {
            // Never leave a username without its secret
            if let Err(undo) = scope.remove(FIELD_USER) {
                warn!(scope = %kind, error = %undo, "Failed to roll back partial credentials");
            }
            return Err(e.into());
        }

        info!(scope = %kind, username = %identity.username, "Credentials committed");
        self.session.write().update(identity);
        Ok(())
    }

    fn scope(&self, kind: ScopeKind) -> &dyn StorageScope {
        match kind {
            ScopeKind::Durable => self.durable.as_ref(),
            ScopeKind::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    /// A field's value if it is present and a string
    fn read_field(&self, kind: ScopeKind, field: &str) -> Result<Option<String>> {
        Ok(match self.scope(kind).read(field)? {
            Some(serde_json::Value::String(value)) => Some(value),
            _ => None,
        })
    }

    fn read_pair(
        &self,
        kind: ScopeKind,
    ) -> std::result::Result<(Option<Value>, Option<Value>), StorageError> {
        let scope = self.scope(kind);
        Ok((scope.read(FIELD_USER)?, scope.read(FIELD_PASS)?))
    }

    /// A complete identity from `kind`, or `None` when the scope is empty,
    /// partial, malformed or corrupt
    fn hydratable(&self, kind: ScopeKind) -> Result<Option<Identity>> {
        let (user, pass) = match self.read_pair(kind) {
            Ok(pair) => pair,
            Err(StorageError::Corrupt { path, source }) => {
                warn!(scope = %kind, path = %path.display(), error = %source, "Skipping corrupt credentials");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match (user, pass) {
            (None, None) => Ok(None),
            (Some(Value::String(user)), Some(Value::String(pass))) => {
                Ok(Some(Identity::new(user, pass)))
            }
            (user, _) => {
                let field = if matches!(user, Some(Value::String(_))) {
                    FIELD_PASS
                } else {
                    FIELD_USER
                };
                warn!(scope = %kind, field, "Skipping partial or malformed credentials");
                Ok(None)
            }
        }
    }

    fn load_scope(&self, scope: ScopeKind) -> Result<()> {
        let username = self
            .read_field(scope, FIELD_USER)?
            .ok_or(Error::Hydration { scope, field: FIELD_USER })?;
        let secret = self
            .read_field(scope, FIELD_PASS)?
            .ok_or(Error::Hydration { scope, field: FIELD_PASS })?;
        self.session.write().update(Identity::new(username, secret));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
