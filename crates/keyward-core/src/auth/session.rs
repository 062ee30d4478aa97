use std::fmt;

/// An authenticated identity: the username and the secret sent with it.
///
/// The secret is the login-time password hash, never the plain password.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub secret: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

// Keep secrets out of debug output and logs
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// In-memory session state.
///
/// Both fields live in one `Option`, so they are always set and
/// cleared together.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub data: Option<Identity>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session identity
    pub fn update(&mut self, identity: Identity) {
        self.data = Some(identity);
    }

    /// Clear session data
    pub fn clear(&mut self) {
        self.data = None;
    }

    pub fn username(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.username.as_str())
    }

    pub fn secret(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.secret.as_str())
    }

    pub fn is_logged_in(&self) -> bool {
        self.data.is_some()
    }
}
