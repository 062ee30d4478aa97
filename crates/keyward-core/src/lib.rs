//! keyward - a credential session manager.
//!
//! Tracks the authenticated user, persists credentials across runs in a
//! durable or an ephemeral scope, and sends HTTP requests carrying a Basic
//! Authentication header derived from the session.
//!
//! - [`auth`]: session, storage scopes, login-time hashing and the login flow
//! - [`api`]: request configuration, dispatch and status classification
//! - [`security`]: the [`Security`] service that ties them together
//! - [`config`]: file and environment configuration
//!
//! ```no_run
//! use keyward_core::{Config, LoginRequest, RequestConfig, Security};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let security = Security::new(&Config::from_env()?)?;
//! security.start()?;
//!
//! if !security.is_logged_in() {
//!     let login = LoginRequest::new("alice", "correct horse").remember(true);
//!     security.login("https://example.com/api/login", login)?.await?;
//! }
//!
//! let outcome = security
//!     .get("https://example.com/api/me", RequestConfig::Absent)?
//!     .await?;
//! println!("{} {}", outcome.status(), outcome.reply().body);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod security;

pub use api::{JsonConfig, Outcome, Reply, RequestConfig};
pub use auth::{Identity, LoginRequest, ScopeKind};
pub use config::{Config, DurableBackend};
pub use error::{Error, Result};
pub use security::Security;
