//! Authentication: session identity, credential persistence and login.
//!
//! This module provides:
//! - `CredentialStore`: the session plus its durable and ephemeral scopes
//! - `StorageScope` backends: in-memory, JSON file and OS keychain
//! - `PasswordHasher`: login-time Argon2id hashing off the executor
//! - `LoginRequest` / `PendingLogin`: the login handshake

pub mod credentials;
pub mod hash;
pub mod keychain;
pub mod login;
pub mod session;
pub mod storage;

pub use credentials::CredentialStore;
pub use hash::{HashCost, PasswordHasher};
pub use keychain::KeyringScope;
pub use login::{LoginRequest, PendingLogin};
pub use session::{Identity, Session};
pub use storage::{FileScope, MemoryScope, ScopeKind, StorageError, StorageScope};
