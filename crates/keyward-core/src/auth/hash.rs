//! Login-time password hashing.
//!
//! The password is run through Argon2id with a fresh random salt before it
//! ever leaves the process. Hashing is deliberately slow, so it runs on
//! tokio's blocking pool instead of an executor thread.

use argon2::password_hash::{rand_core::OsRng, PasswordHasher as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Default iteration count; the "cost factor" of the hash.
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Default memory cost in KiB (Argon2's own default).
pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| Error::invalid(format!("hash cost {:?} rejected: {}", cost, e)))?;
        Ok(Self { params })
    }

    /// Hash `password` off the async executor, returning a PHC string
    pub async fn hash(&self, password: String) -> Result<String> {
        let params = self.params.clone();
        let started = std::time::Instant::now();
        let hash = tokio::task::spawn_blocking(move || hash_blocking(params, &password))
            .await
            .map_err(|e| Error::Hash(format!("hashing task failed: {}", e)))??;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Password hashed");
        Ok(hash)
    }
}

fn hash_blocking(params: Params, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let hash = argon
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

#[cfg(test)]
pub(crate) fn cheap_cost() -> HashCost {
    HashCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}
