//! Salted one-way password hashing (argon2id, PHC string format).

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version};
use thiserror::Error;

/// Argon2 cost parameters. Process-wide and immutable once the hasher is built.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),

    #[error("salt generation failed: {0}")]
    Salt(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hashes and verifies passwords.
///
/// Every call to [`PasswordHasher::hash`] draws a fresh 16-byte salt, so the
/// same input yields a different stored string each time. Verification reads
/// the parameters back from the stored PHC string, so hashes made under an
/// older cost setting keep verifying.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    params: HashingParams,
    decoy_hash: String,
}

impl PasswordHasher {
    pub fn new(params: HashingParams) -> Result<Self, HashError> {
        let argon_params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;

        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params),
            params,
            decoy_hash: String::new(),
        };
        hasher.decoy_hash = hasher.hash("decoy-password-for-unknown-identifiers")?;
        Ok(hasher)
    }

    /// Hash a plaintext password into a PHC string.
    ///
    /// Failure is fatal for the caller: there is no fallback value.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;

        let phc = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Check `plaintext` against a stored hash.
    ///
    /// Returns `false` on mismatch and on a malformed hash. The digest
    /// comparison is constant-time.
    pub fn verify(&self, hash: &str, plaintext: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    /// Burn the same work as a real verification.
    ///
    /// Used when the identifier matched nothing, so that the response time
    /// does not reveal whether it exists.
    pub fn verify_decoy(&self, plaintext: &str) {
        let _ = self.verify(&self.decoy_hash, plaintext);
    }
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("algorithm", &"argon2id")
            .field("params", &self.params)
            .finish()
    }
}
