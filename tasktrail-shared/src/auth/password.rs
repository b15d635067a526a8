/// Credential hashing using Argon2id
///
/// [`CredentialStore`] turns plaintext passwords into self-describing PHC
/// strings and verifies candidates against them. Plaintext never leaves the
/// call and is never logged.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
/// - **Salt**: 16 random bytes per call, so equal passwords never share a hash
///
/// Callers enforce input rules (signup requires at least
/// [`MIN_PASSWORD_LENGTH`] characters) before hashing.
///
/// # Example
///
/// ```
/// use tasktrail_shared::auth::password::{CredentialStore, HashParams, PasswordError};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = CredentialStore::with_params(HashParams::light());
/// let hash = store.hash("super_secret_password_123")?;
///
/// assert!(store.verify("super_secret_password_123", &hash).is_ok());
/// assert!(matches!(
///     store.verify("wrong_password", &hash),
///     Err(PasswordError::Mismatch)
/// ));
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::OnceLock;
use tracing::warn;

/// Minimum password length accepted at signup
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Plaintext behind the dummy hash used for unknown accounts
const DUMMY_PASSWORD: &str = "tasktrail-dummy-password";

/// Error type for credential operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// The candidate password does not match the stored hash
    ///
    /// This is the normal "wrong password" outcome. A stored hash that cannot
    /// be parsed also reports `Mismatch`, so verification fails closed.
    #[error("Password does not match")]
    Mismatch,

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    Hash(String),

    /// Verification failed for a reason other than a wrong password
    #[error("Failed to verify password: {0}")]
    Verify(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl HashParams {
    /// Minimal-cost parameters for tests and tooling checks
    ///
    /// Never use these for stored credentials.
    pub fn light() -> Self {
        Self {
            memory_kib: 4096,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies user passwords
#[derive(Debug, Clone)]
pub struct CredentialStore {
    params: HashParams,

    /// Hash checked when the account does not exist, built on first use
    dummy_hash: OnceLock<String>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Creates a store with the default work factor
    pub fn new() -> Self {
        Self::with_params(HashParams::default())
    }

    /// Creates a store with explicit cost parameters
    pub fn with_params(params: HashParams) -> Self {
        Self {
            params,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Cost parameters used for new hashes
    pub fn params(&self) -> HashParams {
        self.params
    }

    /// Hashes a password with a fresh random salt
    ///
    /// # Returns
    ///
    /// PHC string format hash (includes algorithm, parameters, salt, and hash)
    ///
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Hash` if the parameters are rejected or hashing fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(32),
        )
        .map_err(|e| PasswordError::Hash(format!("Invalid parameters: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash
    ///
    /// Parameters and salt are read from the hash itself; the comparison is
    /// constant-time.
    ///
    /// # Errors
    ///
    /// - `PasswordError::Mismatch` for a wrong password or an unparseable hash
    /// - `PasswordError::Verify` for any other verification failure
    pub fn verify(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Stored password hash is malformed, treating as mismatch");
                return Err(PasswordError::Mismatch);
            }
        };

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(PasswordError::Mismatch),
            Err(e) => Err(PasswordError::Verify(format!("Verification failed: {}", e))),
        }
    }

    /// Returns true only when `password` verifies against `hash`
    pub fn matches(&self, password: &str, hash: &str) -> bool {
        self.verify(password, hash).is_ok()
    }

    /// Runs a full verification against a fixed hash made with this store's
    /// parameters
    ///
    /// Login calls this for unknown emails so both failure paths pay the same
    /// Argon2 cost. The outcome is discarded.
    pub fn verify_dummy(&self, password: &str) {
        let hash = match self.dummy_hash.get() {
            Some(hash) => hash,
            None => match self.hash(DUMMY_PASSWORD) {
                Ok(hash) => self.dummy_hash.get_or_init(|| hash),
                Err(e) => {
                    warn!(error = %e, "Failed to build dummy password hash");
                    return;
                }
            },
        };

        let _ = self.verify(password, hash);
    }

    /// The dummy hash, once [`verify_dummy`](Self::verify_dummy) has built it
    pub fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash.get().map(String::as_str)
    }
}
