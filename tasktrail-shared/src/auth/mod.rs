/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing and verification
/// - [`jwt`]: Signed, time-bounded bearer tokens
/// - [`middleware`]: Request authorization gate (authenticate, then authorize)
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations, random salt per hash
/// - **Tokens**: HS256 signing, 24 hour expiry, HMAC family pinned at validation
/// - **Stateless**: No session store; role travels inside the token
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use tasktrail_shared::auth::jwt::TokenService;
/// use tasktrail_shared::auth::password::CredentialStore;
/// use tasktrail_shared::models::user::Role;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = CredentialStore::new();
/// let hash = credentials.hash("user_password")?;
/// credentials.verify("user_password", &hash)?;
///
/// let tokens = TokenService::new(b"a-secret-of-at-least-thirty-two-bytes!!");
/// let token = tokens.issue(42, Role::User, Utc::now())?;
/// let claims = tokens.validate(&token, Utc::now())?;
/// assert_eq!(claims.sub, "42");
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
