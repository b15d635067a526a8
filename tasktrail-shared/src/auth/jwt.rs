/// Bearer token issuance and validation
///
/// Tokens are JWTs (`header.payload.signature`) signed with HS256. They carry
/// the subject (user ID as a string), the user's role at issuance time and the
/// standard `iat`/`exp` timestamps.
///
/// # Security
///
/// - **Algorithm**: HS256 on issue; validation accepts only the HMAC family
///   (HS256/HS384/HS512) and rejects anything else named in the header
/// - **Expiration**: Fixed at 24 hours, compared against the caller's clock
/// - **Stateless**: No revocation list; a token stays valid until `exp`
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// The role is not re-read from storage on each request, so a role change only
/// takes effect once older tokens expire.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use tasktrail_shared::auth::jwt::TokenService;
/// use tasktrail_shared::models::user::Role;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tokens = TokenService::new(b"your-secret-key-at-least-32-bytes");
/// let now = Utc::now();
///
/// let token = tokens.issue(42, Role::User, now)?;
/// let claims = tokens.validate(&token, now)?;
/// assert_eq!(claims.user_id()?, 42);
/// assert_eq!(claims.role, Role::User);
/// # Ok(())
/// # }
/// ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::models::user::Role;

/// Lifetime of every issued token
pub const TOKEN_TTL_HOURS: i64 = 24;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Error type for token operations
///
/// Every validation failure maps to the same external "unauthorized" outcome;
/// the variants exist for server-side logging.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Not a decodable three-part token, or claims are missing/invalid
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the configured secret
    #[error("Token signature is invalid")]
    BadSignature,

    /// `exp` is in the past relative to the validation clock
    #[error("Token expired at {expired_at}")]
    Expired { expired_at: i64 },

    /// Header names an algorithm outside the HMAC family
    #[error("Unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),

    /// Signing failed while issuing
    #[error("Failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

impl TokenError {
    /// True for the failures that mean "caller is not authenticated"
    pub fn is_rejection(&self) -> bool {
        !matches!(self, TokenError::Encoding(_))
    }
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID as a decimal string
    pub sub: String,

    /// Role at issuance time (custom claim)
    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Builds claims for `user_id` valid for [`TOKEN_TTL_HOURS`] from `now`
    pub fn new(user_id: i64, role: Role, now: DateTime<Utc>) -> Self {
        let expiration = now + Duration::hours(TOKEN_TTL_HOURS);

        Self {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        }
    }

    /// Parses the subject back into a user ID
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| TokenError::Malformed("subject is not a user id".to_string()))
    }

    /// Checks expiry against `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Issues and validates signed bearer tokens
///
/// Holds only the immutable signing secret, so one instance is shared across
/// all requests.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a token service signing with `secret`
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issues a token for `user_id` with `role`, valid for 24 hours from `now`
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails
    pub fn issue(&self, user_id: i64, role: Role, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, role, now);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    /// Validates a token and returns its claims
    ///
    /// Verifies, in order:
    /// - three-part structure with a decodable header
    /// - header algorithm is in the HMAC family
    /// - signature matches the configured secret
    /// - `now` is not past `exp`
    /// - subject is a user ID
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let algorithm = header_algorithm(token)?;
        if !HMAC_ALGORITHMS.iter().any(|alg| algorithm_name(*alg) == algorithm) {
            return Err(TokenError::UnexpectedAlgorithm(algorithm));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm => TokenError::UnexpectedAlgorithm(algorithm.clone()),
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        let claims = token_data.claims;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired {
                expired_at: claims.exp,
            });
        }

        claims.user_id()?;

        Ok(claims)
    }
}

/// Reads `alg` from the token header without trusting anything else in it
fn header_algorithm(token: &str) -> Result<String, TokenError> {
    let mut segments = token.split('.');
    let header = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(_), Some(_), None) => header,
        _ => return Err(TokenError::Malformed("expected three segments".to_string())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::Malformed(format!("header is not base64url: {}", e)))?;
    let raw: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("header is not valid JSON: {}", e)))?;

    Ok(raw.alg)
}

fn algorithm_name(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::HS256 => "HS256",
        Algorithm::HS384 => "HS384",
        Algorithm::HS512 => "HS512",
        _ => "",
    }
}
