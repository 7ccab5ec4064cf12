use std::str::FromStr;

use actix_web::{FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Verified claims of a session token. Attached to the request by the session gate.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iat: Option<usize>,
    pub exp: usize,
}

impl SessionClaims {
    /**
     * Name written to the audit columns. Falls back to the subject.
     */
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.sub.clone())
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|granted| granted == permission)
    }
}

/**
 * JWT Security Service for verifying session tokens.
 */
#[derive(Clone)]
pub struct JwtSecurityService {
    /**
     * The decoding key used to verify JWT tokens.
     */
    decoding_key: DecodingKey,
    /**
     * The validation rules for JWT tokens.
     */
    validation: Validation,
    /**
     * Cookie carrying the session token.
     */
    session_cookie: String,
}

impl JwtSecurityService {
    /**
     * Creates a new instance of JwtSecurityService.
     *
     * # Arguments
     * `verification_key`: Shared secret for hmac algorithms, otherwise a PEM encoded public key.
     * `algorithm`: The algorithm used for JWT token validation.
     * `session_cookie`: Cookie the session token is read from.
     *
     * # Returns
     * A Result containing the JwtSecurityService or an ApplicationError if initialization fails.
     */
    pub fn new(verification_key: &str, algorithm: &str, session_cookie: &str) -> Result<Self, ApplicationError> {
        let algorithm = Algorithm::from_str(algorithm).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid algorithm: {err}")))?;
        let key_error = |err: jsonwebtoken::errors::Error| ApplicationError::new(ErrorType::Initialization, format!("Failed to create decoding key: {err}"));
        let decoding_key = match algorithm {
            Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512 | Algorithm::PS256 | Algorithm::PS384 | Algorithm::PS512 => DecodingKey::from_rsa_pem(verification_key.as_bytes()).map_err(key_error)?,
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(verification_key.as_bytes()).map_err(key_error)?,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => DecodingKey::from_secret(verification_key.as_bytes()),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(verification_key.as_bytes()).map_err(key_error)?,
        };
        let validation = Validation::new(algorithm);
        Ok(JwtSecurityService { decoding_key, validation, session_cookie: session_cookie.to_string() })
    }

    /**
     * Validates the session token of the HTTP request.
     *
     * # Arguments
     * `http_request`: The HTTP request carrying the token in the session cookie or the Authorization header.
     *
     * # Returns
     * The verified claims, or a `JwtAuthorization` error when the token is missing, malformed or expired.
     */
    pub fn validate(&self, http_request: &HttpRequest) -> Result<SessionClaims, ApplicationError> {
        let Some(token) = self.session_token(http_request) else {
            return Err(ApplicationError::new(ErrorType::JwtAuthorization, "Authentication required".to_string()));
        };
        match jsonwebtoken::decode::<SessionClaims>(&token, &self.decoding_key, &self.validation) {
            Ok(token_data) => Ok(token_data.claims),
            Err(err) => {
                debug!("Session token rejected: {err}");
                Err(ApplicationError::new(ErrorType::JwtAuthorization, "Unauthorized".to_string()))
            }
        }
    }

    /**
     * The cookie wins over the Authorization header.
     */
    fn session_token(&self, http_request: &HttpRequest) -> Option<String> {
        if let Some(cookie) = http_request.cookie(&self.session_cookie) {
            return Some(cookie.value().to_string());
        }
        BearerAuth::from_request(http_request, &mut actix_web::dev::Payload::None).into_inner().ok().map(|credentials| credentials.token().to_string())
    }
}

/**
 * Routes reachable without a session.
 */
#[derive(Debug, Clone, Default)]
pub struct PublicRoutes {
    /**
     * Public only when the path is exactly equal.
     */
    exact: Vec<String>,
    /**
     * Public together with everything below them.
     */
    prefixes: Vec<String>,
}

impl PublicRoutes {
    pub fn new(exact: Vec<String>, prefixes: Vec<String>) -> Self {
        let prefixes = prefixes.into_iter().map(|prefix| prefix.trim_end_matches('/').to_string()).collect();
        PublicRoutes { exact, prefixes }
    }

    /**
     * Whether the path needs no session.
     * Prefixes only match at a segment boundary, so `/api/public` covers `/api/public/x` but not `/api/publicity`.
     */
    pub fn is_public(&self, path: &str) -> bool {
        if self.exact.iter().any(|exact| exact == path) {
            return true;
        }
        self.prefixes.iter().any(|prefix| match path.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        })
    }
}
