//! Bearer token authentication.
//!
//! Tokens are issued by the auth service. The verifier checks the signature
//! and turns the claims into the [`Actor`] carried by the request context.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::context::{Actor, RequestContext};
use crate::gateway::REQUEST_ID_HEADER;
use crate::{Error, Result};

/// Claims read from caller tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Present on service account tokens.
    #[serde(default)]
    pub service_accountname: Option<String>,
    pub exp: u64,
}

impl Claims {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.sub.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
            email: self.email.clone().filter(|e| !e.is_empty()),
            service_account: self.service_accountname.clone(),
        }
    }
}

/// Validates caller tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Verify HS256 tokens signed with a shared secret.
    pub fn from_secret(secret: &str) -> Self {
        Self::with_key(DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
    }

    /// Verify RS256 tokens against a PEM encoded public key.
    pub fn from_rsa_pem(pem: &str) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| Error::config(format!("invalid token public key: {e}")))?;
        Ok(Self::with_key(key, Algorithm::RS256))
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self { key, validation }
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Error::Authentication("token has expired".into()),
                _ => Error::Authentication(format!("invalid token: {e}")),
            })
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn request_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Require a valid bearer token and attach a [`RequestContext`] to the request.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authorization token"))?;
    let claims = state.verifier.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected caller token");
        ApiError::unauthorized("Invalid token")
    })?;

    let mut ctx = RequestContext::new().with_actor(claims.actor());
    if let Some(request_id) = request_id(&request) {
        ctx = ctx.with_request_id(request_id);
    }
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sign_token;

    const SECRET: &str = "test-secret-key-32-chars-long!!";

    #[test]
    fn test_verify_valid_token() {
        let verifier = TokenVerifier::from_secret(SECRET);
        let token = sign_token(
            SECRET,
            Some("2e0698d8-753e-4cef-bb7c-f027634824a2"),
            Some("jane@example.com"),
            None,
        );

        let claims = verifier.verify(&token).unwrap();
        let actor = claims.actor();
        assert!(actor.id.is_some());
        assert_eq!(actor.email.as_deref(), Some("jane@example.com"));
        assert!(actor.service_account.is_none());
    }

    #[test]
    fn test_non_uuid_subject_gives_no_actor_id() {
        let claims = Claims {
            sub: Some("service".into()),
            service_accountname: Some("fabric8-auth".into()),
            ..Default::default()
        };
        let actor = claims.actor();
        assert!(actor.id.is_none());
        assert_eq!(actor.service_account.as_deref(), Some("fabric8-auth"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let verifier = TokenVerifier::from_secret("another-secret-another-secret!!");
        let token = sign_token(SECRET, None, None, Some("fabric8-auth"));
        assert!(matches!(
            verifier.verify(&token),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_invalid_pem() {
        assert!(matches!(
            TokenVerifier::from_rsa_pem("not a key"),
            Err(Error::Configuration(_))
        ));
    }
}
