//! Session tokens.
//!
//! Sessions are HS256 JSON web tokens, keyed with `MKT_SESSION_SECRET` and sent in the `mkt_session_token` header.
//! Tokens are issued by the marketplace's identity service; this server only needs to check them, but
//! [`TokenIssuer::issue_token`] is available for tooling and tests.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use chrono::Duration;
use jwt_compact::{
    alg::{Hs256, Hs256Key},
    AlgorithmExt,
    Claims,
    Header,
    TimeOptions,
    UntrustedToken,
    ValidationError,
};
use log::*;
use marketplace_engine::db_types::Role;
use mkt_common::Secret;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const SESSION_HEADER: &str = "mkt_session_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// The stores this user manages as a vendor.
    #[serde(default)]
    pub store_ids: Vec<i64>,
}

impl SessionClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_roles(&self, roles: &[Role]) -> bool {
        roles.iter().all(|r| self.has_role(*r))
    }

    /// Admins manage every store.
    pub fn manages_store(&self, store_id: i64) -> bool {
        self.has_role(Role::Admin) || self.store_ids.contains(&store_id)
    }

    pub fn check_store(&self, store_id: i64) -> Result<(), AuthError> {
        if self.manages_store(store_id) {
            Ok(())
        } else {
            warn!("🔐️ {} tried to act on store {store_id}, which they do not manage", self.user_id);
            Err(AuthError::StoreNotOwned(store_id))
        }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    key: Hs256Key,
    time_options: TimeOptions,
}

impl TokenIssuer {
    pub fn new(secret: Secret<String>) -> Self {
        let key = Hs256Key::new(secret.reveal().as_bytes());
        Self { key, time_options: TimeOptions::default() }
    }

    /// Issue a session token for the given claims, valid for `duration` (one day if not given).
    /// This method DOES NOT check that the claims are legitimate. That is the caller's job.
    pub fn issue_token(&self, claims: SessionClaims, duration: Option<Duration>) -> Result<String, AuthError> {
        let duration = duration.unwrap_or_else(|| Duration::days(1));
        let claims = Claims::new(claims).set_duration_and_issuance(&self.time_options, duration);
        let header = Header::empty().with_token_type("JWT");
        Hs256.token(&header, &claims, &self.key).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let untrusted =
            UntrustedToken::new(token.trim()).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let token = Hs256.validator::<SessionClaims>(&self.key).validate(&untrusted).map_err(validation_error)?;
        token.claims().validate_expiration(&self.time_options).map_err(|e| {
            debug!("🔐️ Session token for {} rejected. {e}", token.claims().custom.user_id);
            validation_error(e)
        })?;
        let (_, claims) = token.into_parts();
        Ok(claims.custom)
    }
}

fn validation_error(e: ValidationError) -> AuthError {
    match e {
        ValidationError::Expired => AuthError::Expired,
        e => AuthError::ValidationError(e.to_string()),
    }
}

/// Pulls the session claims out of a request. Claims already checked by the ACL middleware are reused; otherwise the
/// `mkt_session_token` header is validated here.
pub fn claims_from_request(req: &HttpRequest) -> Result<SessionClaims, ServerError> {
    if let Some(claims) = req.extensions().get::<SessionClaims>() {
        return Ok(claims.clone());
    }
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::ConfigurationError("No session token issuer has been configured".into()))?;
    let token = req
        .headers()
        .get(SESSION_HEADER)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let claims = issuer.validate_token(token).map_err(|e| {
        debug!("🔐️ Rejecting session token. {e}");
        e
    })?;
    trace!("🔐️ Session validated for {}", claims.user_id);
    Ok(claims)
}

impl FromRequest for SessionClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}
