//! Authentication extractor.
//!
//! Requests to protected pages carry `Authorization: Bearer <jwt>`. Anything
//! else is answered with a redirect to the login page, remembering the page
//! that was asked for in `next`.

use actix_web::{
    FromRequest, HttpRequest, HttpResponse, dev::Payload, http::StatusCode, http::header, web,
};
use std::future::{Ready, ready};
use std::sync::Arc;
use thiserror::Error;
use url::form_urlencoded;
use uuid::Uuid;

use yatube_core::ports::{AuthError, TokenClaims, TokenService};
use yatube_shared::ErrorResponse;

use crate::config::DEFAULT_LOGIN_URL;
use crate::state::AppState;

/// Authenticated caller.
///
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// `login_url?next=<path>`, with `next` query-encoded except for its slashes.
pub fn login_redirect(login_url: &str, next: &str) -> String {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    let next = next
        .split('/')
        .map(|segment| form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/");
    format!("{login_url}{separator}next={next}")
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("Login required: {reason}")]
    LoginRequired { reason: AuthError, location: String },

    #[error("Token service is not configured")]
    Misconfigured,
}

impl actix_web::ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::LoginRequired { .. } => StatusCode::FOUND,
            AuthenticationError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AuthenticationError::LoginRequired { reason, location } => {
                tracing::debug!(%reason, %location, "Redirecting to login");
                HttpResponse::Found()
                    .insert_header((header::LOCATION, location.as_str()))
                    .finish()
            }
            AuthenticationError::Misconfigured => {
                HttpResponse::InternalServerError().json(ErrorResponse::internal_error())
            }
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, AuthenticationError> {
    let token_service = req
        .app_data::<web::Data<Arc<dyn TokenService>>>()
        .ok_or_else(|| {
            tracing::error!("TokenService not found in app data");
            AuthenticationError::Misconfigured
        })?;

    let login_url = req
        .app_data::<web::Data<AppState>>()
        .map_or(DEFAULT_LOGIN_URL, |state| state.login_url.as_str());
    let deny = |reason: AuthError| AuthenticationError::LoginRequired {
        reason,
        location: login_redirect(login_url, req.path()),
    };

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| deny(AuthError::MissingAuth))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| deny(AuthError::InvalidToken("Invalid authorization header".to_string())))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| deny(AuthError::InvalidToken("Expected Bearer token".to_string())))?;

    let claims = token_service.validate_token(token).map_err(deny)?;
    Ok(Identity::from(claims))
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
