use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;

use crate::auth::session::{SessionCheckError, SessionRecord};
use crate::auth::SessionUser;
use crate::config::config;
use crate::error::ApiError;
use crate::state::AppState;

/// Raw cookie token of the current request, needed to end the session
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Validates the session cookie, refreshes its activity stamp and
/// stores the session user in the request extensions.
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(&config().session.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(SessionCheckError::Missing)?;

    let record = match state.sessions.authenticate(&token, Utc::now()).await {
        Ok(record) => record,
        Err(SessionCheckError::Expired(expiry)) => {
            tracing::info!("Session expired ({})", expiry.reason());
            return Err(SessionCheckError::Expired(expiry).into());
        }
        Err(e) => return Err(e.into()),
    };

    request.extensions_mut().insert(record.user.clone());
    request.extensions_mut().insert(record);
    request.extensions_mut().insert(SessionToken(token));
    Ok(next.run(request).await)
}

/// Any authenticated user
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

impl std::ops::Deref for AuthUser {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn session_user(parts: &Parts) -> Result<SessionUser, ApiError> {
    parts
        .extensions
        .get::<SessionUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts).map(AuthUser)
    }
}

/// Admin or superadmin; anyone else gets 403
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl std::ops::Deref for AdminUser {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Administrator role required"));
        }
        Ok(AdminUser(user))
    }
}

/// Superadmin only
#[derive(Debug, Clone)]
pub struct SuperadminUser(pub SessionUser);

impl std::ops::Deref for SuperadminUser {
    type Target = SessionUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SuperadminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)?;
        if !user.is_superadmin() {
            return Err(ApiError::forbidden("Superadmin role required"));
        }
        Ok(SuperadminUser(user))
    }
}

/// The full session record (login time, last activity)
#[async_trait]
impl<S> FromRequestParts<S> for SessionRecord
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionRecord>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}
