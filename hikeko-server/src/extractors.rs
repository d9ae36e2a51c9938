use anyhow::Context;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request, HeaderValue},
};
use hikeko_api::{AuthToken, Error as ApiError, UserId, UserSummary, Uuid};
use sqlx::{pool::PoolConnection, PgConnection, PgPool, Postgres};

use crate::{db, Error};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db: PgPool,
}

/// A pooled connection, held until the handler returns
pub struct Conn(PoolConnection<Postgres>);

impl Conn {
    pub fn db(&mut self) -> &mut PgConnection {
        &mut self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Conn
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(_req: &mut request::Parts, state: &S) -> Result<Conn, Error> {
        let conn = PgPool::from_ref(state)
            .acquire()
            .await
            .context("acquiring db connection")?;
        Ok(Conn(conn))
    }
}

/// Reads `Bearer <session uuid>`, the scheme being case-insensitive
pub fn parse_bearer(value: &HeaderValue) -> Option<AuthToken> {
    let (scheme, token) = value.to_str().ok()?.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Uuid::try_parse(token).ok().map(AuthToken)
}

/// A well-formed session token, which may or may not still be open
pub struct PreAuth(pub AuthToken);

#[async_trait]
impl<S: Sync> FromRequestParts<S> for PreAuth {
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, _state: &S) -> Result<PreAuth, Error> {
        let token = req
            .headers
            .get(header::AUTHORIZATION)
            .and_then(parse_bearer)
            .ok_or(ApiError::PermissionDenied)?;
        Ok(PreAuth(token))
    }
}

/// The signed-in user, resolved from an open session
///
/// `user` is what gets attached to the comments they write.
pub struct Auth {
    pub id: UserId,
    pub user: UserSummary,
}

#[async_trait]
impl<S> FromRequestParts<S> for Auth
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(req: &mut request::Parts, state: &S) -> Result<Auth, Error> {
        let PreAuth(token) = PreAuth::from_request_parts(req, state).await?;
        let mut conn = Conn::from_request_parts(req, state).await?;
        let (id, user) = db::recover_session(conn.db(), token)
            .await
            .context("recovering session")?
            .ok_or(ApiError::PermissionDenied)?;
        Ok(Auth { id, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<AuthToken> {
        parse_bearer(&HeaderValue::from_str(s).expect("building header value"))
    }

    #[test]
    fn bearer_tokens() {
        let tok = Uuid::new_v4();
        assert_eq!(parse(&format!("Bearer {tok}")), Some(AuthToken(tok)));
        assert_eq!(parse(&format!("bEaReR {tok}")), Some(AuthToken(tok)));
        assert_eq!(parse(&format!("Basic {tok}")), None);
        assert_eq!(parse(&format!("Bearer {tok} {tok}")), None);
        assert_eq!(parse(&format!("Bearer  {tok}")), None);
        assert_eq!(parse("Bearer"), None);
        assert_eq!(parse("Bearer not-a-uuid"), None);
    }
}
