use std::sync::Arc;

use warp::{
    reject::{self, Rejection},
    Filter,
};

use crate::constants::SESSION_COOKIE;

use super::jwt::{verify_jwt_session, SessionData};

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

pub fn with_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).and_then(move |session: Option<String>| {
        let secret = secret.clone();
        async move {
            match session.map(|token| verify_jwt_session(&token, secret.as_bytes())) {
                Some(Ok(data)) => Ok(SessionData::from(data)),
                _ => Err(warp::reject::custom(Unauthorized)),
            }
        }
    })
}

/// Resolves to `None` for anonymous requests and for tokens that fail to verify.
pub fn with_possible_session(
    secret: Arc<str>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE).map(move |session: Option<String>| {
        session
            .and_then(|token| verify_jwt_session(&token, secret.as_bytes()).ok())
            .map(SessionData::from)
    })
}
