//! Requester extraction.
//!
//! Every handler receives a [`Requester`]. A `Authorization: Bearer <token>`
//! header wins over the session cookie; a request carrying neither is
//! anonymous. A bearer token that fails verification answers `401` instead of
//! silently downgrading to anonymous.

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, Requester};

use super::session::SessionContext;
use super::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Return the bearer token from `Authorization`, if the header uses that
/// scheme.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, Error> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| Error::unauthorized("Invalid token"))?;
    match raw.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_owned())),
        Some(_) => Err(Error::unauthorized("Invalid token")),
        None => Ok(None),
    }
}

impl FromRequest for Requester {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let bearer = bearer_token(req.headers());
        let session = SessionContext::from_request(req, payload);
        Box::pin(async move {
            let state = state.ok_or_else(|| Error::internal("HTTP state is not configured"))?;
            if let Some(token) = bearer? {
                return state.services.auth.requester_from_token(&token).await;
            }
            let session = session.await?;
            match session.user_id() {
                Some(user_id) => state.services.auth.requester_from_session(user_id).await,
                None => Ok(Requester::Anonymous),
            }
        })
    }
}
