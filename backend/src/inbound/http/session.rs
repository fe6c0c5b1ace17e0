//! Cookie session holding the signed-in user's id.
//!
//! Login and registration persist the id; [`Requester`](crate::domain::Requester)
//! extraction reads it back when no bearer token is present.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";

/// Actix session restricted to the user id.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Store `user_id` under a renewed session key.
    pub fn persist_user(&self, user_id: UserId) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, user_id.get())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Signed-in user, if any. A cookie holding anything but an integer id
    /// counts as anonymous.
    pub fn user_id(&self) -> Option<UserId> {
        self.0
            .get::<i64>(USER_ID_KEY)
            .inspect_err(|error| tracing::warn!(%error, "invalid user id in session cookie"))
            .ok()
            .flatten()
            .map(UserId::new)
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(Self) })
    }
}
