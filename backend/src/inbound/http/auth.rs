//! Authentication API handlers.
//!
//! ```text
//! POST /api/v1/auth {"type":"normal","username":"ada","password":"secret"}
//! POST /api/v1/auth/register {"type":"public","username":"ada",...}
//! ```
//!
//! Both endpoints answer with the user profile plus a bearer token and also
//! establish a cookie session.

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{AuthenticatedUser, Error, LoginRequest, Registration};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{AuthenticatedUserBody, UserBody};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::required;

/// Login request body for `POST /api/v1/auth`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginBody {
    /// Login flavour; only `normal` is supported.
    #[serde(rename = "type")]
    #[schema(example = "normal")]
    pub kind: String,
    /// Username or email address.
    pub username: String,
    pub password: String,
}

/// Registration request body for `POST /api/v1/auth/register`.
///
/// `public` registrations need `email` and `full_name`. `private`
/// registrations accept an invitation `token`, either for a new account or,
/// with `existing: true`, for the account `username`/`password` identify.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RegisterBody {
    #[serde(rename = "type")]
    #[schema(example = "public")]
    pub kind: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub existing: Option<bool>,
}

impl TryFrom<RegisterBody> for Registration {
    type Error = Error;

    fn try_from(body: RegisterBody) -> Result<Self, Self::Error> {
        match body.kind.as_str() {
            "public" => Ok(Registration::Public {
                username: body.username,
                email: required("email", body.email)?,
                full_name: required("full_name", body.full_name)?,
                password: body.password,
            }),
            "private" => Ok(Registration::Private {
                token: required("token", body.token)?,
                existing: body.existing.unwrap_or(false),
                username: body.username,
                password: body.password,
                email: body.email,
                full_name: body.full_name,
            }),
            _ => Err(Error::invalid_field(
                "type",
                "invalid_register_type",
                "invalid register type",
            )),
        }
    }
}

fn authenticated_body(
    session: &SessionContext,
    auth: AuthenticatedUser,
) -> ApiResult<AuthenticatedUserBody> {
    session.persist_user(auth.user.id)?;
    Ok(AuthenticatedUserBody {
        user: UserBody::from(&auth.user),
        auth_token: auth.auth_token,
    })
}

/// Authenticate a user and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/auth",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Login success", body = AuthenticatedUserBody,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid credentials or login type", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginBody>,
) -> ApiResult<web::Json<AuthenticatedUserBody>> {
    let LoginBody {
        kind,
        username,
        password,
    } = payload.into_inner();
    let auth = state
        .services
        .auth
        .login(LoginRequest {
            kind,
            username,
            password,
        })
        .await?;
    Ok(web::Json(authenticated_body(&session, auth)?))
}

/// Create an account, publicly or by accepting an invitation.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterBody,
    responses(
        (status = 201, description = "Account created", body = AuthenticatedUserBody),
        (status = 400, description = "Invalid registration", body = Error),
        (status = 404, description = "Unknown invitation token", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterBody>,
) -> ApiResult<HttpResponse> {
    let registration = Registration::try_from(payload.into_inner())?;
    let auth = state.services.auth.register(registration).await?;
    Ok(HttpResponse::Created().json(authenticated_body(&session, auth)?))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
