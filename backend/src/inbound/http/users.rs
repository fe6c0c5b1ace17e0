//! Users API handlers.
//!
//! ```text
//! GET    /api/v1/users?project=3
//! GET    /api/v1/users/me
//! GET    /api/v1/users/{id}
//! PATCH  /api/v1/users/{id}
//! DELETE /api/v1/users/{id}
//! GET    /api/v1/users/{id}/starred
//! POST   /api/v1/users/password_recovery
//! POST   /api/v1/users/change_password_from_recovery
//! POST   /api/v1/users/change_password
//! POST   /api/v1/users/change_email
//! POST   /api/v1/users/cancel
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Error, ProjectId, Requester, UserChanges, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{DetailBody, ProjectBody, UserBody, user_bodies};
use crate::inbound::http::state::HttpState;

/// Query for `GET /users`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UsersQuery {
    /// Restrict the listing to members of this project.
    pub project: Option<i64>,
}

/// Body for `PATCH /users/{id}`. Absent fields stay untouched; a new `email`
/// only takes effect once confirmed through `change_email`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UserPatchBody {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub lang: Option<String>,
    pub color: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct PasswordRecoveryBody {
    /// Username or email address.
    pub username: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RecoveryPasswordBody {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ChangePasswordBody {
    pub current_password: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ChangeEmailBody {
    pub email_token: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CancelAccountBody {
    pub cancel_token: String,
}

/// List users. With `project`, the project's members.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UsersQuery),
    responses(
        (status = 200, description = "Users", body = [UserBody]),
        (status = 403, description = "Not a member of the project", body = Error),
        (status = 404, description = "Unknown project", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<UsersQuery>,
) -> ApiResult<web::Json<Vec<UserBody>>> {
    let users = state
        .services
        .users
        .list(&requester, query.project.map(ProjectId::new))
        .await?;
    Ok(web::Json(user_bodies(&users)))
}

/// The authenticated user.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserBody),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    requester: Requester,
) -> ApiResult<web::Json<UserBody>> {
    let user = state.services.users.me(&requester)?;
    Ok(web::Json(UserBody::from(&user)))
}

/// Fetch a user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserBody),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<UserBody>> {
    let user = state
        .services
        .users
        .retrieve(&requester, UserId::new(path.into_inner()))
        .await?;
    Ok(web::Json(UserBody::from(&user)))
}

/// Update one's own profile.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserPatchBody,
    responses(
        (status = 200, description = "Updated user", body = UserBody),
        (status = 400, description = "Invalid profile", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not the same user", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<UserPatchBody>,
) -> ApiResult<web::Json<UserBody>> {
    let UserPatchBody {
        username,
        full_name,
        bio,
        lang,
        color,
        email,
    } = payload.into_inner();
    let user = state
        .services
        .users
        .partial_update(
            &requester,
            UserId::new(path.into_inner()),
            UserChanges {
                username,
                full_name,
                bio,
                lang,
                color,
                email,
            },
        )
        .await?;
    Ok(web::Json(UserBody::from(&user)))
}

/// Cancel one's own account right away.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "Account cancelled"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not the same user", body = Error)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .users
        .destroy(&requester, UserId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Projects the user starred.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/starred",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Starred projects", body = [ProjectBody]),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["users"],
    operation_id = "starredProjects"
)]
#[get("/users/{id}/starred")]
pub async fn starred_projects(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<Vec<ProjectBody>>> {
    let projects = state
        .services
        .users
        .starred(&requester, UserId::new(path.into_inner()))
        .await?;
    Ok(web::Json(projects.iter().map(ProjectBody::from).collect()))
}

/// Mail a password recovery token.
#[utoipa::path(
    post,
    path = "/api/v1/users/password_recovery",
    request_body = PasswordRecoveryBody,
    responses(
        (status = 200, description = "Recovery mail sent", body = DetailBody),
        (status = 400, description = "Unknown username or email", body = Error)
    ),
    tags = ["users"],
    operation_id = "passwordRecovery",
    security([])
)]
#[post("/users/password_recovery")]
pub async fn password_recovery(
    state: web::Data<HttpState>,
    payload: web::Json<PasswordRecoveryBody>,
) -> ApiResult<web::Json<DetailBody>> {
    state
        .services
        .users
        .password_recovery(&payload.username)
        .await?;
    Ok(web::Json(DetailBody {
        detail: "Mail sended successful!".to_owned(),
    }))
}

/// Set a new password with a recovery token.
#[utoipa::path(
    post,
    path = "/api/v1/users/change_password_from_recovery",
    request_body = RecoveryPasswordBody,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid token or password", body = Error)
    ),
    tags = ["users"],
    operation_id = "changePasswordFromRecovery",
    security([])
)]
#[post("/users/change_password_from_recovery")]
pub async fn change_password_from_recovery(
    state: web::Data<HttpState>,
    payload: web::Json<RecoveryPasswordBody>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .users
        .change_password_from_recovery(&payload.token, &payload.password)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Change the signed-in user's password.
#[utoipa::path(
    post,
    path = "/api/v1/users/change_password",
    request_body = ChangePasswordBody,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Wrong current password or invalid new one", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "changePassword"
)]
#[post("/users/change_password")]
pub async fn change_password(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<ChangePasswordBody>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .users
        .change_password(&requester, &payload.current_password, &payload.password)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Confirm a pending email change.
#[utoipa::path(
    post,
    path = "/api/v1/users/change_email",
    request_body = ChangeEmailBody,
    responses(
        (status = 204, description = "Email changed"),
        (status = 400, description = "Invalid token", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "changeEmail"
)]
#[post("/users/change_email")]
pub async fn change_email(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<ChangeEmailBody>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .users
        .change_email(&requester, &payload.email_token)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Cancel an account with the signed token from the cancellation mail.
#[utoipa::path(
    post,
    path = "/api/v1/users/cancel",
    request_body = CancelAccountBody,
    responses(
        (status = 204, description = "Account cancelled"),
        (status = 400, description = "Invalid or expired token", body = Error)
    ),
    tags = ["users"],
    operation_id = "cancelAccount",
    security([])
)]
#[post("/users/cancel")]
pub async fn cancel_account(
    state: web::Data<HttpState>,
    payload: web::Json<CancelAccountBody>,
) -> ApiResult<HttpResponse> {
    state.services.users.cancel(&payload.cancel_token).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "users_tests.rs"]
mod tests;
