//! Roles API handlers.
//!
//! ```text
//! GET|POST         /api/v1/roles
//! GET|PATCH|DELETE /api/v1/roles/{id}     (DELETE takes ?moveTo=)
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CreateRole, Error, ProjectId, ProjectPermission, Requester, RoleChanges, RoleId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::RoleBody;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RolesQuery {
    pub project: Option<i64>,
}

/// Query for deletions that reassign dependants.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct MoveToQuery {
    /// Replacement for the deleted item; required while it is in use.
    pub move_to: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateRoleBody {
    pub project: i64,
    #[schema(example = "Designer")]
    pub name: String,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default = "computable_by_default")]
    pub computable: bool,
    #[serde(default)]
    pub permissions: Vec<ProjectPermission>,
}

fn computable_by_default() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RolePatchBody {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub computable: Option<bool>,
    pub permissions: Option<Vec<ProjectPermission>>,
}

/// Roles of visible projects.
#[utoipa::path(
    get,
    path = "/api/v1/roles",
    params(RolesQuery),
    responses((status = 200, description = "Roles", body = [RoleBody])),
    tags = ["roles"],
    operation_id = "listRoles"
)]
#[get("/roles")]
pub async fn list_roles(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<RolesQuery>,
) -> ApiResult<web::Json<Vec<RoleBody>>> {
    let roles = state
        .services
        .roles
        .list(&requester, query.project.map(ProjectId::new))
        .await?;
    Ok(web::Json(roles.iter().map(RoleBody::from).collect()))
}

/// Create a role.
#[utoipa::path(
    post,
    path = "/api/v1/roles",
    request_body = CreateRoleBody,
    responses(
        (status = 201, description = "Role created", body = RoleBody),
        (status = 400, description = "Invalid role", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["roles"],
    operation_id = "createRole"
)]
#[post("/roles")]
pub async fn create_role(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateRoleBody>,
) -> ApiResult<HttpResponse> {
    let CreateRoleBody {
        project,
        name,
        order,
        computable,
        permissions,
    } = payload.into_inner();
    let role = state
        .services
        .roles
        .create(
            &requester,
            CreateRole {
                project: ProjectId::new(project),
                name,
                order,
                computable,
                permissions,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(RoleBody::from(&role)))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = RoleBody),
        (status = 404, description = "Unknown role", body = Error)
    ),
    tags = ["roles"],
    operation_id = "getRole"
)]
#[get("/roles/{id}")]
pub async fn get_role(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<RoleBody>> {
    let role = state
        .services
        .roles
        .retrieve(&requester, RoleId::new(path.into_inner()))
        .await?;
    Ok(web::Json(RoleBody::from(&role)))
}

/// Rename a role or change its permissions.
#[utoipa::path(
    patch,
    path = "/api/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id")),
    request_body = RolePatchBody,
    responses(
        (status = 200, description = "Updated role", body = RoleBody),
        (status = 400, description = "Invalid role", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["roles"],
    operation_id = "updateRole"
)]
#[patch("/roles/{id}")]
pub async fn update_role(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<RolePatchBody>,
) -> ApiResult<web::Json<RoleBody>> {
    let RolePatchBody {
        name,
        order,
        computable,
        permissions,
    } = payload.into_inner();
    let role = state
        .services
        .roles
        .update(
            &requester,
            RoleId::new(path.into_inner()),
            RoleChanges {
                name,
                order,
                computable,
                permissions,
            },
        )
        .await?;
    Ok(web::Json(RoleBody::from(&role)))
}

/// Delete a role, moving its members to `moveTo`.
#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    params(("id" = i64, Path, description = "Role id"), MoveToQuery),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 400, description = "Role in use and no replacement given", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["roles"],
    operation_id = "deleteRole"
)]
#[delete("/roles/{id}")]
pub async fn delete_role(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    query: web::Query<MoveToQuery>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .roles
        .destroy(
            &requester,
            RoleId::new(path.into_inner()),
            query.move_to.map(RoleId::new),
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod tests;
