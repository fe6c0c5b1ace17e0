//! Memberships and invitations API handlers.
//!
//! ```text
//! GET|POST         /api/v1/memberships
//! POST             /api/v1/memberships/bulk_create
//! GET|PATCH|DELETE /api/v1/memberships/{id}
//! POST             /api/v1/memberships/{id}/resend_invitation
//! GET              /api/v1/invitations
//! GET              /api/v1/invitations/{token}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    BulkMembershipEntry, CreateMembership, Error, MembershipChanges, MembershipId,
    MembershipView, ProjectId, Requester, RoleId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{InvitationBody, MembershipBody};
use crate::inbound::http::state::HttpState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProjectQuery {
    pub project: Option<i64>,
}

/// Body for `POST /memberships`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateMembershipBody {
    pub project: i64,
    pub role: i64,
    #[schema(example = "grace@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkMembershipBody {
    pub role_id: i64,
    pub email: String,
}

/// Body for `POST /memberships/bulk_create`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkCreateMembershipsBody {
    pub project_id: i64,
    pub bulk_memberships: Vec<BulkMembershipBody>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct MembershipPatchBody {
    pub role: Option<i64>,
    pub is_owner: Option<bool>,
}

fn membership_bodies(views: &[MembershipView]) -> Vec<MembershipBody> {
    views.iter().map(MembershipBody::from).collect()
}

/// Memberships of the projects the requester can see.
#[utoipa::path(
    get,
    path = "/api/v1/memberships",
    params(ProjectQuery),
    responses((status = 200, description = "Memberships", body = [MembershipBody])),
    tags = ["memberships"],
    operation_id = "listMemberships"
)]
#[get("/memberships")]
pub async fn list_memberships(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<ProjectQuery>,
) -> ApiResult<web::Json<Vec<MembershipBody>>> {
    let views = state
        .services
        .memberships
        .list(&requester, query.project.map(ProjectId::new))
        .await?;
    Ok(web::Json(membership_bodies(&views)))
}

/// Add a member, or invite the address when no account matches it.
#[utoipa::path(
    post,
    path = "/api/v1/memberships",
    request_body = CreateMembershipBody,
    responses(
        (status = 201, description = "Membership created", body = MembershipBody),
        (status = 400, description = "Invalid membership", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "createMembership"
)]
#[post("/memberships")]
pub async fn create_membership(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateMembershipBody>,
) -> ApiResult<HttpResponse> {
    let CreateMembershipBody {
        project,
        role,
        email,
    } = payload.into_inner();
    let view = state
        .services
        .memberships
        .create(
            &requester,
            CreateMembership {
                project: ProjectId::new(project),
                role: RoleId::new(role),
                email,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(MembershipBody::from(&view)))
}

/// Invite several people at once, one role each.
#[utoipa::path(
    post,
    path = "/api/v1/memberships/bulk_create",
    request_body = BulkCreateMembershipsBody,
    responses(
        (status = 200, description = "Memberships created", body = [MembershipBody]),
        (status = 400, description = "Invalid membership", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "bulkCreateMemberships"
)]
#[post("/memberships/bulk_create")]
pub async fn bulk_create_memberships(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<BulkCreateMembershipsBody>,
) -> ApiResult<web::Json<Vec<MembershipBody>>> {
    let BulkCreateMembershipsBody {
        project_id,
        bulk_memberships,
    } = payload.into_inner();
    let entries = bulk_memberships
        .into_iter()
        .map(|entry| BulkMembershipEntry {
            role: RoleId::new(entry.role_id),
            email: entry.email,
        })
        .collect();
    let views = state
        .services
        .memberships
        .bulk_create(&requester, ProjectId::new(project_id), entries)
        .await?;
    Ok(web::Json(membership_bodies(&views)))
}

#[utoipa::path(
    get,
    path = "/api/v1/memberships/{id}",
    params(("id" = i64, Path, description = "Membership id")),
    responses(
        (status = 200, description = "Membership", body = MembershipBody),
        (status = 404, description = "Unknown membership", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "getMembership"
)]
#[get("/memberships/{id}")]
pub async fn get_membership(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<MembershipBody>> {
    let view = state
        .services
        .memberships
        .retrieve(&requester, MembershipId::new(path.into_inner()))
        .await?;
    Ok(web::Json(MembershipBody::from(&view)))
}

/// Change the role or owner flag of a membership.
#[utoipa::path(
    patch,
    path = "/api/v1/memberships/{id}",
    params(("id" = i64, Path, description = "Membership id")),
    request_body = MembershipPatchBody,
    responses(
        (status = 200, description = "Updated membership", body = MembershipBody),
        (status = 400, description = "Invalid change", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "updateMembership"
)]
#[patch("/memberships/{id}")]
pub async fn update_membership(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<MembershipPatchBody>,
) -> ApiResult<web::Json<MembershipBody>> {
    let MembershipPatchBody { role, is_owner } = payload.into_inner();
    let view = state
        .services
        .memberships
        .update(
            &requester,
            MembershipId::new(path.into_inner()),
            MembershipChanges {
                role: role.map(RoleId::new),
                is_owner,
            },
        )
        .await?;
    Ok(web::Json(MembershipBody::from(&view)))
}

/// Remove a member or revoke an invitation.
#[utoipa::path(
    delete,
    path = "/api/v1/memberships/{id}",
    params(("id" = i64, Path, description = "Membership id")),
    responses(
        (status = 204, description = "Membership deleted"),
        (status = 400, description = "The owner's membership", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "deleteMembership"
)]
#[delete("/memberships/{id}")]
pub async fn delete_membership(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .memberships
        .destroy(&requester, MembershipId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Send a pending invitation's email again.
#[utoipa::path(
    post,
    path = "/api/v1/memberships/{id}/resend_invitation",
    params(("id" = i64, Path, description = "Membership id")),
    responses(
        (status = 204, description = "Invitation mailed again"),
        (status = 400, description = "Already accepted", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "resendInvitation"
)]
#[post("/memberships/{id}/resend_invitation")]
pub async fn resend_invitation(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .memberships
        .resend_invitation(&requester, MembershipId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Invitations cannot be enumerated.
#[utoipa::path(
    get,
    path = "/api/v1/invitations",
    responses(
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Always forbidden", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "listInvitations"
)]
#[get("/invitations")]
pub async fn list_invitations(
    state: web::Data<HttpState>,
    requester: Requester,
) -> ApiResult<web::Json<Vec<InvitationBody>>> {
    let invitations = state.services.memberships.list_invitations(&requester)?;
    Ok(web::Json(
        invitations.iter().map(InvitationBody::from).collect(),
    ))
}

/// Look up an invitation by its token.
///
/// Anyone holding the token may read it.
#[utoipa::path(
    get,
    path = "/api/v1/invitations/{token}",
    params(("token" = String, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Pending invitation", body = InvitationBody),
        (status = 404, description = "Unknown or accepted invitation", body = Error)
    ),
    tags = ["memberships"],
    operation_id = "getInvitation",
    security([])
)]
#[get("/invitations/{token}")]
pub async fn get_invitation(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<String>,
) -> ApiResult<web::Json<InvitationBody>> {
    let view = state
        .services
        .memberships
        .invitation(&requester, &path)
        .await?;
    Ok(web::Json(InvitationBody::from(&view)))
}

#[cfg(test)]
#[path = "memberships_tests.rs"]
mod tests;
