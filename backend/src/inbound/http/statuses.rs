//! User-story, task and issue status API handlers.
//!
//! All kinds share one set of handlers; the first path segment selects the
//! kind.
//!
//! ```text
//! GET|POST         /api/v1/{userstory|task|issue}-statuses
//! POST             /api/v1/{userstory|task|issue}-statuses/bulk_update_order
//! GET|PATCH|DELETE /api/v1/{userstory|task|issue}-statuses/{id}   (DELETE takes ?moveTo=)
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CreateStatus, Error, ProjectId, Requester, StatusChanges, StatusId, StatusKind,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::roles::MoveToQuery;
use crate::inbound::http::schemas::StatusBody;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::required;

/// Map the `{kind}` path segment to a status kind.
fn status_kind(raw: &str) -> Result<StatusKind, Error> {
    match raw {
        "userstory" => Ok(StatusKind::UserStory),
        "task" => Ok(StatusKind::Task),
        "issue" => Ok(StatusKind::Issue),
        _ => Err(Error::not_found("Not found")),
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatusesQuery {
    pub project: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateStatusBody {
    pub project: i64,
    #[schema(example = "In review")]
    pub name: String,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct StatusPatchBody {
    pub name: Option<String>,
    pub order: Option<i32>,
    pub is_closed: Option<bool>,
    pub color: Option<String>,
}

/// Body for `bulk_update_order`: `[status id, order]` pairs under the key
/// matching the kind.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkStatusOrderBody {
    pub project: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Vec<i64>>>, example = json!([[3, 1], [4, 2]]))]
    pub bulk_userstory_statuses: Option<Vec<(i64, i32)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Vec<i64>>>)]
    pub bulk_task_statuses: Option<Vec<(i64, i32)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Vec<i64>>>)]
    pub bulk_issue_statuses: Option<Vec<(i64, i32)>>,
}

/// Statuses of one kind, filtered by project.
#[utoipa::path(
    get,
    path = "/api/v1/{kind}-statuses",
    params(("kind" = String, Path, description = "`userstory`, `task` or `issue`"), StatusesQuery),
    responses((status = 200, description = "Statuses", body = [StatusBody])),
    tags = ["statuses"],
    operation_id = "listStatuses"
)]
#[get("/{kind}-statuses")]
pub async fn list_statuses(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<String>,
    query: web::Query<StatusesQuery>,
) -> ApiResult<web::Json<Vec<StatusBody>>> {
    let kind = status_kind(&path)?;
    let statuses = state
        .services
        .statuses
        .list(&requester, kind, query.project.map(ProjectId::new))
        .await?;
    Ok(web::Json(statuses.iter().map(StatusBody::from).collect()))
}

/// Create a status of the kind named in the path.
#[utoipa::path(
    post,
    path = "/api/v1/{kind}-statuses",
    params(("kind" = String, Path, description = "`userstory`, `task` or `issue`")),
    request_body = CreateStatusBody,
    responses(
        (status = 201, description = "Status created", body = StatusBody),
        (status = 400, description = "Invalid status", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["statuses"],
    operation_id = "createStatus"
)]
#[post("/{kind}-statuses")]
pub async fn create_status(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<String>,
    payload: web::Json<CreateStatusBody>,
) -> ApiResult<HttpResponse> {
    let kind = status_kind(&path)?;
    let CreateStatusBody {
        project,
        name,
        order,
        is_closed,
        color,
    } = payload.into_inner();
    let status = state
        .services
        .statuses
        .create(
            &requester,
            kind,
            CreateStatus {
                project: ProjectId::new(project),
                name,
                order,
                is_closed,
                color,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(StatusBody::from(&status)))
}

/// Reorder statuses of one project; statuses of other projects are ignored.
#[utoipa::path(
    post,
    path = "/api/v1/{kind}-statuses/bulk_update_order",
    params(("kind" = String, Path, description = "`userstory`, `task` or `issue`")),
    request_body = BulkStatusOrderBody,
    responses(
        (status = 204, description = "Statuses reordered"),
        (status = 400, description = "Missing order list", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["statuses"],
    operation_id = "bulkUpdateStatusOrder"
)]
#[post("/{kind}-statuses/bulk_update_order")]
pub async fn bulk_update_status_order(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<String>,
    payload: web::Json<BulkStatusOrderBody>,
) -> ApiResult<HttpResponse> {
    let kind = status_kind(&path)?;
    let BulkStatusOrderBody {
        project,
        bulk_userstory_statuses,
        bulk_task_statuses,
        bulk_issue_statuses,
    } = payload.into_inner();
    let pairs = match kind {
        StatusKind::UserStory => required("bulk_userstory_statuses", bulk_userstory_statuses)?,
        StatusKind::Task => required("bulk_task_statuses", bulk_task_statuses)?,
        StatusKind::Issue => required("bulk_issue_statuses", bulk_issue_statuses)?,
    };
    let orders: Vec<(StatusId, i32)> = pairs
        .into_iter()
        .map(|(id, order)| (StatusId::new(id), order))
        .collect();
    state
        .services
        .statuses
        .bulk_update_order(&requester, kind, ProjectId::new(project), &orders)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/{kind}-statuses/{id}",
    params(
        ("kind" = String, Path, description = "`userstory`, `task` or `issue`"),
        ("id" = i64, Path, description = "Status id")
    ),
    responses(
        (status = 200, description = "Status", body = StatusBody),
        (status = 404, description = "Unknown status", body = Error)
    ),
    tags = ["statuses"],
    operation_id = "getStatus"
)]
#[get("/{kind}-statuses/{id}")]
pub async fn get_status(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<(String, i64)>,
) -> ApiResult<web::Json<StatusBody>> {
    let (kind, id) = path.into_inner();
    let status = state
        .services
        .statuses
        .retrieve(&requester, status_kind(&kind)?, StatusId::new(id))
        .await?;
    Ok(web::Json(StatusBody::from(&status)))
}

/// Partial update; toggling `is_closed` closes or reopens the items in it.
#[utoipa::path(
    patch,
    path = "/api/v1/{kind}-statuses/{id}",
    params(
        ("kind" = String, Path, description = "`userstory`, `task` or `issue`"),
        ("id" = i64, Path, description = "Status id")
    ),
    request_body = StatusPatchBody,
    responses(
        (status = 200, description = "Updated status", body = StatusBody),
        (status = 400, description = "Invalid status", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["statuses"],
    operation_id = "updateStatus"
)]
#[patch("/{kind}-statuses/{id}")]
pub async fn update_status(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<(String, i64)>,
    payload: web::Json<StatusPatchBody>,
) -> ApiResult<web::Json<StatusBody>> {
    let (kind, id) = path.into_inner();
    let StatusPatchBody {
        name,
        order,
        is_closed,
        color,
    } = payload.into_inner();
    let status = state
        .services
        .statuses
        .update(
            &requester,
            status_kind(&kind)?,
            StatusId::new(id),
            StatusChanges {
                name,
                order,
                is_closed,
                color,
            },
        )
        .await?;
    Ok(web::Json(StatusBody::from(&status)))
}

/// Delete a status, moving its items and the project default to `moveTo`.
#[utoipa::path(
    delete,
    path = "/api/v1/{kind}-statuses/{id}",
    params(
        ("kind" = String, Path, description = "`userstory`, `task` or `issue`"),
        ("id" = i64, Path, description = "Status id"),
        MoveToQuery
    ),
    responses(
        (status = 204, description = "Status deleted"),
        (status = 400, description = "Status in use and no replacement given", body = Error),
        (status = 403, description = "Not the project owner", body = Error)
    ),
    tags = ["statuses"],
    operation_id = "deleteStatus"
)]
#[delete("/{kind}-statuses/{id}")]
pub async fn delete_status(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<(String, i64)>,
    query: web::Query<MoveToQuery>,
) -> ApiResult<HttpResponse> {
    let (kind, id) = path.into_inner();
    state
        .services
        .statuses
        .destroy(
            &requester,
            status_kind(&kind)?,
            StatusId::new(id),
            query.move_to.map(StatusId::new),
        )
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "statuses_tests.rs"]
mod tests;
