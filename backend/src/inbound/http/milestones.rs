//! Milestone (sprint) API handlers.
//!
//! ```text
//! GET|POST          /api/v1/milestones
//! GET               /api/v1/milestones/{id}/stats
//! GET|PATCH|DELETE  /api/v1/milestones/{id}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CreateMilestone, Error, Milestone, MilestoneChanges, MilestoneFilter, MilestoneId,
    MilestoneStats, ProjectId, Requester,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::MilestoneBody;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_flag;

/// Filters for `GET /milestones`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MilestonesQuery {
    pub project: Option<i64>,
    /// `0`, `1`, `true` or `false`.
    pub closed: Option<String>,
}

impl MilestonesQuery {
    fn into_filter(self) -> Result<MilestoneFilter, Error> {
        let closed = self
            .closed
            .as_deref()
            .map(|raw| parse_flag("closed", raw))
            .transpose()?;
        Ok(MilestoneFilter {
            project: self.project.map(ProjectId::new),
            closed,
        })
    }
}

/// Body for `POST /milestones`. Both dates are required.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateMilestoneBody {
    pub project: i64,
    #[schema(example = "Sprint 1")]
    pub name: String,
    #[serde(default)]
    pub estimated_start: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_finish: Option<NaiveDate>,
    #[serde(default)]
    pub disponibility: f64,
    #[serde(default)]
    pub order: Option<i32>,
}

impl From<CreateMilestoneBody> for CreateMilestone {
    fn from(body: CreateMilestoneBody) -> Self {
        Self {
            project: ProjectId::new(body.project),
            name: body.name,
            estimated_start: body.estimated_start,
            estimated_finish: body.estimated_finish,
            disponibility: body.disponibility,
            order: body.order,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct MilestonePatchBody {
    pub name: Option<String>,
    pub estimated_start: Option<NaiveDate>,
    pub estimated_finish: Option<NaiveDate>,
    pub closed: Option<bool>,
    pub disponibility: Option<f64>,
    pub order: Option<i32>,
}

impl From<MilestonePatchBody> for MilestoneChanges {
    fn from(body: MilestonePatchBody) -> Self {
        Self {
            name: body.name,
            estimated_start: body.estimated_start,
            estimated_finish: body.estimated_finish,
            closed: body.closed,
            disponibility: body.disponibility,
            order: body.order,
        }
    }
}

fn milestone_bodies(milestones: &[Milestone]) -> Vec<MilestoneBody> {
    milestones.iter().map(MilestoneBody::from).collect()
}

/// Milestones the requester may view, latest start first.
#[utoipa::path(
    get,
    path = "/api/v1/milestones",
    params(MilestonesQuery),
    responses(
        (status = 200, description = "Visible milestones", body = [MilestoneBody]),
        (status = 400, description = "Invalid filter", body = Error)
    ),
    tags = ["milestones"],
    operation_id = "listMilestones"
)]
#[get("/milestones")]
pub async fn list_milestones(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<MilestonesQuery>,
) -> ApiResult<web::Json<Vec<MilestoneBody>>> {
    let filter = query.into_inner().into_filter()?;
    let milestones = state.services.milestones.list(&requester, &filter).await?;
    Ok(web::Json(milestone_bodies(&milestones)))
}

/// Create a sprint. Both estimated dates are required.
#[utoipa::path(
    post,
    path = "/api/v1/milestones",
    request_body = CreateMilestoneBody,
    responses(
        (status = 201, description = "Milestone created", body = MilestoneBody),
        (status = 400, description = "Invalid milestone", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["milestones"],
    operation_id = "createMilestone"
)]
#[post("/milestones")]
pub async fn create_milestone(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateMilestoneBody>,
) -> ApiResult<HttpResponse> {
    let milestone = state
        .services
        .milestones
        .create(&requester, payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(MilestoneBody::from(&milestone)))
}

/// Completion counters and the daily burndown of a sprint.
#[utoipa::path(
    get,
    path = "/api/v1/milestones/{id}/stats",
    params(("id" = i64, Path, description = "Milestone id")),
    responses(
        (status = 200, description = "Statistics", body = MilestoneStats),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown milestone", body = Error)
    ),
    tags = ["milestones"],
    operation_id = "milestoneStats"
)]
#[get("/milestones/{id}/stats")]
pub async fn milestone_stats(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<MilestoneStats>> {
    let stats = state
        .services
        .milestones
        .stats(&requester, MilestoneId::new(path.into_inner()))
        .await?;
    Ok(web::Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/milestones/{id}",
    params(("id" = i64, Path, description = "Milestone id")),
    responses(
        (status = 200, description = "Milestone", body = MilestoneBody),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown milestone", body = Error)
    ),
    tags = ["milestones"],
    operation_id = "getMilestone"
)]
#[get("/milestones/{id}")]
pub async fn get_milestone(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<MilestoneBody>> {
    let milestone = state
        .services
        .milestones
        .retrieve(&requester, MilestoneId::new(path.into_inner()))
        .await?;
    Ok(web::Json(MilestoneBody::from(&milestone)))
}

/// Update a sprint.
#[utoipa::path(
    patch,
    path = "/api/v1/milestones/{id}",
    params(("id" = i64, Path, description = "Milestone id")),
    request_body = MilestonePatchBody,
    responses(
        (status = 200, description = "Updated milestone", body = MilestoneBody),
        (status = 400, description = "Invalid milestone", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["milestones"],
    operation_id = "updateMilestone"
)]
#[patch("/milestones/{id}")]
pub async fn update_milestone(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<MilestonePatchBody>,
) -> ApiResult<web::Json<MilestoneBody>> {
    let milestone = state
        .services
        .milestones
        .update(
            &requester,
            MilestoneId::new(path.into_inner()),
            payload.into_inner().into(),
        )
        .await?;
    Ok(web::Json(MilestoneBody::from(&milestone)))
}

/// Delete a milestone; its stories and tasks go back to the backlog.
#[utoipa::path(
    delete,
    path = "/api/v1/milestones/{id}",
    params(("id" = i64, Path, description = "Milestone id")),
    responses(
        (status = 204, description = "Milestone deleted"),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown milestone", body = Error)
    ),
    tags = ["milestones"],
    operation_id = "deleteMilestone"
)]
#[delete("/milestones/{id}")]
pub async fn delete_milestone(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .milestones
        .destroy(&requester, MilestoneId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "milestones_tests.rs"]
mod tests;
