//! Issues API handlers.
//!
//! ```text
//! GET|POST             /api/v1/issues
//! GET|PUT|PATCH|DELETE /api/v1/issues/{id}
//! POST                 /api/v1/issues/{id}/upvote
//! POST                 /api/v1/issues/{id}/downvote
//! GET                  /api/v1/issues/{id}/voters
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CreateIssue, Error, IssueChanges, IssueFilter, IssueId, ProjectId, Requester, StatusId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{IssueBody, UserBody, user_bodies};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::Patch;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct IssuesQuery {
    pub project: Option<i64>,
    pub status: Option<i64>,
    /// A number matches `ref`; words must all appear in the subject.
    pub q: Option<String>,
}

impl From<IssuesQuery> for IssueFilter {
    fn from(query: IssuesQuery) -> Self {
        Self {
            project: query.project.map(ProjectId::new),
            status: query.status.map(StatusId::new),
            q: query.q,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateIssueBody {
    pub project: i64,
    #[schema(example = "Login button does nothing")]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to the project's default issue status.
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreateIssueBody> for CreateIssue {
    fn from(body: CreateIssueBody) -> Self {
        Self {
            project: ProjectId::new(body.project),
            subject: body.subject,
            description: body.description,
            status: body.status.map(StatusId::new),
            tags: body.tags,
        }
    }
}

/// Body for `PUT`/`PATCH /issues/{id}`; `version` is mandatory.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct IssuePatchBody {
    #[serde(default)]
    #[schema(value_type = i64, example = 1)]
    pub version: Option<Value>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl From<Patch<IssuePatchBody>> for IssueChanges {
    fn from(patch: Patch<IssuePatchBody>) -> Self {
        let Patch {
            fields,
            version,
            body,
        } = patch;
        Self {
            version,
            fields,
            subject: body.subject,
            description: body.description,
            status: body.status.map(StatusId::new),
            tags: body.tags,
            comment: body.comment.unwrap_or_default(),
        }
    }
}

/// Issues the requester may view.
#[utoipa::path(
    get,
    path = "/api/v1/issues",
    params(IssuesQuery),
    responses((status = 200, description = "Visible issues", body = [IssueBody])),
    tags = ["issues"],
    operation_id = "listIssues"
)]
#[get("/issues")]
pub async fn list_issues(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<IssuesQuery>,
) -> ApiResult<web::Json<Vec<IssueBody>>> {
    let filter = IssueFilter::from(query.into_inner());
    let issues = state.services.issues.list(&requester, &filter).await?;
    Ok(web::Json(issues.iter().map(IssueBody::from).collect()))
}

/// Create an issue.
#[utoipa::path(
    post,
    path = "/api/v1/issues",
    request_body = CreateIssueBody,
    responses(
        (status = 201, description = "Issue created", body = IssueBody),
        (status = 400, description = "Invalid issue", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["issues"],
    operation_id = "createIssue"
)]
#[post("/issues")]
pub async fn create_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateIssueBody>,
) -> ApiResult<HttpResponse> {
    let issue = state
        .services
        .issues
        .create(&requester, payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(IssueBody::from(&issue)))
}

/// Fetch an issue with its vote count.
#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}",
    params(("id" = i64, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Issue", body = IssueBody),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown issue", body = Error)
    ),
    tags = ["issues"],
    operation_id = "getIssue"
)]
#[get("/issues/{id}")]
pub async fn get_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<IssueBody>> {
    let issue = state
        .services
        .issues
        .retrieve(&requester, IssueId::new(path.into_inner()))
        .await?;
    Ok(web::Json(IssueBody::from(&issue)))
}

async fn apply_changes(
    state: &HttpState,
    requester: &Requester,
    id: i64,
    object: Map<String, Value>,
) -> ApiResult<web::Json<IssueBody>> {
    let changes = IssueChanges::from(Patch::<IssuePatchBody>::parse(object)?);
    let issue = state
        .services
        .issues
        .update(requester, IssueId::new(id), changes)
        .await?;
    Ok(web::Json(IssueBody::from(&issue)))
}

/// Replace issue fields. Same semantics as `PATCH`.
#[utoipa::path(
    put,
    path = "/api/v1/issues/{id}",
    params(("id" = i64, Path, description = "Issue id")),
    request_body = IssuePatchBody,
    responses(
        (status = 200, description = "Updated issue", body = IssueBody),
        (status = 400, description = "Invalid version or field", body = Error),
        (status = 409, description = "Version conflict", body = Error)
    ),
    tags = ["issues"],
    operation_id = "replaceIssue"
)]
#[put("/issues/{id}")]
pub async fn replace_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<web::Json<IssueBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Update an issue. The body must carry the current `version`.
#[utoipa::path(
    patch,
    path = "/api/v1/issues/{id}",
    params(("id" = i64, Path, description = "Issue id")),
    request_body = IssuePatchBody,
    responses(
        (status = 200, description = "Updated issue", body = IssueBody),
        (status = 400, description = "Invalid version or field", body = Error),
        (status = 409, description = "Version conflict", body = Error)
    ),
    tags = ["issues"],
    operation_id = "updateIssue"
)]
#[patch("/issues/{id}")]
pub async fn update_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<web::Json<IssueBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Delete an issue.
#[utoipa::path(
    delete,
    path = "/api/v1/issues/{id}",
    params(("id" = i64, Path, description = "Issue id")),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown issue", body = Error)
    ),
    tags = ["issues"],
    operation_id = "deleteIssue"
)]
#[delete("/issues/{id}")]
pub async fn delete_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .issues
        .destroy(&requester, IssueId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Vote for an issue.
#[utoipa::path(
    post,
    path = "/api/v1/issues/{id}/upvote",
    params(("id" = i64, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Vote recorded"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["issues"],
    operation_id = "upvoteIssue"
)]
#[post("/issues/{id}/upvote")]
pub async fn upvote_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .issues
        .upvote(&requester, IssueId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Withdraw a vote.
#[utoipa::path(
    post,
    path = "/api/v1/issues/{id}/downvote",
    params(("id" = i64, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Vote withdrawn"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["issues"],
    operation_id = "downvoteIssue"
)]
#[post("/issues/{id}/downvote")]
pub async fn downvote_issue(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .issues
        .downvote(&requester, IssueId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}/voters",
    params(("id" = i64, Path, description = "Issue id")),
    responses(
        (status = 200, description = "Users who voted", body = [UserBody]),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["issues"],
    operation_id = "issueVoters"
)]
#[get("/issues/{id}/voters")]
pub async fn issue_voters(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<Vec<UserBody>>> {
    let voters = state
        .services
        .issues
        .voters(&requester, IssueId::new(path.into_inner()))
        .await?;
    Ok(web::Json(user_bodies(&voters)))
}

#[cfg(test)]
#[path = "issues_tests.rs"]
mod tests;
