//! User stories API handlers.
//!
//! ```text
//! GET|POST             /api/v1/userstories
//! GET                  /api/v1/userstories/by_ref?project=1&ref=3
//! POST                 /api/v1/userstories/bulk_create
//! POST                 /api/v1/userstories/bulk_update_{backlog|sprint|kanban}_order
//! GET|PUT|PATCH|DELETE /api/v1/userstories/{id}
//! ```
//!
//! Updates are version checked: the body must carry the `version` the client
//! last saw, plus an optional `comment` recorded in the history entry.

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    BulkCreateUserStories, CreateUserStory, Error, IssueId, MilestoneId, OrderField, ProjectId,
    Requester, StatusId, UserStory, UserStoryChanges, UserStoryFilter, UserStoryId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::UserStoryBody;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{Patch, parse_flag};

/// Filters for `GET /userstories`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserStoriesQuery {
    pub project: Option<i64>,
    pub status: Option<i64>,
    pub milestone: Option<i64>,
    /// `true` lists the backlog: stories outside any milestone.
    #[serde(rename = "milestone__isnull")]
    #[param(rename = "milestone__isnull")]
    pub milestone_is_null: Option<String>,
    /// `0`, `1`, `true` or `false`.
    pub is_archived: Option<String>,
    /// Case-insensitive substring of the subject.
    pub subject: Option<String>,
    /// A number matches `ref`; words must all appear in the subject.
    pub q: Option<String>,
}

impl UserStoriesQuery {
    fn into_filter(self) -> Result<UserStoryFilter, Error> {
        let is_archived = self
            .is_archived
            .as_deref()
            .map(|raw| parse_flag("is_archived", raw))
            .transpose()?;
        let milestone_is_null = self
            .milestone_is_null
            .as_deref()
            .map(|raw| parse_flag("milestone__isnull", raw))
            .transpose()?;
        Ok(UserStoryFilter {
            project: self.project.map(ProjectId::new),
            status: self.status.map(StatusId::new),
            milestone: self.milestone.map(MilestoneId::new),
            milestone_is_null,
            is_archived,
            subject: self.subject,
            q: self.q,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ByRefQuery {
    pub project: i64,
    #[serde(rename = "ref")]
    #[param(rename = "ref")]
    pub reference: i64,
}

/// Body for `POST /userstories`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateUserStoryBody {
    pub project: i64,
    #[schema(example = "As a user I want to log in")]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to the project's default user-story status.
    #[serde(default)]
    pub status: Option<i64>,
    /// Sprint to plan the story into; absent keeps it in the backlog.
    #[serde(default)]
    pub milestone: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub backlog_order: Option<i64>,
    #[serde(default)]
    pub sprint_order: Option<i64>,
    #[serde(default)]
    pub kanban_order: Option<i64>,
    #[serde(default)]
    pub generated_from_issue: Option<i64>,
}

impl From<CreateUserStoryBody> for CreateUserStory {
    fn from(body: CreateUserStoryBody) -> Self {
        Self {
            project: ProjectId::new(body.project),
            subject: body.subject,
            description: body.description,
            status: body.status.map(StatusId::new),
            milestone: body.milestone.map(MilestoneId::new),
            tags: body.tags,
            is_archived: body.is_archived,
            backlog_order: body.backlog_order,
            sprint_order: body.sprint_order,
            kanban_order: body.kanban_order,
            generated_from_issue: body.generated_from_issue.map(IssueId::new),
        }
    }
}

/// Body for `PUT`/`PATCH /userstories/{id}`. Absent fields stay untouched.
///
/// `version` stays raw so a missing or malformed value reaches the version
/// check instead of failing deserialisation.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UserStoryPatchBody {
    /// Version the change is based on.
    #[serde(default)]
    #[schema(value_type = i64, example = 1)]
    pub version: Option<Value>,
    /// Recorded in the history entry of the change.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
    /// `null` moves the story and its tasks back to the backlog.
    #[serde(default)]
    pub milestone: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub backlog_order: Option<i64>,
    #[serde(default)]
    pub sprint_order: Option<i64>,
    #[serde(default)]
    pub kanban_order: Option<i64>,
}

impl From<Patch<UserStoryPatchBody>> for UserStoryChanges {
    fn from(patch: Patch<UserStoryPatchBody>) -> Self {
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
            milestone: body.milestone.map(MilestoneId::new),
            tags: body.tags,
            is_archived: body.is_archived,
            backlog_order: body.backlog_order,
            sprint_order: body.sprint_order,
            kanban_order: body.kanban_order,
            comment: body.comment.unwrap_or_default(),
        }
    }
}

/// Body for `POST /userstories/bulk_create`: one story per non-blank line.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkCreateUserStoriesBody {
    pub project_id: i64,
    #[serde(default)]
    pub status_id: Option<i64>,
    #[schema(example = "Story #1\nStory #2")]
    pub bulk_stories: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct StoryOrderBody {
    pub us_id: i64,
    pub order: i64,
}

/// Body for `POST /userstories/bulk_update_{field}_order`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkStoryOrderBody {
    pub project_id: i64,
    pub bulk_stories: Vec<StoryOrderBody>,
}

fn order_field(raw: &str) -> Result<OrderField, Error> {
    match raw {
        "backlog" => Ok(OrderField::Backlog),
        "sprint" => Ok(OrderField::Sprint),
        "kanban" => Ok(OrderField::Kanban),
        _ => Err(Error::not_found("Not found")),
    }
}

fn story_bodies(stories: &[UserStory]) -> Vec<UserStoryBody> {
    stories.iter().map(UserStoryBody::from).collect()
}

/// User stories the requester may view.
#[utoipa::path(
    get,
    path = "/api/v1/userstories",
    params(UserStoriesQuery),
    responses(
        (status = 200, description = "Visible user stories", body = [UserStoryBody]),
        (status = 400, description = "Invalid filter", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "listUserStories"
)]
#[get("/userstories")]
pub async fn list_user_stories(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<UserStoriesQuery>,
) -> ApiResult<web::Json<Vec<UserStoryBody>>> {
    let filter = query.into_inner().into_filter()?;
    let stories = state.services.user_stories.list(&requester, &filter).await?;
    Ok(web::Json(story_bodies(&stories)))
}

/// Create a user story.
#[utoipa::path(
    post,
    path = "/api/v1/userstories",
    request_body = CreateUserStoryBody,
    responses(
        (status = 201, description = "User story created", body = UserStoryBody),
        (status = 400, description = "Invalid user story", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "createUserStory"
)]
#[post("/userstories")]
pub async fn create_user_story(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateUserStoryBody>,
) -> ApiResult<HttpResponse> {
    let story = state
        .services
        .user_stories
        .create(&requester, payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(UserStoryBody::from(&story)))
}

/// Fetch a story by project and reference.
#[utoipa::path(
    get,
    path = "/api/v1/userstories/by_ref",
    params(ByRefQuery),
    responses(
        (status = 200, description = "User story", body = UserStoryBody),
        (status = 404, description = "Unknown reference", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "userStoryByRef"
)]
#[get("/userstories/by_ref")]
pub async fn user_story_by_ref(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<ByRefQuery>,
) -> ApiResult<web::Json<UserStoryBody>> {
    let story = state
        .services
        .user_stories
        .by_ref(&requester, ProjectId::new(query.project), query.reference)
        .await?;
    Ok(web::Json(UserStoryBody::from(&story)))
}

/// Create one story per non-blank line.
#[utoipa::path(
    post,
    path = "/api/v1/userstories/bulk_create",
    request_body = BulkCreateUserStoriesBody,
    responses(
        (status = 200, description = "Created user stories", body = [UserStoryBody]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "bulkCreateUserStories"
)]
#[post("/userstories/bulk_create")]
pub async fn bulk_create_user_stories(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<BulkCreateUserStoriesBody>,
) -> ApiResult<web::Json<Vec<UserStoryBody>>> {
    let BulkCreateUserStoriesBody {
        project_id,
        status_id,
        bulk_stories,
    } = payload.into_inner();
    let stories = state
        .services
        .user_stories
        .bulk_create(
            &requester,
            BulkCreateUserStories {
                project: ProjectId::new(project_id),
                status: status_id.map(StatusId::new),
                bulk_stories,
            },
        )
        .await?;
    Ok(web::Json(story_bodies(&stories)))
}

/// Set one board order for several stories; history entries stay hidden.
#[utoipa::path(
    post,
    path = "/api/v1/userstories/bulk_update_{field}_order",
    params(("field" = String, Path, description = "`backlog`, `sprint` or `kanban`")),
    request_body = BulkStoryOrderBody,
    responses(
        (status = 204, description = "Stories reordered"),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown project", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "bulkUpdateUserStoryOrder"
)]
#[post("/userstories/bulk_update_{field}_order")]
pub async fn bulk_update_user_story_order(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<String>,
    payload: web::Json<BulkStoryOrderBody>,
) -> ApiResult<HttpResponse> {
    let field = order_field(&path)?;
    let BulkStoryOrderBody {
        project_id,
        bulk_stories,
    } = payload.into_inner();
    let orders: Vec<(UserStoryId, i64)> = bulk_stories
        .into_iter()
        .map(|entry| (UserStoryId::new(entry.us_id), entry.order))
        .collect();
    state
        .services
        .user_stories
        .bulk_update_order(&requester, ProjectId::new(project_id), field, &orders)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/userstories/{id}",
    params(("id" = i64, Path, description = "User story id")),
    responses(
        (status = 200, description = "User story", body = UserStoryBody),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown user story", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "getUserStory"
)]
#[get("/userstories/{id}")]
pub async fn get_user_story(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<UserStoryBody>> {
    let story = state
        .services
        .user_stories
        .retrieve(&requester, UserStoryId::new(path.into_inner()))
        .await?;
    Ok(web::Json(UserStoryBody::from(&story)))
}

async fn apply_changes(
    state: &HttpState,
    requester: &Requester,
    id: i64,
    object: Map<String, Value>,
) -> ApiResult<web::Json<UserStoryBody>> {
    let changes = UserStoryChanges::from(Patch::<UserStoryPatchBody>::parse(object)?);
    let story = state
        .services
        .user_stories
        .update(requester, UserStoryId::new(id), changes)
        .await?;
    Ok(web::Json(UserStoryBody::from(&story)))
}

/// Replace story fields. Same semantics as `PATCH`.
#[utoipa::path(
    put,
    path = "/api/v1/userstories/{id}",
    params(("id" = i64, Path, description = "User story id")),
    request_body = UserStoryPatchBody,
    responses(
        (status = 200, description = "Updated user story", body = UserStoryBody),
        (status = 400, description = "Invalid version or field", body = Error),
        (status = 409, description = "Version conflict", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "replaceUserStory"
)]
#[put("/userstories/{id}")]
pub async fn replace_user_story(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<web::Json<UserStoryBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Update a story. The body must carry the current `version`.
#[utoipa::path(
    patch,
    path = "/api/v1/userstories/{id}",
    params(("id" = i64, Path, description = "User story id")),
    request_body = UserStoryPatchBody,
    responses(
        (status = 200, description = "Updated user story", body = UserStoryBody),
        (status = 400, description = "Invalid version or field", body = Error),
        (status = 409, description = "Version conflict", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "updateUserStory"
)]
#[patch("/userstories/{id}")]
pub async fn update_user_story(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<web::Json<UserStoryBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Delete a story.
#[utoipa::path(
    delete,
    path = "/api/v1/userstories/{id}",
    params(("id" = i64, Path, description = "User story id")),
    responses(
        (status = 204, description = "User story deleted"),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown user story", body = Error)
    ),
    tags = ["userstories"],
    operation_id = "deleteUserStory"
)]
#[delete("/userstories/{id}")]
pub async fn delete_user_story(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .user_stories
        .destroy(&requester, UserStoryId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "userstories_tests.rs"]
mod tests;
