//! Projects and project templates API handlers.
//!
//! ```text
//! GET|POST          /api/v1/projects
//! GET               /api/v1/projects/by_slug?slug=ada-board
//! GET|PUT|PATCH|DELETE /api/v1/projects/{id}
//! GET               /api/v1/projects/{id}/stats
//! GET               /api/v1/projects/{id}/issues_stats
//! POST              /api/v1/projects/{id}/star
//! POST              /api/v1/projects/{id}/unstar
//! GET               /api/v1/projects/{id}/fans
//! POST              /api/v1/projects/{id}/create_template
//! GET               /api/v1/project-templates
//! GET               /api/v1/project-templates/{slug}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CreateProject, CreateTemplate, Error, IssuesStats, ProjectChanges, ProjectDetail, ProjectId,
    ProjectPermission, ProjectStats, ProjectTemplate, Requester, StatusId, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ProjectDetailBody, UserBody, user_bodies};
use crate::inbound::http::state::HttpState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProjectsQuery {
    /// Only projects this user is a member of.
    pub member: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SlugQuery {
    pub slug: String,
}

/// Body for `POST /projects`.
///
/// Public projects default to the anonymous and registered-user permission
/// sets unless explicit lists are sent; private projects never keep any.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateProjectBody {
    #[schema(example = "Board")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub anon_permissions: Option<Vec<ProjectPermission>>,
    #[serde(default)]
    pub public_permissions: Option<Vec<ProjectPermission>>,
    /// Template slug, `scrum` when absent.
    #[serde(default)]
    #[schema(example = "kanban")]
    pub creation_template: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_story_points: Option<i32>,
    #[serde(default)]
    pub total_milestones: Option<i32>,
}

impl From<CreateProjectBody> for CreateProject {
    fn from(body: CreateProjectBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            is_private: body.is_private,
            anon_permissions: body.anon_permissions,
            public_permissions: body.public_permissions,
            creation_template: body.creation_template,
            tags: body.tags,
            total_story_points: body.total_story_points,
            total_milestones: body.total_milestones,
        }
    }
}

/// Body for `PUT`/`PATCH /projects/{id}`. Absent fields stay untouched.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct ProjectPatchBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub anon_permissions: Option<Vec<ProjectPermission>>,
    pub public_permissions: Option<Vec<ProjectPermission>>,
    pub tags: Option<Vec<String>>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub default_us_status: Option<i64>,
    pub default_task_status: Option<i64>,
    pub default_issue_status: Option<i64>,
}

impl From<ProjectPatchBody> for ProjectChanges {
    fn from(body: ProjectPatchBody) -> Self {
        Self {
            name: body.name,
            description: body.description,
            is_private: body.is_private,
            anon_permissions: body.anon_permissions,
            public_permissions: body.public_permissions,
            tags: body.tags,
            total_story_points: body.total_story_points,
            total_milestones: body.total_milestones,
            default_us_status: body.default_us_status.map(StatusId::new),
            default_task_status: body.default_task_status.map(StatusId::new),
            default_issue_status: body.default_issue_status.map(StatusId::new),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateTemplateBody {
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub template_description: String,
}

fn detail_json(detail: &ProjectDetail) -> web::Json<ProjectDetailBody> {
    web::Json(ProjectDetailBody::from(detail))
}

/// Projects visible to the requester.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    params(ProjectsQuery),
    responses((status = 200, description = "Projects", body = [ProjectDetailBody])),
    tags = ["projects"],
    operation_id = "listProjects"
)]
#[get("/projects")]
pub async fn list_projects(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<ProjectsQuery>,
) -> ApiResult<web::Json<Vec<ProjectDetailBody>>> {
    let projects = state
        .services
        .projects
        .list(&requester, query.member.map(UserId::new))
        .await?;
    Ok(web::Json(
        projects.iter().map(ProjectDetailBody::from).collect(),
    ))
}

/// Create a project from a template; the requester becomes its owner.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    request_body = CreateProjectBody,
    responses(
        (status = 201, description = "Project created", body = ProjectDetailBody),
        (status = 400, description = "Invalid project", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["projects"],
    operation_id = "createProject"
)]
#[post("/projects")]
pub async fn create_project(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateProjectBody>,
) -> ApiResult<HttpResponse> {
    let detail = state
        .services
        .projects
        .create(&requester, payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(ProjectDetailBody::from(&detail)))
}

/// Fetch a project by slug.
#[utoipa::path(
    get,
    path = "/api/v1/projects/by_slug",
    params(SlugQuery),
    responses(
        (status = 200, description = "Project", body = ProjectDetailBody),
        (status = 404, description = "Unknown slug", body = Error)
    ),
    tags = ["projects"],
    operation_id = "projectBySlug"
)]
#[get("/projects/by_slug")]
pub async fn project_by_slug(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<SlugQuery>,
) -> ApiResult<web::Json<ProjectDetailBody>> {
    let detail = state
        .services
        .projects
        .by_slug(&requester, &query.slug)
        .await?;
    Ok(detail_json(&detail))
}

/// Fetch a project with the requester's permissions on it.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project", body = ProjectDetailBody),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "getProject"
)]
#[get("/projects/{id}")]
pub async fn get_project(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<ProjectDetailBody>> {
    let detail = state
        .services
        .projects
        .retrieve(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(detail_json(&detail))
}

async fn apply_changes(
    state: &HttpState,
    requester: &Requester,
    id: i64,
    body: ProjectPatchBody,
) -> ApiResult<web::Json<ProjectDetailBody>> {
    let detail = state
        .services
        .projects
        .update(requester, ProjectId::new(id), body.into())
        .await?;
    Ok(detail_json(&detail))
}

/// Replace project fields. Same semantics as `PATCH`.
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}",
    params(("id" = i64, Path, description = "Project id")),
    request_body = ProjectPatchBody,
    responses(
        (status = 200, description = "Updated project", body = ProjectDetailBody),
        (status = 400, description = "Invalid project", body = Error),
        (status = 403, description = "Not the owner", body = Error)
    ),
    tags = ["projects"],
    operation_id = "replaceProject"
)]
#[put("/projects/{id}")]
pub async fn replace_project(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<ProjectPatchBody>,
) -> ApiResult<web::Json<ProjectDetailBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Update project settings.
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}",
    params(("id" = i64, Path, description = "Project id")),
    request_body = ProjectPatchBody,
    responses(
        (status = 200, description = "Updated project", body = ProjectDetailBody),
        (status = 400, description = "Invalid project", body = Error),
        (status = 403, description = "Not the owner", body = Error)
    ),
    tags = ["projects"],
    operation_id = "updateProject"
)]
#[patch("/projects/{id}")]
pub async fn update_project(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<ProjectPatchBody>,
) -> ApiResult<web::Json<ProjectDetailBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Delete a project and everything in it.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Not the owner", body = Error),
        (status = 404, description = "Unknown project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "deleteProject"
)]
#[delete("/projects/{id}")]
pub async fn delete_project(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .projects
        .destroy(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Backlog figures.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/stats",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Statistics", body = ProjectStats),
        (status = 404, description = "Unknown or invisible project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "projectStats"
)]
#[get("/projects/{id}/stats")]
pub async fn project_stats(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<ProjectStats>> {
    let stats = state
        .services
        .projects
        .stats(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(web::Json(stats))
}

/// Issue counts, overall and per status.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/issues_stats",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Issue statistics", body = IssuesStats),
        (status = 404, description = "Unknown or invisible project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "projectIssuesStats"
)]
#[get("/projects/{id}/issues_stats")]
pub async fn project_issues_stats(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<IssuesStats>> {
    let stats = state
        .services
        .projects
        .issues_stats(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(web::Json(stats))
}

/// Star a project.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/star",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project starred"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown or invisible project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "starProject"
)]
#[post("/projects/{id}/star")]
pub async fn star_project(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .projects
        .star(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Remove the requester's star.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/unstar",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Star removed"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown or invisible project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "unstarProject"
)]
#[post("/projects/{id}/unstar")]
pub async fn unstar_project(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .projects
        .unstar(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Users who starred a project.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/fans",
    params(("id" = i64, Path, description = "Project id")),
    responses(
        (status = 200, description = "Users who starred the project", body = [UserBody]),
        (status = 404, description = "Unknown project", body = Error)
    ),
    tags = ["projects"],
    operation_id = "projectFans"
)]
#[get("/projects/{id}/fans")]
pub async fn project_fans(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<Vec<UserBody>>> {
    let fans = state
        .services
        .projects
        .fans(&requester, ProjectId::new(path.into_inner()))
        .await?;
    Ok(web::Json(user_bodies(&fans)))
}

/// Capture the project's statuses and roles as a new template.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/create_template",
    params(("id" = i64, Path, description = "Project id")),
    request_body = CreateTemplateBody,
    responses(
        (status = 201, description = "Template stored", body = ProjectTemplate),
        (status = 400, description = "Missing name or description", body = Error),
        (status = 403, description = "Superusers only", body = Error)
    ),
    tags = ["projects"],
    operation_id = "createProjectTemplate"
)]
#[post("/projects/{id}/create_template")]
pub async fn create_project_template(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<CreateTemplateBody>,
) -> ApiResult<HttpResponse> {
    let CreateTemplateBody {
        template_name,
        template_description,
    } = payload.into_inner();
    let template = state
        .services
        .projects
        .create_template(
            &requester,
            ProjectId::new(path.into_inner()),
            CreateTemplate {
                template_name,
                template_description,
            },
        )
        .await?;
    Ok(HttpResponse::Created().json(template))
}

/// Built-in templates followed by stored ones.
#[utoipa::path(
    get,
    path = "/api/v1/project-templates",
    responses((status = 200, description = "Templates", body = [ProjectTemplate])),
    tags = ["projects"],
    operation_id = "listProjectTemplates"
)]
#[get("/project-templates")]
pub async fn list_project_templates(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<ProjectTemplate>>> {
    Ok(web::Json(state.services.projects.list_templates().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/project-templates/{slug}",
    params(("slug" = String, Path, description = "Template slug")),
    responses(
        (status = 200, description = "Template", body = ProjectTemplate),
        (status = 404, description = "Unknown template", body = Error)
    ),
    tags = ["projects"],
    operation_id = "getProjectTemplate"
)]
#[get("/project-templates/{slug}")]
pub async fn get_project_template(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProjectTemplate>> {
    state
        .services
        .projects
        .template(&path)
        .await?
        .map(web::Json)
        .ok_or_else(|| Error::not_found("Template not found"))
}

#[cfg(test)]
#[path = "projects_tests.rs"]
mod tests;
