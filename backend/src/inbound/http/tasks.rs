//! Task API handlers.
//!
//! ```text
//! GET|POST             /api/v1/tasks
//! POST                 /api/v1/tasks/bulk_create
//! GET|PUT|PATCH|DELETE /api/v1/tasks/{id}
//! ```
//!
//! Updates are version checked like user stories. A task attached to a story
//! always sits in that story's milestone.

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    BulkCreateTasks, CreateTask, Error, MilestoneId, ProjectId, Requester, StatusId, Task,
    TaskChanges, TaskFilter, TaskId, UserStoryId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::TaskBody;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::Patch;

/// Filters for `GET /tasks`.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct TasksQuery {
    pub project: Option<i64>,
    pub user_story: Option<i64>,
    pub milestone: Option<i64>,
    pub status: Option<i64>,
    /// A number matches `ref`; words must all appear in the subject.
    pub q: Option<String>,
}

impl From<TasksQuery> for TaskFilter {
    fn from(query: TasksQuery) -> Self {
        Self {
            project: query.project.map(ProjectId::new),
            user_story: query.user_story.map(UserStoryId::new),
            milestone: query.milestone.map(MilestoneId::new),
            status: query.status.map(StatusId::new),
            q: query.q,
        }
    }
}

/// Body for `POST /tasks`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateTaskBody {
    pub project: i64,
    #[schema(example = "Write the login form")]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to the project's default task status.
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub user_story: Option<i64>,
    /// Ignored when `user_story` is set.
    #[serde(default)]
    pub milestone: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_iocaine: bool,
}

impl From<CreateTaskBody> for CreateTask {
    fn from(body: CreateTaskBody) -> Self {
        Self {
            project: ProjectId::new(body.project),
            subject: body.subject,
            description: body.description,
            status: body.status.map(StatusId::new),
            user_story: body.user_story.map(UserStoryId::new),
            milestone: body.milestone.map(MilestoneId::new),
            tags: body.tags,
            is_iocaine: body.is_iocaine,
        }
    }
}

/// Body for `PUT`/`PATCH /tasks/{id}`. Absent fields stay untouched; an
/// explicit `null` clears `user_story` or `milestone`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct TaskPatchBody {
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
    pub user_story: Option<i64>,
    #[serde(default)]
    pub milestone: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_iocaine: Option<bool>,
}

impl From<Patch<TaskPatchBody>> for TaskChanges {
    fn from(patch: Patch<TaskPatchBody>) -> Self {
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
            user_story: body.user_story.map(UserStoryId::new),
            milestone: body.milestone.map(MilestoneId::new),
            tags: body.tags,
            is_iocaine: body.is_iocaine,
            comment: body.comment.unwrap_or_default(),
        }
    }
}

/// Body for `POST /tasks/bulk_create`: one task per non-blank line.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct BulkCreateTasksBody {
    pub project_id: i64,
    #[serde(default)]
    pub sprint_id: Option<i64>,
    #[serde(default)]
    pub us_id: Option<i64>,
    /// Defaults to the project's default task status.
    #[serde(default)]
    pub status_id: Option<i64>,
    #[schema(example = "Form\nValidation")]
    pub bulk_tasks: String,
}

fn task_bodies(tasks: &[Task]) -> Vec<TaskBody> {
    tasks.iter().map(TaskBody::from).collect()
}

/// Tasks the requester may view.
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(TasksQuery),
    responses(
        (status = 200, description = "Visible tasks", body = [TaskBody]),
        (status = 400, description = "Invalid filter", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "listTasks"
)]
#[get("/tasks")]
pub async fn list_tasks(
    state: web::Data<HttpState>,
    requester: Requester,
    query: web::Query<TasksQuery>,
) -> ApiResult<web::Json<Vec<TaskBody>>> {
    let filter = TaskFilter::from(query.into_inner());
    let tasks = state.services.tasks.list(&requester, &filter).await?;
    Ok(web::Json(task_bodies(&tasks)))
}

/// Create a task.
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTaskBody,
    responses(
        (status = 201, description = "Task created", body = TaskBody),
        (status = 400, description = "Invalid task", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "createTask"
)]
#[post("/tasks")]
pub async fn create_task(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<CreateTaskBody>,
) -> ApiResult<HttpResponse> {
    let task = state
        .services
        .tasks
        .create(&requester, payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(TaskBody::from(&task)))
}

/// Create one task per non-blank line of `bulk_tasks`.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/bulk_create",
    request_body = BulkCreateTasksBody,
    responses(
        (status = 200, description = "Created tasks", body = [TaskBody]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "bulkCreateTasks"
)]
#[post("/tasks/bulk_create")]
pub async fn bulk_create_tasks(
    state: web::Data<HttpState>,
    requester: Requester,
    payload: web::Json<BulkCreateTasksBody>,
) -> ApiResult<web::Json<Vec<TaskBody>>> {
    let BulkCreateTasksBody {
        project_id,
        sprint_id,
        us_id,
        status_id,
        bulk_tasks,
    } = payload.into_inner();
    let tasks = state
        .services
        .tasks
        .bulk_create(
            &requester,
            BulkCreateTasks {
                project: ProjectId::new(project_id),
                milestone: sprint_id.map(MilestoneId::new),
                user_story: us_id.map(UserStoryId::new),
                status: status_id.map(StatusId::new),
                bulk_tasks,
            },
        )
        .await?;
    Ok(web::Json(task_bodies(&tasks)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task", body = TaskBody),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown task", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "getTask"
)]
#[get("/tasks/{id}")]
pub async fn get_task(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<web::Json<TaskBody>> {
    let task = state
        .services
        .tasks
        .retrieve(&requester, TaskId::new(path.into_inner()))
        .await?;
    Ok(web::Json(TaskBody::from(&task)))
}

async fn apply_changes(
    state: &HttpState,
    requester: &Requester,
    id: i64,
    object: Map<String, Value>,
) -> ApiResult<web::Json<TaskBody>> {
    let changes = TaskChanges::from(Patch::<TaskPatchBody>::parse(object)?);
    let task = state
        .services
        .tasks
        .update(requester, TaskId::new(id), changes)
        .await?;
    Ok(web::Json(TaskBody::from(&task)))
}

/// Replace task fields. Same semantics as `PATCH`.
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskPatchBody,
    responses(
        (status = 200, description = "Updated task", body = TaskBody),
        (status = 400, description = "Invalid version or field", body = Error),
        (status = 409, description = "Version conflict", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "replaceTask"
)]
#[put("/tasks/{id}")]
pub async fn replace_task(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<web::Json<TaskBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Update a task. The body must carry the current `version`.
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskPatchBody,
    responses(
        (status = 200, description = "Updated task", body = TaskBody),
        (status = 400, description = "Invalid version or field", body = Error),
        (status = 409, description = "Version conflict", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "updateTask"
)]
#[patch("/tasks/{id}")]
pub async fn update_task(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
    payload: web::Json<Map<String, Value>>,
) -> ApiResult<web::Json<TaskBody>> {
    apply_changes(&state, &requester, path.into_inner(), payload.into_inner()).await
}

/// Delete a task.
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = i64, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown task", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "deleteTask"
)]
#[delete("/tasks/{id}")]
pub async fn delete_task(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .tasks
        .destroy(&requester, TaskId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
