//! History API handlers.
//!
//! ```text
//! GET  /api/v1/history/{userstory|issue}/{id}
//! POST /api/v1/history/{userstory|issue}/{id}/delete_comment?id={entry}
//! POST /api/v1/history/{userstory|issue}/{id}/undelete_comment?id={entry}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::domain::{Error, HistoryTarget, Requester};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::HistoryEntryBody;
use crate::inbound::http::state::HttpState;

/// Selects the history entry holding the comment.
#[derive(Debug, Deserialize, IntoParams)]
pub struct EntryQuery {
    pub id: Uuid,
}

fn target(path: web::Path<(String, i64)>) -> Result<HistoryTarget, Error> {
    let (content_type, id) = path.into_inner();
    HistoryTarget::from_path(&content_type, id).ok_or_else(|| Error::not_found("Not found"))
}

/// History of one item, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/history/{content_type}/{id}",
    params(
        ("content_type" = String, Path, description = "`userstory`, `task` or `issue`"),
        ("id" = i64, Path, description = "Object id")
    ),
    responses(
        (status = 200, description = "History, oldest first", body = [HistoryEntryBody]),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown object", body = Error)
    ),
    tags = ["history"],
    operation_id = "listHistory"
)]
#[get("/history/{content_type}/{id}")]
pub async fn list_history(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<(String, i64)>,
) -> ApiResult<web::Json<Vec<HistoryEntryBody>>> {
    let entries = state.services.history.list(&requester, target(path)?).await?;
    Ok(web::Json(entries.iter().map(HistoryEntryBody::from).collect()))
}

/// Hide a comment. Allowed to the project owner and the comment's author.
#[utoipa::path(
    post,
    path = "/api/v1/history/{content_type}/{id}/delete_comment",
    params(
        ("content_type" = String, Path, description = "`userstory`, `task` or `issue`"),
        ("id" = i64, Path, description = "Object id"),
        EntryQuery
    ),
    responses(
        (status = 204, description = "Comment hidden"),
        (status = 400, description = "Entry has no comment", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown entry", body = Error)
    ),
    tags = ["history"],
    operation_id = "deleteHistoryComment"
)]
#[post("/history/{content_type}/{id}/delete_comment")]
pub async fn delete_comment(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<(String, i64)>,
    query: web::Query<EntryQuery>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .history
        .delete_comment(&requester, target(path)?, query.id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Restore a hidden comment. Allowed to the project owner and whoever hid it.
#[utoipa::path(
    post,
    path = "/api/v1/history/{content_type}/{id}/undelete_comment",
    params(
        ("content_type" = String, Path, description = "`userstory`, `task` or `issue`"),
        ("id" = i64, Path, description = "Object id"),
        EntryQuery
    ),
    responses(
        (status = 204, description = "Comment restored"),
        (status = 400, description = "Entry has no comment", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Unknown entry", body = Error)
    ),
    tags = ["history"],
    operation_id = "undeleteHistoryComment"
)]
#[post("/history/{content_type}/{id}/undelete_comment")]
pub async fn undelete_comment(
    state: web::Data<HttpState>,
    requester: Requester,
    path: web::Path<(String, i64)>,
    query: web::Query<EntryQuery>,
) -> ApiResult<HttpResponse> {
    state
        .services
        .history
        .undelete_comment(&requester, target(path)?, query.id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
