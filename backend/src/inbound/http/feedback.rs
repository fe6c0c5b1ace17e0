//! Feedback API handler.
//!
//! ```text
//! POST /api/v1/feedback {"comment":"..."}
//! ```

use actix_web::http::header::{HOST, HeaderMap, HeaderName, REFERER, USER_AGENT};
use actix_web::{HttpRequest, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, FeedbackContext, Requester};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::FeedbackBody;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct FeedbackRequest {
    #[schema(example = "The backlog is lovely")]
    pub comment: String,
}

fn header(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn context(request: &HttpRequest) -> FeedbackContext {
    let headers = request.headers();
    FeedbackContext {
        host: header(headers, HOST),
        referer: header(headers, REFERER),
        user_agent: header(headers, USER_AGENT),
    }
}

/// Send feedback to the operators; the request's host, referer and user agent
/// travel with it.
#[utoipa::path(
    post,
    path = "/api/v1/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback stored", body = FeedbackBody),
        (status = 400, description = "Empty comment or feedback disabled", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["feedback"],
    operation_id = "sendFeedback"
)]
#[post("/feedback")]
pub async fn send_feedback(
    state: web::Data<HttpState>,
    requester: Requester,
    request: HttpRequest,
    payload: web::Json<FeedbackRequest>,
) -> ApiResult<web::Json<FeedbackBody>> {
    let entry = state
        .services
        .feedback
        .create(&requester, &payload.comment, &context(&request))
        .await?;
    Ok(web::Json(FeedbackBody::from(&entry)))
}
