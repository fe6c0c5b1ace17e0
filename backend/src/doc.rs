//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler plus the health checks. Both
//! authentication schemes are declared: the `session` cookie set by
//! `POST /api/v1/auth` and the bearer token returned alongside it.
//!
//! The generated specification is served by Swagger UI in debug builds and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, HistoryKind, HistoryUser, ProjectPermission, ProjectTemplate};
use crate::inbound::http::{
    auth, feedback, health, history, issues, memberships, milestones, projects, roles, schemas,
    statuses, tasks, users, userstories,
};

/// Enrich the generated document with the security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/auth.",
            ))),
        );
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Tracker backend API",
        description = "Agile project tracking: projects, memberships, backlogs, sprints and issues."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = []), ("Bearer" = [])),
    paths(
        auth::login,
        auth::register,
        users::list_users,
        users::current_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::starred_projects,
        users::password_recovery,
        users::change_password_from_recovery,
        users::change_password,
        users::change_email,
        users::cancel_account,
        projects::list_projects,
        projects::create_project,
        projects::project_by_slug,
        projects::get_project,
        projects::replace_project,
        projects::update_project,
        projects::delete_project,
        projects::project_stats,
        projects::project_issues_stats,
        projects::star_project,
        projects::unstar_project,
        projects::project_fans,
        projects::create_project_template,
        projects::list_project_templates,
        projects::get_project_template,
        memberships::list_memberships,
        memberships::create_membership,
        memberships::bulk_create_memberships,
        memberships::get_membership,
        memberships::update_membership,
        memberships::delete_membership,
        memberships::resend_invitation,
        memberships::list_invitations,
        memberships::get_invitation,
        roles::list_roles,
        roles::create_role,
        roles::get_role,
        roles::update_role,
        roles::delete_role,
        statuses::list_statuses,
        statuses::create_status,
        statuses::bulk_update_status_order,
        statuses::get_status,
        statuses::update_status,
        statuses::delete_status,
        milestones::list_milestones,
        milestones::create_milestone,
        milestones::milestone_stats,
        milestones::get_milestone,
        milestones::update_milestone,
        milestones::delete_milestone,
        userstories::list_user_stories,
        userstories::create_user_story,
        userstories::user_story_by_ref,
        userstories::bulk_create_user_stories,
        userstories::bulk_update_user_story_order,
        userstories::get_user_story,
        userstories::replace_user_story,
        userstories::update_user_story,
        userstories::delete_user_story,
        tasks::list_tasks,
        tasks::create_task,
        tasks::bulk_create_tasks,
        tasks::get_task,
        tasks::replace_task,
        tasks::update_task,
        tasks::delete_task,
        issues::list_issues,
        issues::create_issue,
        issues::get_issue,
        issues::replace_issue,
        issues::update_issue,
        issues::delete_issue,
        issues::upvote_issue,
        issues::downvote_issue,
        issues::issue_voters,
        history::list_history,
        history::delete_comment,
        history::undelete_comment,
        feedback::send_feedback,
        health::ready,
        health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        ProjectPermission,
        ProjectTemplate,
        HistoryKind,
        HistoryUser,
        schemas::UserBody,
        schemas::AuthenticatedUserBody,
        schemas::ProjectBody,
        schemas::ProjectDetailBody,
        schemas::RoleBody,
        schemas::MembershipBody,
        schemas::InvitationBody,
        schemas::StatusBody,
        schemas::MilestoneBody,
        schemas::UserStoryBody,
        schemas::TaskBody,
        schemas::IssueBody,
        schemas::HistoryEntryBody,
        schemas::FeedbackBody,
        schemas::DetailBody,
        health::HealthBody,
        health::StorageBackend,
    )),
    tags(
        (name = "auth", description = "Login and registration"),
        (name = "users", description = "Profiles and account management"),
        (name = "projects", description = "Projects, stars and templates"),
        (name = "memberships", description = "Project members and invitations"),
        (name = "roles", description = "Project roles and their permissions"),
        (name = "statuses", description = "User-story, task and issue statuses"),
        (name = "milestones", description = "Sprints and their burndown"),
        (name = "userstories", description = "Backlog items"),
        (name = "tasks", description = "Sprint breakdown of user stories"),
        (name = "issues", description = "Bugs, questions and enhancements"),
        (name = "history", description = "Change history and comments"),
        (name = "feedback", description = "Feedback to the operators"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the OpenAPI document structure.

    use super::*;
    use crate::test_support::openapi::{get_property, unwrap_object_schema};
    use rstest::rstest;
    use utoipa::openapi::PathItem;

    fn path<'a>(doc: &'a utoipa::openapi::OpenApi, route: &str) -> &'a PathItem {
        doc.paths
            .paths
            .get(route)
            .unwrap_or_else(|| panic!("path {route} should be documented"))
    }

    #[rstest]
    #[case("/api/v1/auth")]
    #[case("/api/v1/projects/{id}")]
    #[case("/api/v1/memberships/bulk_create")]
    #[case("/api/v1/{kind}-statuses/bulk_update_order")]
    #[case("/api/v1/userstories/bulk_update_{field}_order")]
    #[case("/api/v1/milestones/{id}/stats")]
    #[case("/api/v1/tasks/bulk_create")]
    #[case("/api/v1/issues/{id}/voters")]
    #[case("/api/v1/history/{content_type}/{id}/delete_comment")]
    #[case("/api/v1/feedback")]
    #[case("/health/ready")]
    fn routes_are_documented(#[case] route: &str) {
        let doc = ApiDoc::openapi();
        path(&doc, route);
    }

    #[rstest]
    fn user_story_updates_document_all_verbs() {
        let doc = ApiDoc::openapi();
        let item = path(&doc, "/api/v1/userstories/{id}");
        assert!(item.get.is_some());
        assert!(item.put.is_some());
        assert!(item.patch.is_some());
        assert!(item.delete.is_some());
    }

    #[rstest]
    #[case("Error", &["code", "message", "traceId", "details"][..])]
    #[case("UserStoryBody", &["id", "ref", "version", "backlog_order"][..])]
    #[case("IssueBody", &["id", "ref", "votes"][..])]
    #[case("MilestoneBody", &["id", "slug", "estimated_start", "estimated_finish"][..])]
    #[case("TaskBody", &["id", "ref", "user_story", "milestone", "is_iocaine"][..])]
    fn schemas_expose_their_fields(#[case] name: &str, #[case] fields: &[&str]) {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let schema = schemas
            .get(name)
            .unwrap_or_else(|| panic!("{name} schema should be registered"));
        let object = unwrap_object_schema(schema, name);
        for field in fields {
            get_property(object, field);
        }
    }

    #[rstest]
    fn both_security_schemes_are_declared() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
        assert!(components.security_schemes.contains_key("Bearer"));
    }
}
