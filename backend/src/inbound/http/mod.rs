//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod error;
pub mod feedback;
pub mod health;
pub mod history;
pub mod issues;
pub mod memberships;
pub mod milestones;
pub mod projects;
pub mod requester;
pub mod roles;
pub mod schemas;
pub mod session;
pub mod state;
pub mod statuses;
pub mod tasks;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod userstories;
pub mod validation;

pub use error::ApiResult;

use actix_web::web;

/// Register every `/api/v1` handler on `cfg`.
///
/// Literal segments such as `/users/me` are registered before the `{id}`
/// routes sharing their prefix.
pub fn api_services(cfg: &mut web::ServiceConfig) {
    cfg.service(auth::login)
        .service(auth::register)
        .service(users::list_users)
        .service(users::current_user)
        .service(users::password_recovery)
        .service(users::change_password_from_recovery)
        .service(users::change_password)
        .service(users::change_email)
        .service(users::cancel_account)
        .service(users::get_user)
        .service(users::update_user)
        .service(users::delete_user)
        .service(users::starred_projects)
        .service(projects::list_projects)
        .service(projects::create_project)
        .service(projects::project_by_slug)
        .service(projects::get_project)
        .service(projects::replace_project)
        .service(projects::update_project)
        .service(projects::delete_project)
        .service(projects::project_stats)
        .service(projects::project_issues_stats)
        .service(projects::star_project)
        .service(projects::unstar_project)
        .service(projects::project_fans)
        .service(projects::create_project_template)
        .service(projects::list_project_templates)
        .service(projects::get_project_template)
        .service(memberships::list_memberships)
        .service(memberships::create_membership)
        .service(memberships::bulk_create_memberships)
        .service(memberships::get_membership)
        .service(memberships::update_membership)
        .service(memberships::delete_membership)
        .service(memberships::resend_invitation)
        .service(memberships::list_invitations)
        .service(memberships::get_invitation)
        .service(roles::list_roles)
        .service(roles::create_role)
        .service(roles::get_role)
        .service(roles::update_role)
        .service(roles::delete_role)
        .service(statuses::list_statuses)
        .service(statuses::create_status)
        .service(statuses::bulk_update_status_order)
        .service(statuses::get_status)
        .service(statuses::update_status)
        .service(statuses::delete_status)
        .service(milestones::list_milestones)
        .service(milestones::create_milestone)
        .service(milestones::milestone_stats)
        .service(milestones::get_milestone)
        .service(milestones::update_milestone)
        .service(milestones::delete_milestone)
        .service(userstories::list_user_stories)
        .service(userstories::create_user_story)
        .service(userstories::user_story_by_ref)
        .service(userstories::bulk_create_user_stories)
        .service(userstories::bulk_update_user_story_order)
        .service(userstories::get_user_story)
        .service(userstories::replace_user_story)
        .service(userstories::update_user_story)
        .service(userstories::delete_user_story)
        .service(tasks::list_tasks)
        .service(tasks::create_task)
        .service(tasks::bulk_create_tasks)
        .service(tasks::get_task)
        .service(tasks::replace_task)
        .service(tasks::update_task)
        .service(tasks::delete_task)
        .service(issues::list_issues)
        .service(issues::create_issue)
        .service(issues::get_issue)
        .service(issues::replace_issue)
        .service(issues::update_issue)
        .service(issues::delete_issue)
        .service(issues::upvote_issue)
        .service(issues::downvote_issue)
        .service(issues::issue_voters)
        .service(history::list_history)
        .service(history::delete_comment)
        .service(history::undelete_comment)
        .service(feedback::send_feedback);
}
