//! Project templates: the statuses and roles a new project starts with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::permissions::{MEMBERS_PERMISSIONS, ProjectPermission};
use crate::domain::{Role, Status, StatusKind};

/// Template used when a project does not name one.
pub const DEFAULT_TEMPLATE: &str = "scrum";

/// Status blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusTemplate {
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub is_closed: bool,
    pub color: String,
}

/// Role blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleTemplate {
    pub name: String,
    pub slug: String,
    pub order: i32,
    pub computable: bool,
    pub permissions: Vec<ProjectPermission>,
}

/// Blueprint applied when creating a project.
///
/// The `default_*` fields name entries of the matching list by slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProjectTemplate {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_date: Option<DateTime<Utc>>,
    pub default_owner_role: String,
    pub default_us_status: String,
    #[serde(default)]
    pub default_task_status: String,
    pub default_issue_status: String,
    pub us_statuses: Vec<StatusTemplate>,
    #[serde(default)]
    pub task_statuses: Vec<StatusTemplate>,
    pub issue_statuses: Vec<StatusTemplate>,
    pub roles: Vec<RoleTemplate>,
}

fn status(name: &str, order: i32, is_closed: bool, color: &str) -> StatusTemplate {
    StatusTemplate {
        name: name.to_owned(),
        slug: crate::domain::slugify(name),
        order,
        is_closed,
        color: color.to_owned(),
    }
}

fn role(name: &str, order: i32, computable: bool, permissions: &[ProjectPermission]) -> RoleTemplate {
    RoleTemplate {
        name: name.to_owned(),
        slug: crate::domain::slugify(name),
        order,
        computable,
        permissions: permissions.to_vec(),
    }
}

fn standard_roles() -> Vec<RoleTemplate> {
    use ProjectPermission as P;
    let stakeholder = [
        P::ViewProject,
        P::ViewMilestones,
        P::ViewUs,
        P::ViewTasks,
        P::ViewIssues,
        P::AddIssue,
        P::ModifyIssue,
        P::VoteIssues,
        P::AddCommentsIssue,
        P::AddCommentsToUs,
        P::ViewWikiPages,
        P::ViewWikiLinks,
    ];
    vec![
        role("UX", 10, true, MEMBERS_PERMISSIONS),
        role("Design", 20, true, MEMBERS_PERMISSIONS),
        role("Front", 30, true, MEMBERS_PERMISSIONS),
        role("Back", 40, true, MEMBERS_PERMISSIONS),
        role("Product Owner", 50, false, MEMBERS_PERMISSIONS),
        role("Stakeholder", 60, false, &stakeholder),
    ]
}

fn standard_task_statuses() -> Vec<StatusTemplate> {
    vec![
        status("New", 1, false, "#999999"),
        status("In progress", 2, false, "#ff9900"),
        status("Ready for test", 3, true, "#ffcc00"),
        status("Closed", 4, true, "#669900"),
        status("Needs Info", 5, false, "#999999"),
    ]
}

fn standard_issue_statuses() -> Vec<StatusTemplate> {
    vec![
        status("New", 1, false, "#8C2318"),
        status("In progress", 2, false, "#5E8C6A"),
        status("Ready for test", 3, true, "#88A65E"),
        status("Closed", 4, true, "#BFB35A"),
        status("Needs Info", 5, false, "#89BAB4"),
        status("Rejected", 6, true, "#CC0000"),
        status("Postponed", 7, false, "#666666"),
    ]
}

impl ProjectTemplate {
    /// Iterative backlog with sprints.
    pub fn scrum() -> Self {
        Self {
            slug: "scrum".to_owned(),
            name: "Scrum".to_owned(),
            description: "Backlog and sprint planning for iterative teams.".to_owned(),
            created_date: None,
            default_owner_role: "product-owner".to_owned(),
            default_us_status: "new".to_owned(),
            default_task_status: "new".to_owned(),
            default_issue_status: "new".to_owned(),
            us_statuses: vec![
                status("New", 1, false, "#999999"),
                status("Ready", 2, false, "#ff8a84"),
                status("In progress", 3, false, "#ff9900"),
                status("Ready for test", 4, false, "#fcc000"),
                status("Done", 5, true, "#669900"),
                status("Archived", 6, true, "#5c3566"),
            ],
            task_statuses: standard_task_statuses(),
            issue_statuses: standard_issue_statuses(),
            roles: standard_roles(),
        }
    }

    /// Continuous flow board.
    pub fn kanban() -> Self {
        Self {
            slug: "kanban".to_owned(),
            name: "Kanban".to_owned(),
            description: "Continuous flow with work-in-progress columns.".to_owned(),
            created_date: None,
            default_owner_role: "product-owner".to_owned(),
            default_us_status: "new".to_owned(),
            default_task_status: "new".to_owned(),
            default_issue_status: "new".to_owned(),
            us_statuses: vec![
                status("New", 1, false, "#999999"),
                status("Ready", 2, false, "#f57900"),
                status("In progress", 3, false, "#729fcf"),
                status("Ready for test", 4, false, "#4e9a06"),
                status("Done", 5, true, "#cc0000"),
                status("Archived", 6, true, "#5c3566"),
            ],
            task_statuses: standard_task_statuses(),
            issue_statuses: standard_issue_statuses(),
            roles: standard_roles(),
        }
    }

    /// Templates shipped with the service.
    pub fn builtin() -> Vec<Self> {
        vec![Self::scrum(), Self::kanban()]
    }

    /// Status blueprints of `kind`.
    pub fn statuses(&self, kind: StatusKind) -> &[StatusTemplate] {
        match kind {
            StatusKind::UserStory => &self.us_statuses,
            StatusKind::Task => &self.task_statuses,
            StatusKind::Issue => &self.issue_statuses,
        }
    }

    /// Slug of the default status of `kind`.
    pub fn default_status(&self, kind: StatusKind) -> &str {
        match kind {
            StatusKind::UserStory => &self.default_us_status,
            StatusKind::Task => &self.default_task_status,
            StatusKind::Issue => &self.default_issue_status,
        }
    }

    /// Capture the configuration of an existing project.
    ///
    /// Defaults fall back to the first entry of each list when the project
    /// default is missing.
    pub fn from_project_values(
        header: TemplateHeader,
        defaults: TemplateDefaults<'_>,
        us_statuses: &[Status],
        task_statuses: &[Status],
        issue_statuses: &[Status],
        roles: &[Role],
    ) -> Self {
        let to_status = |status: &Status| StatusTemplate {
            name: status.name.clone(),
            slug: status.slug.clone(),
            order: status.order,
            is_closed: status.is_closed,
            color: status.color.clone(),
        };
        let pick = |preferred: Option<&str>, list: &[StatusTemplate]| {
            preferred
                .map(str::to_owned)
                .or_else(|| list.first().map(|s| s.slug.clone()))
                .unwrap_or_default()
        };
        let us_statuses: Vec<_> = us_statuses.iter().map(to_status).collect();
        let task_statuses: Vec<_> = task_statuses.iter().map(to_status).collect();
        let issue_statuses: Vec<_> = issue_statuses.iter().map(to_status).collect();
        let roles: Vec<_> = roles
            .iter()
            .map(|role| RoleTemplate {
                name: role.name.clone(),
                slug: role.slug.clone(),
                order: role.order,
                computable: role.computable,
                permissions: role.permissions.clone(),
            })
            .collect();
        Self {
            default_us_status: pick(defaults.us_status, &us_statuses),
            default_task_status: pick(defaults.task_status, &task_statuses),
            default_issue_status: pick(defaults.issue_status, &issue_statuses),
            default_owner_role: defaults
                .owner_role
                .map(str::to_owned)
                .or_else(|| roles.last().map(|r| r.slug.clone()))
                .unwrap_or_default(),
            slug: header.slug,
            name: header.name,
            description: header.description,
            created_date: Some(header.created_date),
            us_statuses,
            task_statuses,
            issue_statuses,
            roles,
        }
    }
}

/// Identity of a template captured from a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateHeader {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_date: DateTime<Utc>,
}

/// Slugs of the defaults a captured template should carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDefaults<'a> {
    pub owner_role: Option<&'a str>,
    pub us_status: Option<&'a str>,
    pub task_status: Option<&'a str>,
    pub issue_status: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ProjectTemplate::scrum())]
    #[case(ProjectTemplate::kanban())]
    fn builtin_defaults_reference_existing_entries(#[case] template: ProjectTemplate) {
        assert!(template.roles.iter().any(|r| r.slug == template.default_owner_role));
        for kind in StatusKind::ALL {
            let default = template.default_status(kind);
            assert!(
                template.statuses(kind).iter().any(|s| s.slug == default),
                "missing default {kind} status"
            );
        }
    }

    #[rstest]
    fn templates_stored_before_task_statuses_still_decode() {
        let mut value = serde_json::to_value(ProjectTemplate::scrum()).expect("encode");
        let object = value.as_object_mut().expect("object");
        object.remove("task_statuses");
        object.remove("default_task_status");

        let decoded: ProjectTemplate = serde_json::from_value(value).expect("decode");
        assert!(decoded.task_statuses.is_empty());
        assert!(decoded.default_task_status.is_empty());
    }

    #[rstest]
    fn status_slugs_are_derived_from_names() {
        let template = ProjectTemplate::scrum();
        let slugs: Vec<_> = template.us_statuses.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(
            slugs,
            ["new", "ready", "in-progress", "ready-for-test", "done", "archived"]
        );
    }
}
