//! Projects and the statistics derived from their contents.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::permissions::{ANON_PERMISSIONS, ProjectPermission, USER_PERMISSIONS};
use crate::domain::{MilestoneId, ProjectId, StatusId, StatusKind, UserId};

/// Maximum project name length.
pub const PROJECT_NAME_MAX: usize = 250;

/// Project data before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub owner: UserId,
    pub is_private: bool,
    pub anon_permissions: Vec<ProjectPermission>,
    pub public_permissions: Vec<ProjectPermission>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub creation_template: String,
    pub tags: Vec<String>,
    pub created_date: DateTime<Utc>,
}

/// A tracked project.
///
/// ## Invariants
/// - `slug` is unique across projects.
/// - Private projects grant nothing to anonymous or non-member users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub owner: UserId,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub is_private: bool,
    pub anon_permissions: Vec<ProjectPermission>,
    pub public_permissions: Vec<ProjectPermission>,
    pub default_us_status: Option<StatusId>,
    pub default_task_status: Option<StatusId>,
    pub default_issue_status: Option<StatusId>,
    pub total_story_points: Option<i32>,
    pub total_milestones: Option<i32>,
    pub creation_template: String,
    pub tags: Vec<String>,
}

impl Project {
    /// Attach the storage identifier to a new project. Default statuses are
    /// filled in once the template statuses exist.
    pub fn from_new(id: ProjectId, new_project: NewProject) -> Self {
        let NewProject {
            name,
            slug,
            description,
            owner,
            is_private,
            anon_permissions,
            public_permissions,
            total_story_points,
            total_milestones,
            creation_template,
            tags,
            created_date,
        } = new_project;
        Self {
            id,
            name,
            slug,
            description,
            owner,
            created_date,
            modified_date: created_date,
            is_private,
            anon_permissions,
            public_permissions,
            default_us_status: None,
            default_task_status: None,
            default_issue_status: None,
            total_story_points,
            total_milestones,
            creation_template,
            tags,
        }
    }
}

impl Project {
    /// Status new items of `kind` start in.
    pub fn default_status(&self, kind: StatusKind) -> Option<StatusId> {
        match kind {
            StatusKind::UserStory => self.default_us_status,
            StatusKind::Task => self.default_task_status,
            StatusKind::Issue => self.default_issue_status,
        }
    }

    /// Point the default of `kind` at `status`, or clear it.
    pub fn set_default_status(&mut self, kind: StatusKind, status: Option<StatusId>) {
        match kind {
            StatusKind::UserStory => self.default_us_status = status,
            StatusKind::Task => self.default_task_status = status,
            StatusKind::Issue => self.default_issue_status = status,
        }
    }
}

/// Anonymous and public permission lists for a visibility setting.
///
/// Private projects never expose anything. Public projects use the explicit
/// lists when given, otherwise the default anonymous and signed-in sets.
pub fn visibility_permissions(
    is_private: bool,
    anon: Option<Vec<ProjectPermission>>,
    public: Option<Vec<ProjectPermission>>,
) -> (Vec<ProjectPermission>, Vec<ProjectPermission>) {
    if is_private {
        return (Vec::new(), Vec::new());
    }
    (
        anon.unwrap_or_else(|| ANON_PERMISSIONS.to_vec()),
        public.unwrap_or_else(|| USER_PERMISSIONS.to_vec()),
    )
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Progress of one milestone inside the project statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MilestoneProgress {
    #[schema(value_type = i64)]
    pub id: MilestoneId,
    pub name: String,
    pub closed: bool,
    pub total_userstories: usize,
    pub closed_userstories: usize,
}

/// Backlog figures for a project.
///
/// `total_milestones` is the planned count set on the project; `milestones`
/// lists the sprints that actually exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProjectStats {
    pub name: String,
    pub total_milestones: Option<i32>,
    pub total_points: Option<i32>,
    pub total_userstories: usize,
    pub closed_userstories: usize,
    pub open_userstories: usize,
    pub archived_userstories: usize,
    pub milestones: Vec<MilestoneProgress>,
}

/// Issue count for one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    #[schema(value_type = i64)]
    pub id: StatusId,
    pub name: String,
    pub color: String,
    pub count: usize,
}

/// Issue figures for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IssuesStats {
    pub total_issues: usize,
    pub opened_issues: usize,
    pub closed_issues: usize,
    pub issues_per_status: Vec<StatusCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn private_projects_expose_nothing() {
        let (anon, public) =
            visibility_permissions(true, Some(vec![ProjectPermission::ViewProject]), None);
        assert!(anon.is_empty());
        assert!(public.is_empty());
    }

    #[rstest]
    fn public_projects_default_to_standard_sets() {
        let (anon, public) = visibility_permissions(false, None, None);
        assert_eq!(anon, ANON_PERMISSIONS);
        assert_eq!(public, USER_PERMISSIONS);
    }

    #[rstest]
    fn public_projects_keep_explicit_lists() {
        let (anon, public) = visibility_permissions(
            false,
            Some(Vec::new()),
            Some(vec![ProjectPermission::ViewProject]),
        );
        assert!(anon.is_empty());
        assert_eq!(public, [ProjectPermission::ViewProject]);
    }

    #[rstest]
    #[case(StatusKind::UserStory)]
    #[case(StatusKind::Task)]
    #[case(StatusKind::Issue)]
    fn default_statuses_are_kept_per_kind(#[case] kind: StatusKind) {
        let mut project = Project::from_new(
            ProjectId::new(1),
            NewProject {
                name: "Board".to_owned(),
                slug: "board".to_owned(),
                description: String::new(),
                owner: UserId::new(2),
                is_private: false,
                anon_permissions: Vec::new(),
                public_permissions: Vec::new(),
                total_story_points: None,
                total_milestones: None,
                creation_template: "scrum".to_owned(),
                tags: Vec::new(),
                created_date: chrono::Utc::now(),
            },
        );

        project.set_default_status(kind, Some(StatusId::new(9)));

        for other in StatusKind::ALL {
            let expected = (other == kind).then_some(StatusId::new(9));
            assert_eq!(project.default_status(other), expected);
        }
    }

    #[rstest]
    fn tags_are_trimmed_lowercased_and_deduplicated() {
        let tags = normalize_tags(["Bug ".to_owned(), "bug".to_owned(), String::new(), "ui".to_owned()]);
        assert_eq!(tags, ["bug", "ui"]);
    }
}
