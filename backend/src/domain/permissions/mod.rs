//! Project permissions and the composable checks built on top of them.
//!
//! A request is authorised in two steps. First the requester's effective
//! permissions on a project are resolved into a [`ProjectAccess`]. Then the
//! [`ResourcePermission`] table for the resource picks the
//! [`PermissionComponent`] guarding the requested action and evaluates it
//! against a [`PermissionContext`].

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Membership, Project, Role, User, UserId};

mod components;
mod operators;
mod resources;

pub use components::{
    AllowAny, DenyAll, HasProjectPerm, IsAuthenticated, IsCommentDeleter, IsCommentOwner,
    IsObjectOwner, IsProjectOwner, IsSuperUser, IsTheSameUser,
};
pub use operators::{And, Not, Or, PermissionComponent};
pub use resources::{ResourcePermission, rules};

/// Named permission a role or a project visibility level can grant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPermission {
    /// See the project and its settings.
    ViewProject,
    /// Ask to join the project.
    RequestMembership,
    /// Read user stories.
    ViewUs,
    /// Create user stories.
    AddUs,
    /// Create user stories in bulk.
    AddUsToProject,
    /// Edit user stories.
    ModifyUs,
    /// Delete user stories.
    DeleteUs,
    /// Comment on user stories.
    AddCommentsToUs,
    /// Read issues.
    ViewIssues,
    /// Create issues.
    AddIssue,
    /// Edit issues.
    ModifyIssue,
    /// Delete issues.
    DeleteIssue,
    /// Vote on issues.
    VoteIssues,
    /// Comment on issues.
    AddCommentsIssue,
    /// Read milestones and their statistics.
    ViewMilestones,
    /// Create milestones.
    AddMilestone,
    /// Edit milestones.
    ModifyMilestone,
    /// Delete milestones.
    DeleteMilestone,
    /// Read tasks.
    ViewTasks,
    /// Create tasks, one by one or in bulk.
    AddTask,
    /// Edit tasks.
    ModifyTask,
    /// Delete tasks.
    DeleteTask,
    /// Read wiki pages.
    ViewWikiPages,
    /// Read wiki links.
    ViewWikiLinks,
    /// Edit project settings.
    ModifyProject,
    /// Invite members.
    AddMember,
    /// Remove members.
    RemoveMember,
    /// Delete the project.
    DeleteProject,
    /// Manage statuses and other project values.
    AdminProjectValues,
    /// Manage roles.
    AdminRoles,
}

impl ProjectPermission {
    /// Every permission, in declaration order.
    pub const ALL: [Self; 30] = [
        Self::ViewProject,
        Self::RequestMembership,
        Self::ViewUs,
        Self::AddUs,
        Self::AddUsToProject,
        Self::ModifyUs,
        Self::DeleteUs,
        Self::AddCommentsToUs,
        Self::ViewIssues,
        Self::AddIssue,
        Self::ModifyIssue,
        Self::DeleteIssue,
        Self::VoteIssues,
        Self::AddCommentsIssue,
        Self::ViewMilestones,
        Self::AddMilestone,
        Self::ModifyMilestone,
        Self::DeleteMilestone,
        Self::ViewTasks,
        Self::AddTask,
        Self::ModifyTask,
        Self::DeleteTask,
        Self::ViewWikiPages,
        Self::ViewWikiLinks,
        Self::ModifyProject,
        Self::AddMember,
        Self::RemoveMember,
        Self::DeleteProject,
        Self::AdminProjectValues,
        Self::AdminRoles,
    ];

    /// Wire and storage name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewProject => "view_project",
            Self::RequestMembership => "request_membership",
            Self::ViewUs => "view_us",
            Self::AddUs => "add_us",
            Self::AddUsToProject => "add_us_to_project",
            Self::ModifyUs => "modify_us",
            Self::DeleteUs => "delete_us",
            Self::AddCommentsToUs => "add_comments_to_us",
            Self::ViewIssues => "view_issues",
            Self::AddIssue => "add_issue",
            Self::ModifyIssue => "modify_issue",
            Self::DeleteIssue => "delete_issue",
            Self::VoteIssues => "vote_issues",
            Self::AddCommentsIssue => "add_comments_issue",
            Self::ViewMilestones => "view_milestones",
            Self::AddMilestone => "add_milestone",
            Self::ModifyMilestone => "modify_milestone",
            Self::DeleteMilestone => "delete_milestone",
            Self::ViewTasks => "view_tasks",
            Self::AddTask => "add_task",
            Self::ModifyTask => "modify_task",
            Self::DeleteTask => "delete_task",
            Self::ViewWikiPages => "view_wiki_pages",
            Self::ViewWikiLinks => "view_wiki_links",
            Self::ModifyProject => "modify_project",
            Self::AddMember => "add_member",
            Self::RemoveMember => "remove_member",
            Self::DeleteProject => "delete_project",
            Self::AdminProjectValues => "admin_project_values",
            Self::AdminRoles => "admin_roles",
        }
    }
}

impl fmt::Display for ProjectPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when parsing an unknown permission name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl FromStr for ProjectPermission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|perm| perm.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_owned()))
    }
}

use ProjectPermission as P;

/// Granted to anyone, signed in or not, on a public project.
pub const ANON_PERMISSIONS: &[ProjectPermission] = &[
    P::ViewProject,
    P::ViewMilestones,
    P::ViewUs,
    P::ViewTasks,
    P::ViewIssues,
    P::ViewWikiPages,
    P::ViewWikiLinks,
];

/// Granted to signed-in non-members on a public project.
pub const USER_PERMISSIONS: &[ProjectPermission] = &[
    P::ViewProject,
    P::ViewMilestones,
    P::ViewUs,
    P::ViewTasks,
    P::ViewIssues,
    P::ViewWikiPages,
    P::ViewWikiLinks,
    P::RequestMembership,
    P::AddUsToProject,
    P::AddCommentsToUs,
    P::AddIssue,
    P::AddCommentsIssue,
    P::VoteIssues,
];

/// Everything a regular member role may hold.
pub const MEMBERS_PERMISSIONS: &[ProjectPermission] = &[
    P::ViewProject,
    P::ViewMilestones,
    P::AddMilestone,
    P::ModifyMilestone,
    P::DeleteMilestone,
    P::ViewUs,
    P::AddUs,
    P::ModifyUs,
    P::DeleteUs,
    P::AddCommentsToUs,
    P::ViewTasks,
    P::AddTask,
    P::ModifyTask,
    P::DeleteTask,
    P::ViewIssues,
    P::AddIssue,
    P::ModifyIssue,
    P::DeleteIssue,
    P::VoteIssues,
    P::AddCommentsIssue,
    P::ViewWikiPages,
    P::ViewWikiLinks,
];

/// Administrative permissions reserved for project owners.
pub const ADMINS_PERMISSIONS: &[ProjectPermission] = &[
    P::ModifyProject,
    P::AddMember,
    P::RemoveMember,
    P::DeleteProject,
    P::AdminProjectValues,
    P::AdminRoles,
];

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Requester {
    /// No valid credentials were supplied.
    #[default]
    Anonymous,
    /// A signed-in user.
    User(Box<User>),
}

impl Requester {
    /// Wrap an authenticated user.
    pub fn user(user: User) -> Self {
        Self::User(Box::new(user))
    }

    /// The authenticated user, if any.
    pub fn as_user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    /// Id of the authenticated user; `None` when anonymous.
    pub fn id(&self) -> Option<UserId> {
        self.as_user().map(|user| user.id)
    }

    /// `true` for any signed-in user.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// `true` only for a signed-in superuser.
    pub fn is_superuser(&self) -> bool {
        self.as_user().is_some_and(|user| user.is_superuser)
    }
}

/// A requester's effective rights on one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAccess {
    is_admin: bool,
    permissions: BTreeSet<ProjectPermission>,
}

impl ProjectAccess {
    /// Resolve the rights of `requester` on `project`.
    ///
    /// `membership` is the requester's membership in the project together with
    /// its role, when one exists.
    pub fn resolve(
        requester: &Requester,
        project: &Project,
        membership: Option<(&Membership, &Role)>,
    ) -> Self {
        let is_admin = requester.is_superuser()
            || requester.id() == Some(project.owner)
            || membership.is_some_and(|(membership, _)| membership.is_owner);
        Self {
            is_admin,
            permissions: user_project_permissions(requester, project, membership),
        }
    }

    /// Superuser, project owner or owner member.
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Whether `permission` was granted.
    pub fn has(&self, permission: ProjectPermission) -> bool {
        self.permissions.contains(&permission)
    }

    /// A project is visible when the requester may view it.
    pub fn is_visible(&self) -> bool {
        self.has(ProjectPermission::ViewProject)
    }

    /// Every granted permission, sorted.
    pub fn permissions(&self) -> &BTreeSet<ProjectPermission> {
        &self.permissions
    }
}

/// Compute the permissions `requester` holds on `project`.
///
/// Superusers and the project owner hold everything. Members add their role's
/// permissions (and the admin set when they are owner members) to the public
/// ones; other signed-in users get the public set, anonymous users only the
/// anonymous set.
pub fn user_project_permissions(
    requester: &Requester,
    project: &Project,
    membership: Option<(&Membership, &Role)>,
) -> BTreeSet<ProjectPermission> {
    let mut permissions: BTreeSet<ProjectPermission> =
        project.anon_permissions.iter().copied().collect();
    let Some(user) = requester.as_user() else {
        return permissions;
    };
    permissions.extend(project.public_permissions.iter().copied());

    if user.is_superuser || user.id == project.owner {
        permissions.extend(ADMINS_PERMISSIONS.iter().copied());
        permissions.extend(MEMBERS_PERMISSIONS.iter().copied());
        return permissions;
    }

    if let Some((membership, role)) = membership {
        permissions.extend(role.permissions.iter().copied());
        if membership.is_owner {
            permissions.extend(ADMINS_PERMISSIONS.iter().copied());
        }
    }
    permissions
}

/// Facts a permission component may inspect.
#[derive(Debug, Clone, Copy)]
pub struct PermissionContext<'a> {
    requester: &'a Requester,
    project: Option<&'a ProjectAccess>,
    object_owner: Option<UserId>,
    comment_owner: Option<UserId>,
    comment_deleter: Option<UserId>,
    target_user: Option<UserId>,
}

impl<'a> PermissionContext<'a> {
    /// A context carrying only the requester.
    pub fn new(requester: &'a Requester) -> Self {
        Self {
            requester,
            project: None,
            object_owner: None,
            comment_owner: None,
            comment_deleter: None,
            target_user: None,
        }
    }

    /// Attach the requester's resolved access to the object's project.
    #[must_use]
    pub fn with_project(mut self, access: &'a ProjectAccess) -> Self {
        self.project = Some(access);
        self
    }

    /// Record who owns the object being acted on.
    #[must_use]
    pub fn with_object_owner(mut self, owner: Option<UserId>) -> Self {
        self.object_owner = owner;
        self
    }

    /// Record who wrote the comment being acted on.
    #[must_use]
    pub fn with_comment_owner(mut self, owner: Option<UserId>) -> Self {
        self.comment_owner = owner;
        self
    }

    /// Record who deleted the comment, if anyone did.
    #[must_use]
    pub fn with_comment_deleter(mut self, deleter: Option<UserId>) -> Self {
        self.comment_deleter = deleter;
        self
    }

    /// Record the user a `/users/{id}` request targets.
    #[must_use]
    pub fn with_target_user(mut self, user: UserId) -> Self {
        self.target_user = Some(user);
        self
    }

    /// Who is asking.
    pub fn requester(&self) -> &'a Requester {
        self.requester
    }

    /// Access on the object's project; `None` for project-less resources.
    pub fn project(&self) -> Option<&'a ProjectAccess> {
        self.project
    }

    /// Owner of the object, when known.
    pub fn object_owner(&self) -> Option<UserId> {
        self.object_owner
    }

    /// Author of the comment, when known.
    pub fn comment_owner(&self) -> Option<UserId> {
        self.comment_owner
    }

    /// Who deleted the comment, when it was deleted.
    pub fn comment_deleter(&self) -> Option<UserId> {
        self.comment_deleter
    }

    /// User targeted by the request, when any.
    pub fn target_user(&self) -> Option<UserId> {
        self.target_user
    }
}
