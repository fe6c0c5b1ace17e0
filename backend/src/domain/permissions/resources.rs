//! Per-resource action tables.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::Error;

use super::{PermissionComponent, PermissionContext};

/// Maps the actions of one resource to the component guarding them.
///
/// Actions without a rule are denied.
pub struct ResourcePermission {
    resource: &'static str,
    actions: HashMap<&'static str, Arc<dyn PermissionComponent>>,
}

impl std::fmt::Debug for ResourcePermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("ResourcePermission")
            .field("resource", &self.resource)
            .field("actions", &actions)
            .finish()
    }
}

impl ResourcePermission {
    /// Empty table for `resource`; every action is denied until a rule
    /// covers it.
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            actions: HashMap::new(),
        }
    }

    /// Guard every action in `actions` with `component`.
    #[must_use]
    pub fn rule(
        mut self,
        actions: &[&'static str],
        component: impl PermissionComponent + 'static,
    ) -> Self {
        let component: Arc<dyn PermissionComponent> = Arc::new(component);
        for action in actions {
            self.actions.insert(action, Arc::clone(&component));
        }
        self
    }

    /// Resource name used in denial logs.
    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Evaluate the rule for `action`.
    pub fn is_allowed(&self, action: &str, ctx: &PermissionContext<'_>) -> bool {
        self.actions
            .get(action)
            .is_some_and(|component| component.check(ctx))
    }

    /// Evaluate the rule for `action`, mapping a denial to an error.
    ///
    /// Anonymous requesters get [`Error::unauthorized`]; signed-in requesters
    /// get [`Error::forbidden`].
    pub fn check(&self, action: &str, ctx: &PermissionContext<'_>) -> Result<(), Error> {
        if self.is_allowed(action, ctx) {
            return Ok(());
        }
        tracing::debug!(resource = self.resource, action, "permission denied");
        Err(denied(ctx))
    }
}

/// Error for a denied check: 401 when anonymous, 403 otherwise.
pub(crate) fn denied(ctx: &PermissionContext<'_>) -> Error {
    if ctx.requester().is_authenticated() {
        Error::forbidden("You do not have permission to perform this action.")
    } else {
        Error::unauthorized("Authentication credentials were not provided.")
    }
}

/// Action tables for every exposed resource.
pub mod rules {
    use std::sync::OnceLock;

    use super::ResourcePermission;
    use crate::domain::permissions::ProjectPermission as P;
    use crate::domain::permissions::{
        AllowAny, DenyAll, HasProjectPerm, IsAuthenticated, IsCommentDeleter, IsCommentOwner,
        IsProjectOwner, IsSuperUser, IsTheSameUser,
    };

    macro_rules! resource_rules {
        ($(#[$meta:meta])* $name:ident => $build:expr) => {
            $(#[$meta])*
            /// Rules for this resource.
            pub fn $name() -> &'static ResourcePermission {
                static RULES: OnceLock<ResourcePermission> = OnceLock::new();
                RULES.get_or_init(|| $build)
            }
        };
    }

    resource_rules! {
        /// Projects and their sub-actions.
        projects => ResourcePermission::new("project")
            .rule(&["retrieve", "fans"], HasProjectPerm(P::ViewProject))
            .rule(&["create", "star", "unstar"], IsAuthenticated)
            .rule(&["update", "partial_update", "destroy"], IsProjectOwner)
            .rule(&["list", "stats", "issues_stats"], AllowAny)
            .rule(&["create_template"], IsSuperUser)
    }

    resource_rules! {
        user_stories => ResourcePermission::new("user_story")
            .rule(&["retrieve"], HasProjectPerm(P::ViewUs))
            .rule(
                &["create"],
                HasProjectPerm(P::AddUsToProject) | HasProjectPerm(P::AddUs),
            )
            .rule(&["update", "partial_update"], HasProjectPerm(P::ModifyUs))
            .rule(&["destroy"], HasProjectPerm(P::DeleteUs))
            .rule(
                &["bulk_create"],
                IsAuthenticated & (HasProjectPerm(P::AddUsToProject) | HasProjectPerm(P::AddUs)),
            )
            .rule(&["bulk_update_order"], HasProjectPerm(P::ModifyUs))
            .rule(&["list"], AllowAny)
    }

    resource_rules! {
        /// Sprints. Listing filters by `view_milestones` per project.
        milestones => ResourcePermission::new("milestone")
            .rule(&["retrieve", "stats"], HasProjectPerm(P::ViewMilestones))
            .rule(&["create"], HasProjectPerm(P::AddMilestone))
            .rule(&["update", "partial_update"], HasProjectPerm(P::ModifyMilestone))
            .rule(&["destroy"], HasProjectPerm(P::DeleteMilestone))
            .rule(&["list"], AllowAny)
    }

    resource_rules! {
        tasks => ResourcePermission::new("task")
            .rule(&["retrieve"], HasProjectPerm(P::ViewTasks))
            .rule(&["create"], HasProjectPerm(P::AddTask))
            .rule(&["update", "partial_update"], HasProjectPerm(P::ModifyTask))
            .rule(&["destroy"], HasProjectPerm(P::DeleteTask))
            .rule(&["bulk_create"], IsAuthenticated & HasProjectPerm(P::AddTask))
            .rule(&["list"], AllowAny)
    }

    resource_rules! {
        issues => ResourcePermission::new("issue")
            .rule(&["retrieve", "voters"], HasProjectPerm(P::ViewIssues))
            .rule(&["create"], HasProjectPerm(P::AddIssue))
            .rule(&["update", "partial_update"], HasProjectPerm(P::ModifyIssue))
            .rule(&["destroy"], HasProjectPerm(P::DeleteIssue))
            .rule(
                &["upvote", "downvote"],
                IsAuthenticated & HasProjectPerm(P::VoteIssues),
            )
            .rule(&["list"], AllowAny)
    }

    resource_rules! {
        /// Memberships, roles and statuses share one shape.
        project_values => ResourcePermission::new("project_value")
            .rule(&["retrieve"], HasProjectPerm(P::ViewProject))
            .rule(
                &[
                    "create",
                    "update",
                    "partial_update",
                    "destroy",
                    "bulk_create",
                    "bulk_update_order",
                    "resend_invitation",
                ],
                IsProjectOwner,
            )
            .rule(&["list"], AllowAny)
    }

    resource_rules! {
        history => ResourcePermission::new("history")
            .rule(&["retrieve"], HasProjectPerm(P::ViewProject))
            .rule(&["delete_comment"], IsProjectOwner | IsCommentOwner)
            .rule(&["undelete_comment"], IsProjectOwner | IsCommentDeleter)
    }

    resource_rules! {
        feedback => ResourcePermission::new("feedback")
            .rule(&["create"], IsAuthenticated)
    }

    resource_rules! {
        invitations => ResourcePermission::new("invitation")
            .rule(&["list"], DenyAll)
            .rule(&["retrieve"], AllowAny)
    }

    resource_rules! {
        users => ResourcePermission::new("user")
            .rule(&["list", "retrieve", "starred"], AllowAny)
            .rule(&["me", "change_password", "change_email"], IsAuthenticated)
            .rule(&["update", "partial_update", "destroy"], IsTheSameUser)
    }
}
