//! Leaf permission checks.

use super::operators::impl_permission_operators;
use super::{PermissionComponent, PermissionContext, ProjectPermission};

/// Always passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllowAny;

/// Never passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DenyAll;

/// Passes for signed-in requesters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsAuthenticated;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsSuperUser;

/// Passes when the requester holds the permission on the project in context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasProjectPerm(pub ProjectPermission);

/// Superuser, project owner, or a member flagged as owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsProjectOwner;

/// Requester created the object under check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsObjectOwner;

/// Requester wrote the history comment under check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsCommentOwner;

/// Requester hid the history comment under check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsCommentDeleter;

/// Requester is the user being acted upon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsTheSameUser;

impl PermissionComponent for AllowAny {
    fn check(&self, _ctx: &PermissionContext<'_>) -> bool {
        true
    }
}

impl PermissionComponent for DenyAll {
    fn check(&self, _ctx: &PermissionContext<'_>) -> bool {
        false
    }
}

impl PermissionComponent for IsAuthenticated {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        ctx.requester().is_authenticated()
    }
}

impl PermissionComponent for IsSuperUser {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        ctx.requester().is_superuser()
    }
}

impl PermissionComponent for HasProjectPerm {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        ctx.project().is_some_and(|access| access.has(self.0))
    }
}

impl PermissionComponent for IsProjectOwner {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        ctx.requester().is_superuser() || ctx.project().is_some_and(|access| access.is_admin())
    }
}

fn is_requester(ctx: &PermissionContext<'_>, candidate: Option<crate::domain::UserId>) -> bool {
    matches!((ctx.requester().id(), candidate), (Some(me), Some(other)) if me == other)
}

impl PermissionComponent for IsObjectOwner {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        is_requester(ctx, ctx.object_owner())
    }
}

impl PermissionComponent for IsCommentOwner {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        is_requester(ctx, ctx.comment_owner())
    }
}

impl PermissionComponent for IsCommentDeleter {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        is_requester(ctx, ctx.comment_deleter())
    }
}

impl PermissionComponent for IsTheSameUser {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        is_requester(ctx, ctx.target_user())
    }
}

impl_permission_operators!(
    AllowAny,
    DenyAll,
    IsAuthenticated,
    IsSuperUser,
    HasProjectPerm,
    IsProjectOwner,
    IsObjectOwner,
    IsCommentOwner,
    IsCommentDeleter,
    IsTheSameUser,
);
