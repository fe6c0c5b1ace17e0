//! Boolean combinators over permission components.
//!
//! Components compose with `&`, `|` and `!`:
//!
//! ```
//! use tracker_backend::domain::permissions::{
//!     IsCommentOwner, IsProjectOwner, PermissionComponent, PermissionContext, Requester,
//! };
//!
//! let rule = IsProjectOwner | IsCommentOwner;
//! let anonymous = Requester::Anonymous;
//! assert!(!rule.check(&PermissionContext::new(&anonymous)));
//! ```

use std::ops::{BitAnd, BitOr, Not as NotOp};

use super::PermissionContext;

/// A single, synchronous authorisation check.
pub trait PermissionComponent: Send + Sync {
    /// Return `true` when the context satisfies the check.
    fn check(&self, ctx: &PermissionContext<'_>) -> bool;
}

impl<T: PermissionComponent + ?Sized> PermissionComponent for &T {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        (**self).check(ctx)
    }
}

impl<T: PermissionComponent + ?Sized> PermissionComponent for Box<T> {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        (**self).check(ctx)
    }
}

/// Both operands must pass. The right operand is skipped when the left fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct And<A, B> {
    left: A,
    right: B,
}

impl<A, B> And<A, B> {
    /// Both components must allow.
    pub const fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

impl<A: PermissionComponent, B: PermissionComponent> PermissionComponent for And<A, B> {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        self.left.check(ctx) && self.right.check(ctx)
    }
}

/// Either operand may pass. The right operand is skipped when the left passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Or<A, B> {
    left: A,
    right: B,
}

impl<A, B> Or<A, B> {
    /// Either component may allow.
    pub const fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

impl<A: PermissionComponent, B: PermissionComponent> PermissionComponent for Or<A, B> {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        self.left.check(ctx) || self.right.check(ctx)
    }
}

/// Inverts its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Not<A> {
    inner: A,
}

impl<A> Not<A> {
    /// Invert `inner`.
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: PermissionComponent> PermissionComponent for Not<A> {
    fn check(&self, ctx: &PermissionContext<'_>) -> bool {
        !self.inner.check(ctx)
    }
}

/// Implement `&`, `|` and `!` for plain component types.
macro_rules! impl_permission_operators {
    ($($type:ty),+ $(,)?) => {
        $(
            impl<Rhs: $crate::domain::permissions::PermissionComponent> ::std::ops::BitAnd<Rhs>
                for $type
            {
                type Output = $crate::domain::permissions::And<Self, Rhs>;

                fn bitand(self, rhs: Rhs) -> Self::Output {
                    $crate::domain::permissions::And::new(self, rhs)
                }
            }

            impl<Rhs: $crate::domain::permissions::PermissionComponent> ::std::ops::BitOr<Rhs>
                for $type
            {
                type Output = $crate::domain::permissions::Or<Self, Rhs>;

                fn bitor(self, rhs: Rhs) -> Self::Output {
                    $crate::domain::permissions::Or::new(self, rhs)
                }
            }

            impl ::std::ops::Not for $type {
                type Output = $crate::domain::permissions::Not<Self>;

                fn not(self) -> Self::Output {
                    $crate::domain::permissions::Not::new(self)
                }
            }
        )+
    };
}

pub(crate) use impl_permission_operators;

impl<A, B, Rhs: PermissionComponent> BitAnd<Rhs> for And<A, B> {
    type Output = And<Self, Rhs>;

    fn bitand(self, rhs: Rhs) -> Self::Output {
        And::new(self, rhs)
    }
}

impl<A, B, Rhs: PermissionComponent> BitOr<Rhs> for And<A, B> {
    type Output = Or<Self, Rhs>;

    fn bitor(self, rhs: Rhs) -> Self::Output {
        Or::new(self, rhs)
    }
}

impl<A, B> NotOp for And<A, B> {
    type Output = Not<Self>;

    fn not(self) -> Self::Output {
        Not::new(self)
    }
}

impl<A, B, Rhs: PermissionComponent> BitAnd<Rhs> for Or<A, B> {
    type Output = And<Self, Rhs>;

    fn bitand(self, rhs: Rhs) -> Self::Output {
        And::new(self, rhs)
    }
}

impl<A, B, Rhs: PermissionComponent> BitOr<Rhs> for Or<A, B> {
    type Output = Or<Self, Rhs>;

    fn bitor(self, rhs: Rhs) -> Self::Output {
        Or::new(self, rhs)
    }
}

impl<A, B> NotOp for Or<A, B> {
    type Output = Not<Self>;

    fn not(self) -> Self::Output {
        Not::new(self)
    }
}

impl<A, Rhs: PermissionComponent> BitAnd<Rhs> for Not<A> {
    type Output = And<Self, Rhs>;

    fn bitand(self, rhs: Rhs) -> Self::Output {
        And::new(self, rhs)
    }
}

impl<A, Rhs: PermissionComponent> BitOr<Rhs> for Not<A> {
    type Output = Or<Self, Rhs>;

    fn bitor(self, rhs: Rhs) -> Self::Output {
        Or::new(self, rhs)
    }
}

impl<A> NotOp for Not<A> {
    type Output = Not<Self>;

    fn not(self) -> Self::Output {
        Not::new(self)
    }
}
