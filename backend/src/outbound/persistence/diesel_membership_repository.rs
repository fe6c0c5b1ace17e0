//! PostgreSQL-backed membership and role repositories.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{MembershipRepository, RepositoryError, RoleRepository};
use crate::domain::{
    Email, Membership, MembershipId, NewMembership, NewRole, ProjectId, Role, RoleId, UserId,
};

use super::diesel_helpers::{
    collect_rows, invalid_row, map_diesel_error, map_pool_error, parse_permissions,
    permission_names,
};
use super::models::{MembershipRow, MembershipValues, RoleRow, RoleValues};
use super::pool::DbPool;
use super::schema::{memberships, roles};

/// Diesel-backed implementation of the `MembershipRepository` port.
#[derive(Clone)]
pub struct DieselMembershipRepository {
    pool: DbPool,
}

impl DieselMembershipRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Diesel-backed implementation of the `RoleRepository` port.
#[derive(Clone)]
pub struct DieselRoleRepository {
    pool: DbPool,
}

impl DieselRoleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_membership(row: MembershipRow) -> Result<Membership, RepositoryError> {
    let email = row
        .email
        .as_deref()
        .map(Email::new)
        .transpose()
        .map_err(|err| invalid_row("memberships", err))?;
    Ok(Membership {
        id: MembershipId::new(row.id),
        project: ProjectId::new(row.project_id),
        user: row.user_id.map(UserId::new),
        role: RoleId::new(row.role_id),
        email,
        is_owner: row.is_owner,
        token: row.token,
        invited_by: row.invited_by_id.map(UserId::new),
        created_at: row.created_at,
    })
}

fn membership_values(membership: &NewMembership) -> MembershipValues<'_> {
    MembershipValues {
        project_id: membership.project.get(),
        user_id: membership.user.map(UserId::get),
        role_id: membership.role.get(),
        email: membership.email.as_ref().map(Email::as_str),
        is_owner: membership.is_owner,
        token: membership.token.as_deref(),
        invited_by_id: membership.invited_by.map(UserId::get),
        created_at: membership.created_at,
    }
}

fn row_to_role(row: RoleRow) -> Role {
    Role {
        id: RoleId::new(row.id),
        project: ProjectId::new(row.project_id),
        name: row.name,
        slug: row.slug,
        order: row.sort_order,
        computable: row.computable,
        permissions: parse_permissions(&row.permissions),
    }
}

#[async_trait]
impl MembershipRepository for DieselMembershipRepository {
    async fn create(&self, membership: NewMembership) -> Result<Membership, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored: MembershipRow = diesel::insert_into(memberships::table)
            .values(&membership_values(&membership))
            .returning(MembershipRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_membership(stored)
    }

    async fn find_by_id(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MembershipRow> = memberships::table
            .find(id.get())
            .select(MembershipRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_membership).transpose()
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Membership>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MembershipRow> = memberships::table
            .filter(memberships::token.eq(token))
            .select(MembershipRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_membership).transpose()
    }

    async fn find_for_user(
        &self,
        project: ProjectId,
        user: UserId,
    ) -> Result<Option<Membership>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<MembershipRow> = memberships::table
            .filter(memberships::project_id.eq(project.get()))
            .filter(memberships::user_id.eq(user.get()))
            .select(MembershipRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_membership).transpose()
    }

    async fn list_by_project(
        &self,
        project: ProjectId,
    ) -> Result<Vec<Membership>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MembershipRow> = memberships::table
            .filter(memberships::project_id.eq(project.get()))
            .select(MembershipRow::as_select())
            .order_by(memberships::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_membership)
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Membership>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<MembershipRow> = memberships::table
            .filter(memberships::user_id.eq(user.get()))
            .select(MembershipRow::as_select())
            .order_by(memberships::id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        collect_rows(rows, row_to_membership)
    }

    async fn update(&self, membership: &Membership) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let values = MembershipValues {
            project_id: membership.project.get(),
            user_id: membership.user.map(UserId::get),
            role_id: membership.role.get(),
            email: membership.email.as_ref().map(Email::as_str),
            is_owner: membership.is_owner,
            token: membership.token.as_deref(),
            invited_by_id: membership.invited_by.map(UserId::get),
            created_at: membership.created_at,
        };
        let updated = diesel::update(memberships::table.find(membership.id.get()))
            .set(&values)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!(
                "membership {}",
                membership.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: MembershipId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(memberships::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("membership {id}")));
        }
        Ok(())
    }

    async fn reassign_role(&self, from: RoleId, to: RoleId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(memberships::table.filter(memberships::role_id.eq(from.get())))
            .set(memberships::role_id.eq(to.get()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}

#[async_trait]
impl RoleRepository for DieselRoleRepository {
    async fn create(&self, role: NewRole) -> Result<Role, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let values = RoleValues {
            project_id: role.project.get(),
            name: &role.name,
            slug: &role.slug,
            sort_order: role.order,
            computable: role.computable,
            permissions: permission_names(&role.permissions),
        };
        let stored: RoleRow = diesel::insert_into(roles::table)
            .values(&values)
            .returning(RoleRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_role(stored))
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<RoleRow> = roles::table
            .find(id.get())
            .select(RoleRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_role))
    }

    async fn list_by_project(&self, project: ProjectId) -> Result<Vec<Role>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<RoleRow> = roles::table
            .filter(roles::project_id.eq(project.get()))
            .select(RoleRow::as_select())
            .order_by((roles::sort_order, roles::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_role).collect())
    }

    async fn update(&self, role: &Role) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let values = RoleValues {
            project_id: role.project.get(),
            name: &role.name,
            slug: &role.slug,
            sort_order: role.order,
            computable: role.computable,
            permissions: permission_names(&role.permissions),
        };
        let updated = diesel::update(roles::table.find(role.id.get()))
            .set(&values)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RepositoryError::missing(format!("role {}", role.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(roles::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if deleted == 0 {
            return Err(RepositoryError::missing(format!("role {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    fn pending_invitations_keep_their_email() {
        let row = MembershipRow {
            id: 4,
            project_id: 2,
            user_id: None,
            role_id: 8,
            email: Some("guest@example.com".to_owned()),
            is_owner: false,
            token: Some("abc".to_owned()),
            invited_by_id: Some(1),
            created_at: Utc::now(),
        };

        let membership = row_to_membership(row).expect("valid row");

        assert!(membership.is_pending());
        assert_eq!(
            membership.email.as_ref().map(Email::as_str),
            Some("guest@example.com")
        );
        assert_eq!(membership.invited_by, Some(UserId::new(1)));
    }

    #[rstest]
    fn role_rows_keep_order_and_permissions() {
        let role = row_to_role(RoleRow {
            id: 8,
            project_id: 2,
            name: "Back".to_owned(),
            slug: "back".to_owned(),
            sort_order: 40,
            computable: true,
            permissions: vec!["view_us".to_owned()],
        });

        assert_eq!(role.order, 40);
        assert_eq!(role.permissions.len(), 1);
    }
}
