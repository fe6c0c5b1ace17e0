//! Account use-cases: profile edits, password and email flows, cancellation.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;
use uuid::Uuid;

use crate::domain::permissions::{PermissionContext, Requester, rules};
use crate::domain::ports::{Mailer, OutgoingMail};
use crate::domain::repositories::AccessCache;
use crate::domain::user::validate_password;
use crate::domain::{
    Email, Error, PasswordHasher, Project, ProjectId, ProjectPermission, Repositories,
    TokenScope, TokenSigner, User, UserId, Username, slug_candidates,
};

const DELETED_USERNAME: &str = "deleted-user";
const INVALID_EMAIL_TOKEN: &str =
    "Invalid, are you sure the token is correct and you didn't use it before?";
const INVALID_CANCEL_TOKEN: &str = "Invalid, are you sure the token is correct?";

/// Profile fields a user may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub lang: Option<String>,
    pub color: Option<String>,
    pub email: Option<String>,
}

/// Users service.
#[derive(Clone)]
pub struct UsersService {
    repos: Repositories,
    hasher: PasswordHasher,
    signer: TokenSigner,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    cancel_account_max_age: Duration,
}

impl UsersService {
    pub fn new(
        repos: Repositories,
        hasher: PasswordHasher,
        signer: TokenSigner,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        cancel_account_max_age: Duration,
    ) -> Self {
        Self {
            repos,
            hasher,
            signer,
            mailer,
            clock,
            cancel_account_max_age,
        }
    }

    async fn send(&self, mail: OutgoingMail) {
        if let Err(err) = self.mailer.send(&mail).await {
            tracing::warn!(error = %err, kind = mail.kind, "user mail failed");
        }
    }

    /// With `project`, the project's members (requester must belong to it).
    /// Without, every user for superusers and nobody otherwise.
    pub async fn list(
        &self,
        requester: &Requester,
        project: Option<ProjectId>,
    ) -> Result<Vec<User>, Error> {
        rules::users().check("list", &PermissionContext::new(requester))?;
        let Some(project) = project else {
            return if requester.is_superuser() {
                Ok(self.repos.users.list().await?)
            } else {
                Ok(Vec::new())
            };
        };
        let project = self.repos.project(project).await?;
        let memberships = self.repos.memberships.list_by_project(project.id).await?;
        let is_member = requester.id().is_some_and(|id| {
            id == project.owner || memberships.iter().any(|m| m.user == Some(id))
        });
        if !is_member {
            return Err(Error::forbidden(
                "You don't have permisions to see this project users.",
            ));
        }
        let mut ids: Vec<UserId> = memberships.iter().filter_map(|m| m.user).collect();
        ids.push(project.owner);
        ids.sort_unstable();
        ids.dedup();
        Ok(self.repos.users.list_by_ids(&ids).await?)
    }

    /// `GET /users/me`.
    pub fn me(&self, requester: &Requester) -> Result<User, Error> {
        rules::users().check("me", &PermissionContext::new(requester))?;
        requester
            .as_user()
            .cloned()
            .ok_or_else(|| Error::unauthorized("Authentication credentials were not provided."))
    }

    /// Fetch an active user.
    pub async fn retrieve(&self, requester: &Requester, id: UserId) -> Result<User, Error> {
        let user = self.repos.user(id).await?;
        rules::users().check(
            "retrieve",
            &PermissionContext::new(requester).with_target_user(user.id),
        )?;
        Ok(user)
    }

    /// Projects starred by `id` that the requester can see.
    pub async fn starred(&self, requester: &Requester, id: UserId) -> Result<Vec<Project>, Error> {
        let user = self.repos.user(id).await?;
        rules::users().check(
            "starred",
            &PermissionContext::new(requester).with_target_user(user.id),
        )?;
        let mut cache = AccessCache::default();
        let mut out = Vec::new();
        for project_id in self.repos.votes.starred_projects(user.id).await? {
            if !cache
                .allows(&self.repos, requester, project_id, ProjectPermission::ViewProject)
                .await?
            {
                continue;
            }
            if let Some(project) = self.repos.projects.find_by_id(project_id).await? {
                out.push(project);
            }
        }
        Ok(out)
    }

    /// `PATCH /users/{id}`. A new email is only applied after confirmation.
    pub async fn partial_update(
        &self,
        requester: &Requester,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, Error> {
        let mut user = self.repos.user(id).await?;
        rules::users().check(
            "partial_update",
            &PermissionContext::new(requester).with_target_user(user.id),
        )?;

        if let Some(username) = changes.username {
            let username = Username::new(username.trim())?;
            if username != user.username {
                if self
                    .repos
                    .users
                    .find_by_username(username.as_str())
                    .await?
                    .is_some()
                {
                    return Err(Error::invalid_field(
                        "username",
                        "duplicated_username",
                        "Invalid username. Try with a different one.",
                    ));
                }
                user.username = username;
            }
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name.trim().to_owned();
        }
        if let Some(bio) = changes.bio {
            user.bio = bio;
        }
        if let Some(lang) = changes.lang {
            user.lang = lang;
        }
        if let Some(color) = changes.color {
            user.color = color;
        }

        let mut confirmation = None;
        if let Some(raw) = changes.email {
            if self.repos.users.find_by_email(raw.trim()).await?.is_some() {
                return Err(Error::invalid_field(
                    "email",
                    "duplicated_email",
                    "Duplicated email",
                ));
            }
            let email = Email::new(&raw)
                .map_err(|_| Error::invalid_field("email", "invalid_email", "Not valid email"))?;
            let token = Uuid::new_v4().to_string();
            user.email_token = Some(token.clone());
            user.new_email = Some(email.clone());
            confirmation = Some(OutgoingMail {
                kind: "change_email",
                to: email.to_string(),
                subject: "Confirm your new email".to_owned(),
                body: format!("Confirm the address change with token {token}."),
            });
        }

        self.repos.users.update(&user).await?;
        if let Some(mail) = confirmation {
            self.send(mail).await;
        }
        Ok(user)
    }

    /// `DELETE /users/{id}`: cancel one's own account.
    pub async fn destroy(&self, requester: &Requester, id: UserId) -> Result<(), Error> {
        let user = self.repos.user(id).await?;
        rules::users().check(
            "destroy",
            &PermissionContext::new(requester).with_target_user(user.id),
        )?;
        self.cancel_user(user).await
    }

    /// `POST /users/cancel` with a signed cancel-account token.
    pub async fn cancel(&self, cancel_token: &str) -> Result<(), Error> {
        let user_id = self
            .signer
            .verify(
                cancel_token,
                TokenScope::CancelAccount,
                Some(self.cancel_account_max_age),
                self.clock.utc(),
            )
            .map_err(|_| Error::invalid_request(INVALID_CANCEL_TOKEN))?;
        let user = self
            .repos
            .users
            .find_by_id(user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| Error::invalid_request(INVALID_CANCEL_TOKEN))?;
        self.cancel_user(user).await
    }

    async fn cancel_user(&self, mut user: User) -> Result<(), Error> {
        let mut username = None;
        for candidate in slug_candidates(DELETED_USERNAME) {
            if self.repos.users.find_by_username(&candidate).await?.is_none() {
                username = Some(Username::new(candidate)?);
                break;
            }
        }
        let Some(username) = username else {
            return Err(Error::internal("no free username for a cancelled account"));
        };
        user.cancel(username);
        self.repos.users.update(&user).await?;
        tracing::info!(user = %user.id, "account cancelled");
        Ok(())
    }

    /// Issue a recovery token and mail it. Returns the address used.
    pub async fn password_recovery(&self, username_or_email: &str) -> Result<Email, Error> {
        let needle = username_or_email.trim();
        if needle.is_empty() {
            return Err(Error::invalid_request("Invalid username or email"));
        }
        let user = match self.repos.users.find_by_username(needle).await? {
            Some(user) => Some(user),
            None => self.repos.users.find_by_email(needle).await?,
        };
        let Some(mut user) = user.filter(|user| user.is_active) else {
            return Err(Error::invalid_request("Invalid username or email"));
        };
        let token = Uuid::new_v4().to_string();
        user.recovery_token = Some(token.clone());
        self.repos.users.update(&user).await?;
        self.send(OutgoingMail {
            kind: "password_recovery",
            to: user.email.to_string(),
            subject: "Password recovery".to_owned(),
            body: format!("Reset your password with token {token}."),
        })
        .await;
        Ok(user.email)
    }

    /// Reset a password with a recovery token. The token is spent on success.
    pub async fn change_password_from_recovery(
        &self,
        token: &str,
        password: &str,
    ) -> Result<(), Error> {
        let mut user = self
            .repos
            .users
            .find_by_recovery_token(token.trim())
            .await?
            .ok_or_else(|| Error::invalid_request("Token is invalid"))?;
        validate_password(password)?;
        user.password_hash = Some(self.hasher.hash(password)?);
        user.recovery_token = None;
        self.repos.users.update(&user).await?;
        Ok(())
    }

    /// Change the requester's password after checking the current one.
    pub async fn change_password(
        &self,
        requester: &Requester,
        current_password: &str,
        password: &str,
    ) -> Result<(), Error> {
        rules::users().check("change_password", &PermissionContext::new(requester))?;
        if current_password.is_empty() {
            return Err(Error::invalid_request("Current password parameter needed"));
        }
        if password.is_empty() {
            return Err(Error::invalid_request("New password parameter needed"));
        }
        if validate_password(password).is_err() {
            return Err(Error::invalid_request(
                "Invalid password length at least 6 charaters needed",
            ));
        }
        let Some(mut user) = requester.as_user().cloned() else {
            return Err(Error::unauthorized(
                "Authentication credentials were not provided.",
            ));
        };
        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.hasher.verify(current_password, hash));
        if !verified {
            return Err(Error::invalid_request("Invalid current password"));
        }
        user.password_hash = Some(self.hasher.hash(password)?);
        self.repos.users.update(&user).await?;
        Ok(())
    }

    /// Confirm a pending email change.
    pub async fn change_email(&self, requester: &Requester, email_token: &str) -> Result<(), Error> {
        let token = email_token.trim();
        if token.is_empty() {
            return Err(Error::invalid_request(INVALID_EMAIL_TOKEN));
        }
        let mut user = self
            .repos
            .users
            .find_by_email_token(token)
            .await?
            .ok_or_else(|| Error::invalid_request(INVALID_EMAIL_TOKEN))?;
        rules::users().check(
            "change_email",
            &PermissionContext::new(requester).with_target_user(user.id),
        )?;
        let Some(new_email) = user.new_email.take() else {
            return Err(Error::invalid_request(INVALID_EMAIL_TOKEN));
        };
        user.email = new_email;
        user.email_token = None;
        self.repos.users.update(&user).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "users_service_tests.rs"]
mod tests;
