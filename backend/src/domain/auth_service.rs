//! Login, registration and requester resolution.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::permissions::Requester;
use crate::domain::ports::{Mailer, OutgoingMail};
use crate::domain::user::validate_password;
use crate::domain::{
    Email, Error, Membership, NewUser, PasswordHasher, Repositories, TokenScope, TokenSigner,
    User, UserId, Username,
};

const BAD_CREDENTIALS: &str = "Username or password does not matches user.";

/// Login payload; `kind` is the `type` field and must be `normal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub kind: String,
    pub username: String,
    pub password: String,
}

/// Registration payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Open sign-up, allowed when public registration is enabled.
    Public {
        username: String,
        email: String,
        full_name: String,
        password: String,
    },
    /// Accept an invitation, either with a new account or an existing one.
    Private {
        token: String,
        existing: bool,
        username: String,
        password: String,
        email: Option<String>,
        full_name: Option<String>,
    },
}

/// A user paired with a fresh authentication token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user: User,
    pub auth_token: String,
}

/// Account policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthSettings {
    pub public_register_enabled: bool,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    repos: Repositories,
    hasher: PasswordHasher,
    signer: TokenSigner,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
}

impl AuthService {
    /// Build the service over its repositories, token signer and clock.
    pub fn new(
        repos: Repositories,
        hasher: PasswordHasher,
        signer: TokenSigner,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            repos,
            hasher,
            signer,
            mailer,
            clock,
            settings,
        }
    }

    /// Settings the service was built with.
    pub fn settings(&self) -> AuthSettings {
        self.settings
    }

    /// Authentication token for `user`.
    pub fn auth_token(&self, user: &User) -> Result<String, Error> {
        Ok(self
            .signer
            .sign(TokenScope::Authentication, user.id, self.clock.utc())?)
    }

    fn authenticated(&self, user: User) -> Result<AuthenticatedUser, Error> {
        let auth_token = self.auth_token(&user)?;
        Ok(AuthenticatedUser { user, auth_token })
    }

    /// Find an active user by username or email and check the password.
    async fn validated_user(&self, username: &str, password: &str) -> Result<User, Error> {
        let username = username.trim();
        let user = match self.repos.users.find_by_username(username).await? {
            Some(user) => Some(user),
            None => self.repos.users.find_by_email(username).await?,
        };
        let Some(user) = user.filter(|user| user.is_active) else {
            return Err(Error::invalid_request(BAD_CREDENTIALS));
        };
        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.hasher.verify(password, hash));
        if !verified {
            return Err(Error::invalid_request(BAD_CREDENTIALS));
        }
        Ok(user)
    }

    /// `POST /auth`.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthenticatedUser, Error> {
        if request.kind != "normal" {
            return Err(Error::invalid_field(
                "type",
                "invalid_login_type",
                "invalid login type",
            ));
        }
        let user = self
            .validated_user(&request.username, &request.password)
            .await?;
        tracing::info!(user = %user.id, "user logged in");
        self.authenticated(user)
    }

    /// `POST /auth/register`.
    pub async fn register(&self, registration: Registration) -> Result<AuthenticatedUser, Error> {
        let user = match registration {
            Registration::Public {
                username,
                email,
                full_name,
                password,
            } => {
                if !self.settings.public_register_enabled {
                    return Err(Error::invalid_request("Public register is disabled."));
                }
                self.create_user(&username, &email, full_name, &password)
                    .await?
            }
            Registration::Private {
                token,
                existing: true,
                username,
                password,
                ..
            } => {
                let user = self.validated_user(&username, &password).await?;
                self.accept_invitation(&token, &user).await?;
                user
            }
            Registration::Private {
                token,
                existing: false,
                username,
                password,
                email,
                full_name,
            } => {
                self.pending_invitation(&token).await?;
                let email = email.unwrap_or_default();
                let user = self
                    .create_user(&username, &email, full_name.unwrap_or_default(), &password)
                    .await?;
                self.accept_invitation(&token, &user).await?;
                user
            }
        };
        self.send_register_email(&user).await;
        self.authenticated(user)
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        full_name: String,
        password: &str,
    ) -> Result<User, Error> {
        let username = Username::new(username.trim())?;
        let email = Email::new(email)?;
        validate_password(password)?;
        if self
            .repos
            .users
            .find_by_username(username.as_str())
            .await?
            .is_some()
        {
            return Err(Error::invalid_request("Username is already in use."));
        }
        if self
            .repos
            .users
            .find_by_email(email.as_str())
            .await?
            .is_some()
        {
            return Err(Error::invalid_request("Email is already in use."));
        }
        let user = self
            .repos
            .users
            .create(NewUser {
                username,
                email,
                full_name: full_name.trim().to_owned(),
                password_hash: Some(self.hasher.hash(password)?),
                is_superuser: false,
                date_joined: self.clock.utc(),
            })
            .await?;
        tracing::info!(user = %user.id, "user registered");
        Ok(user)
    }

    async fn pending_invitation(&self, token: &str) -> Result<Membership, Error> {
        self.repos
            .memberships
            .find_by_token(token.trim())
            .await?
            .filter(Membership::is_pending)
            .ok_or_else(|| Error::not_found("Token not matches any valid invitation."))
    }

    async fn accept_invitation(&self, token: &str, user: &User) -> Result<(), Error> {
        let mut membership = self.pending_invitation(token).await?;
        if self
            .repos
            .memberships
            .find_for_user(membership.project, user.id)
            .await?
            .is_some()
        {
            return Err(Error::invalid_request(
                "Membership with user is already exists.",
            ));
        }
        membership.user = Some(user.id);
        membership.token = None;
        self.repos.memberships.update(&membership).await?;
        tracing::info!(membership = %membership.id, user = %user.id, "invitation accepted");
        Ok(())
    }

    async fn send_register_email(&self, user: &User) {
        let cancel_token = match self
            .signer
            .sign(TokenScope::CancelAccount, user.id, self.clock.utc())
        {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, user = %user.id, "cancel token signing failed");
                return;
            }
        };
        let mail = OutgoingMail {
            kind: "registered_user",
            to: user.email.to_string(),
            subject: "Welcome".to_owned(),
            body: format!(
                "Welcome {}. If you did not sign up, cancel the account with token {cancel_token}.",
                user.display_name()
            ),
        };
        if let Err(err) = self.mailer.send(&mail).await {
            tracing::warn!(error = %err, user = %user.id, "registration mail failed");
        }
    }

    /// Resolve a bearer token into a requester.
    ///
    /// Bad tokens and inactive accounts answer 401.
    pub async fn requester_from_token(&self, token: &str) -> Result<Requester, Error> {
        let user_id = self
            .signer
            .verify(token, TokenScope::Authentication, None, self.clock.utc())
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected bearer token");
                Error::unauthorized("Invalid token")
            })?;
        match self.requester_from_session(user_id).await? {
            Requester::Anonymous => Err(Error::unauthorized("Invalid token")),
            requester => Ok(requester),
        }
    }

    /// Resolve a session user id; stale sessions fall back to anonymous.
    pub async fn requester_from_session(&self, user_id: UserId) -> Result<Requester, Error> {
        Ok(match self.repos.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => Requester::user(user),
            _ => Requester::Anonymous,
        })
    }
}

#[cfg(test)]
#[path = "auth_service_tests.rs"]
mod tests;
