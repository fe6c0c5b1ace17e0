//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{MailError, Mailer, OutgoingMail};
use crate::domain::{
    CreateProject, Email, Membership, NewMembership, NewRole, NewUser, PasswordHasher, Project,
    ProjectPermission, Repositories, Requester, ServiceConfig, ServiceDeps, Services, TokenSigner,
    User, Username,
};
use crate::outbound::memory::MemoryStore;

/// Password given to every user created through [`TestWorld`].
pub const PASSWORD: &str = "123123";
/// Secret used by the [`TestWorld`] token signer.
pub const TOKEN_SECRET: &[u8] = b"test-token-secret";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("test support mutex poisoned"),
    }
}

/// Clock tests can move forward by hand.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward.
    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Mailer that keeps every message, optionally failing delivery.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        lock(&self.sent).clone()
    }

    /// Messages of one kind, e.g. `membership_invitation`.
    pub fn sent_of(&self, kind: &str) -> Vec<OutgoingMail> {
        self.sent()
            .into_iter()
            .filter(|mail| mail.kind == kind)
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        lock(&self.sent).push(mail.clone());
        if self.fail {
            return Err(MailError::delivery("recording mailer set to fail"));
        }
        Ok(())
    }
}

/// A complete service graph over the in-memory store.
pub struct TestWorld {
    pub store: Arc<MemoryStore>,
    pub repos: Repositories,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<MutableClock>,
    pub signer: TokenSigner,
    pub hasher: PasswordHasher,
    pub services: Services,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// World with feedback enabled and public registration on.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig {
            public_register_enabled: true,
            feedback_email: Some(Email::new("feedback@example.com").expect("email")),
            ..ServiceConfig::default()
        })
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        Self::build(config, Arc::new(RecordingMailer::default()))
    }

    /// A world whose services send mail through `mailer`.
    pub fn with_mailer(config: ServiceConfig, mailer: RecordingMailer) -> Self {
        Self::build(config, Arc::new(mailer))
    }

    fn build(config: ServiceConfig, mailer: Arc<RecordingMailer>) -> Self {
        let store = MemoryStore::new();
        let repos = MemoryStore::repositories(&store);
        let start = Utc
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .single()
            .expect("valid start time");
        let clock = Arc::new(MutableClock::new(start));
        let signer = TokenSigner::new(TOKEN_SECRET.to_vec());
        let hasher = PasswordHasher::insecure_fast();
        let services = Services::new(
            ServiceDeps {
                repos: repos.clone(),
                mailer: mailer.clone(),
                clock: clock.clone(),
                hasher: hasher.clone(),
                signer: signer.clone(),
            },
            config,
        );
        Self {
            store,
            repos,
            mailer,
            clock,
            signer,
            hasher,
            services,
        }
    }

    async fn insert_user(&self, username: &str, is_superuser: bool) -> User {
        let hash = self.hasher.hash(PASSWORD).expect("hash");
        self.repos
            .users
            .create(NewUser {
                username: Username::new(username).expect("username"),
                email: Email::new(format!("{username}@example.com")).expect("email"),
                full_name: format!("{username} tester"),
                password_hash: Some(hash),
                is_superuser,
                date_joined: self.clock.utc(),
            })
            .await
            .expect("create user")
    }

    /// Active user `username` with email `{username}@example.com`.
    pub async fn user(&self, username: &str) -> User {
        self.insert_user(username, false).await
    }

    /// Create a superuser.
    pub async fn superuser(&self, username: &str) -> User {
        self.insert_user(username, true).await
    }

    pub fn requester(user: &User) -> Requester {
        Requester::user(user.clone())
    }

    /// Signed token for `user`.
    pub fn auth_token(&self, user: &User) -> String {
        self.services.auth.auth_token(user).expect("auth token")
    }

    /// Project created by `owner` through the projects service.
    pub async fn project(&self, owner: &User, name: &str, is_private: bool) -> Project {
        self.services
            .projects
            .create(
                &Self::requester(owner),
                CreateProject {
                    name: name.to_owned(),
                    description: format!("{name} description"),
                    is_private,
                    ..CreateProject::default()
                },
            )
            .await
            .expect("create project")
            .project
    }

    /// Private project without any anonymous or public permission.
    pub async fn private_project(&self, owner: &User, name: &str) -> Project {
        self.project(owner, name, true).await
    }

    /// Add `user` to `project` through a dedicated role holding `permissions`.
    pub async fn member(
        &self,
        project: &Project,
        user: &User,
        permissions: &[ProjectPermission],
    ) -> Membership {
        let role = self
            .repos
            .roles
            .create(NewRole {
                project: project.id,
                name: format!("role for {}", user.username),
                slug: format!("role-{}", user.id),
                order: 100,
                computable: true,
                permissions: permissions.to_vec(),
            })
            .await
            .expect("create role");
        self.repos
            .memberships
            .create(NewMembership {
                project: project.id,
                user: Some(user.id),
                role: role.id,
                email: Some(user.email.clone()),
                is_owner: false,
                token: None,
                invited_by: Some(project.owner),
                created_at: self.clock.utc(),
            })
            .await
            .expect("create membership")
    }
}

pub mod openapi {
    //! OpenAPI schema traversal helpers.
    //!
    //! Resolves `RefOr<Schema>` wrappers to concrete `Object` schemas with
    //! diagnostic messages on type mismatches.

    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::{Object, Schema};

    /// Extract an `Object` schema, panicking with a diagnostic if not an Object.
    pub fn unwrap_object_schema<'a>(schema: &'a RefOr<Schema>, name: &str) -> &'a Object {
        match schema {
            RefOr::T(Schema::Object(obj)) => obj,
            RefOr::Ref(reference) => {
                panic!(
                    "schema '{name}' is a $ref to '{}'; resolve the reference first",
                    reference.ref_location
                );
            }
            RefOr::T(Schema::Array(_)) => {
                panic!("schema '{name}' is an Array, not an Object");
            }
            _ => panic!("schema '{name}' has unexpected type"),
        }
    }

    /// Get a property from an Object schema by name.
    pub fn get_property<'a>(obj: &'a Object, field: &str) -> &'a RefOr<Schema> {
        match obj.properties.get(field) {
            Some(property) => property,
            None => panic!("property '{field}' not found"),
        }
    }
}
