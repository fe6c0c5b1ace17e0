//! Wiring of the domain services over one set of adapters.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;

use crate::domain::ports::Mailer;
use crate::domain::{
    AuthService, AuthSettings, Email, FeedbackService, HistoryService, IssuesService,
    MembershipsService, MilestonesService, PasswordHasher, ProjectsService, Repositories,
    RolesService, StatusesService, TasksService, TokenSigner, UserStoriesService, UsersService,
    history::DEFAULT_MAX_PARTIAL_DIFFS, template::DEFAULT_TEMPLATE,
};

/// Runtime policy for the services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub public_register_enabled: bool,
    pub feedback_email: Option<Email>,
    pub cancel_account_max_age: Duration,
    pub default_project_template: String,
    /// Partial history entries stored between two full snapshots.
    pub history_max_partial_diffs: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            public_register_enabled: false,
            feedback_email: None,
            cancel_account_max_age: Duration::days(30),
            default_project_template: DEFAULT_TEMPLATE.to_owned(),
            history_max_partial_diffs: DEFAULT_MAX_PARTIAL_DIFFS,
        }
    }
}

/// Adapters the services are built from.
#[derive(Clone)]
pub struct ServiceDeps {
    pub repos: Repositories,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
    pub hasher: PasswordHasher,
    pub signer: TokenSigner,
}

/// Every use-case service, cheap to clone into request handlers.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UsersService,
    pub projects: ProjectsService,
    pub memberships: MembershipsService,
    pub roles: RolesService,
    pub statuses: StatusesService,
    pub milestones: MilestonesService,
    pub user_stories: UserStoriesService,
    pub tasks: TasksService,
    pub issues: IssuesService,
    pub history: HistoryService,
    pub feedback: FeedbackService,
}

impl Services {
    /// Wire every domain service over shared dependencies.
    pub fn new(deps: ServiceDeps, config: ServiceConfig) -> Self {
        let ServiceDeps {
            repos,
            mailer,
            clock,
            hasher,
            signer,
        } = deps;
        let history = HistoryService::new(repos.clone(), Arc::clone(&clock))
            .with_max_partial_diffs(config.history_max_partial_diffs);
        Self {
            auth: AuthService::new(
                repos.clone(),
                hasher.clone(),
                signer.clone(),
                Arc::clone(&mailer),
                Arc::clone(&clock),
                AuthSettings {
                    public_register_enabled: config.public_register_enabled,
                },
            ),
            users: UsersService::new(
                repos.clone(),
                hasher,
                signer,
                Arc::clone(&mailer),
                Arc::clone(&clock),
                config.cancel_account_max_age,
            ),
            projects: ProjectsService::new(
                repos.clone(),
                Arc::clone(&clock),
                config.default_project_template,
            ),
            memberships: MembershipsService::new(
                repos.clone(),
                Arc::clone(&mailer),
                Arc::clone(&clock),
            ),
            roles: RolesService::new(repos.clone()),
            statuses: StatusesService::new(repos.clone(), history.clone(), Arc::clone(&clock)),
            milestones: MilestonesService::new(repos.clone(), Arc::clone(&clock)),
            user_stories: UserStoriesService::new(
                repos.clone(),
                history.clone(),
                Arc::clone(&clock),
            ),
            tasks: TasksService::new(repos.clone(), history.clone(), Arc::clone(&clock)),
            issues: IssuesService::new(repos.clone(), history.clone(), Arc::clone(&clock)),
            feedback: FeedbackService::new(repos, mailer, clock, config.feedback_email),
            history,
        }
    }
}
