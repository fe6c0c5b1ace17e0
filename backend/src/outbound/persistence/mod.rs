//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of domain repository ports
//! backed by PostgreSQL via the Diesel ORM with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: Repository implementations only translate between
//!   Diesel models and domain types. Permission checks, history and status
//!   propagation stay in the domain services.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) never leave this module.
//! - **One error type**: Pool and Diesel failures become
//!   [`RepositoryError`](crate::domain::ports::RepositoryError).
//!
//! # Example
//!
//! ```ignore
//! use tracker_backend::outbound::persistence::{DbPool, PoolConfig, repositories};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/tracker")).await?;
//! let repos = repositories(pool);
//! ```

use std::sync::Arc;

use crate::domain::Repositories;

pub(crate) mod diesel_helpers;
mod diesel_feedback_repository;
mod diesel_history_repository;
mod diesel_membership_repository;
mod diesel_milestone_repository;
mod diesel_project_repository;
mod diesel_status_repository;
mod diesel_user_repository;
mod diesel_vote_repository;
mod diesel_work_item_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_feedback_repository::{DieselFeedbackRepository, DieselTemplateRepository};
pub use diesel_history_repository::DieselHistoryRepository;
pub use diesel_membership_repository::{DieselMembershipRepository, DieselRoleRepository};
pub use diesel_milestone_repository::DieselMilestoneRepository;
pub use diesel_project_repository::DieselProjectRepository;
pub use diesel_status_repository::DieselStatusRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use diesel_vote_repository::DieselVoteRepository;
pub use diesel_work_item_repository::{
    DieselIssueRepository, DieselTaskRepository, DieselUserStoryRepository,
};
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

/// Wire every repository port to `pool`.
pub fn repositories(pool: DbPool) -> Repositories {
    Repositories {
        users: Arc::new(DieselUserRepository::new(pool.clone())),
        projects: Arc::new(DieselProjectRepository::new(pool.clone())),
        memberships: Arc::new(DieselMembershipRepository::new(pool.clone())),
        roles: Arc::new(DieselRoleRepository::new(pool.clone())),
        statuses: Arc::new(DieselStatusRepository::new(pool.clone())),
        milestones: Arc::new(DieselMilestoneRepository::new(pool.clone())),
        user_stories: Arc::new(DieselUserStoryRepository::new(pool.clone())),
        tasks: Arc::new(DieselTaskRepository::new(pool.clone())),
        issues: Arc::new(DieselIssueRepository::new(pool.clone())),
        votes: Arc::new(DieselVoteRepository::new(pool.clone())),
        history: Arc::new(DieselHistoryRepository::new(pool.clone())),
        feedback: Arc::new(DieselFeedbackRepository::new(pool.clone())),
        templates: Arc::new(DieselTemplateRepository::new(pool)),
    }
}
