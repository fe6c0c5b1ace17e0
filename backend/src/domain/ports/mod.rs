//! Driven ports: the storage and delivery contracts the domain relies on.

mod macros;
pub(crate) use macros::define_port_error;

mod feedback_repository;
mod history_repository;
mod mailer;
mod membership_repository;
mod milestone_repository;
mod project_repository;
mod repository_error;
mod status_repository;
mod user_repository;
mod vote_repository;
mod work_item_repository;

#[cfg(test)]
pub use feedback_repository::{MockFeedbackRepository, MockTemplateRepository};
pub use feedback_repository::{FeedbackRepository, TemplateRepository};
#[cfg(test)]
pub use history_repository::MockHistoryRepository;
pub use history_repository::HistoryRepository;
#[cfg(test)]
pub use mailer::MockMailer;
pub use mailer::{MailError, Mailer, OutgoingMail};
#[cfg(test)]
pub use membership_repository::{MockMembershipRepository, MockRoleRepository};
pub use membership_repository::{MembershipRepository, RoleRepository};
#[cfg(test)]
pub use milestone_repository::MockMilestoneRepository;
pub use milestone_repository::MilestoneRepository;
#[cfg(test)]
pub use project_repository::MockProjectRepository;
pub use project_repository::ProjectRepository;
pub use repository_error::RepositoryError;
#[cfg(test)]
pub use status_repository::MockStatusRepository;
pub use status_repository::StatusRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::UserRepository;
#[cfg(test)]
pub use vote_repository::MockVoteRepository;
pub use vote_repository::VoteRepository;
#[cfg(test)]
pub use work_item_repository::{
    MockIssueRepository, MockTaskRepository, MockUserStoryRepository,
};
pub use work_item_repository::{IssueRepository, TaskRepository, UserStoryRepository};
