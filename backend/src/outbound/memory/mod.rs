//! In-memory adapters for every repository port.
//!
//! One [`MemoryStore`] backs all ports so cascades and cross-table lookups
//! behave like the PostgreSQL adapters. Used by tests and when no database
//! URL is configured.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{
    FeedbackRepository, HistoryRepository, IssueRepository, MembershipRepository,
    MilestoneRepository, ProjectRepository, RepositoryError, RoleRepository, StatusRepository,
    TaskRepository, TemplateRepository, UserRepository, UserStoryRepository, VoteRepository,
};
use crate::domain::{
    FeedbackEntry, FeedbackId, HistoryEntry, HistoryTarget, Issue, IssueFilter, IssueId,
    Membership, MembershipId, Milestone, MilestoneFilter, MilestoneId, NewFeedback, NewIssue,
    NewMembership, NewMilestone, NewProject, NewRole, NewStatus, NewTask, NewUser, NewUserStory,
    OrderField, Project, ProjectId, ProjectTemplate, Repositories, Role, RoleId, Status, StatusId,
    StatusKind, Task, TaskFilter, TaskId, User, UserId, UserStory, UserStoryFilter, UserStoryId,
    VoteTarget,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    projects: BTreeMap<ProjectId, Project>,
    last_refs: BTreeMap<ProjectId, i64>,
    roles: BTreeMap<RoleId, Role>,
    memberships: BTreeMap<MembershipId, Membership>,
    statuses: BTreeMap<StatusId, Status>,
    milestones: BTreeMap<MilestoneId, Milestone>,
    user_stories: BTreeMap<UserStoryId, UserStory>,
    tasks: BTreeMap<TaskId, Task>,
    issues: BTreeMap<IssueId, Issue>,
    votes: BTreeSet<(&'static str, i64, UserId)>,
    history: Vec<HistoryEntry>,
    feedback: Vec<FeedbackEntry>,
    templates: Vec<ProjectTemplate>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove_history_of(&mut self, target: HistoryTarget) {
        let key = target.key();
        self.history.retain(|entry| entry.key != key);
    }
}

/// Shared in-memory database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::query("in-memory store lock poisoned"))
    }

    /// Every repository port backed by `store`.
    pub fn repositories(store: &Arc<Self>) -> Repositories {
        Repositories {
            users: store.clone(),
            projects: store.clone(),
            memberships: store.clone(),
            roles: store.clone(),
            statuses: store.clone(),
            milestones: store.clone(),
            user_stories: store.clone(),
            tasks: store.clone(),
            issues: store.clone(),
            votes: store.clone(),
            history: store.clone(),
            feedback: store.clone(),
            templates: store.clone(),
        }
    }
}

fn missing(what: &str, id: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::missing(format!("{what} {id}"))
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::duplicate("username already in use"));
        }
        if tables.users.values().any(|u| u.email.matches(user.email.as_str())) {
            return Err(RepositoryError::duplicate("email already in use"));
        }
        let id = UserId::new(tables.next_id());
        let user = User::from_new(id, user);
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username.as_str() == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.matches(email))
            .cloned())
    }

    async fn find_by_recovery_token(
        &self,
        token: &str,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.recovery_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_email_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, RepositoryError> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let clash = tables.users.values().any(|u| {
            u.id != user.id && (u.username == user.username || u.email.matches(user.email.as_str()))
        });
        if clash {
            return Err(RepositoryError::duplicate("username or email already in use"));
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or_else(|| missing("user", user.id))?;
        *stored = user.clone();
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create(&self, project: NewProject) -> Result<Project, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.projects.values().any(|p| p.slug == project.slug) {
            return Err(RepositoryError::duplicate("project slug already in use"));
        }
        let id = ProjectId::new(tables.next_id());
        let project = Project::from_new(id, project);
        tables.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn find_by_id(&self, id: ProjectId) -> Result<Option<Project>, RepositoryError> {
        Ok(self.lock()?.projects.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Project>, RepositoryError> {
        Ok(self
            .lock()?
            .projects
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        Ok(self.lock()?.projects.values().cloned().collect())
    }

    async fn update(&self, project: &Project) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .projects
            .values()
            .any(|p| p.id != project.id && p.slug == project.slug)
        {
            return Err(RepositoryError::duplicate("project slug already in use"));
        }
        let stored = tables
            .projects
            .get_mut(&project.id)
            .ok_or_else(|| missing("project", project.id))?;
        *stored = project.clone();
        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.projects.remove(&id).is_none() {
            return Err(missing("project", id));
        }
        tables.last_refs.remove(&id);
        tables.roles.retain(|_, role| role.project != id);
        tables.memberships.retain(|_, m| m.project != id);
        tables.statuses.retain(|_, status| status.project != id);
        tables.milestones.retain(|_, milestone| milestone.project != id);
        let tasks: Vec<TaskId> = tables
            .tasks
            .values()
            .filter(|task| task.project == id)
            .map(|task| task.id)
            .collect();
        for task in tasks {
            tables.tasks.remove(&task);
            tables.remove_history_of(HistoryTarget::Task(task));
        }
        let stories: Vec<UserStoryId> = tables
            .user_stories
            .values()
            .filter(|story| story.project == id)
            .map(|story| story.id)
            .collect();
        for story in stories {
            tables.user_stories.remove(&story);
            tables.remove_history_of(HistoryTarget::UserStory(story));
        }
        let issues: Vec<IssueId> = tables
            .issues
            .values()
            .filter(|issue| issue.project == id)
            .map(|issue| issue.id)
            .collect();
        for issue in issues {
            tables.issues.remove(&issue);
            tables.remove_history_of(HistoryTarget::Issue(issue));
            let target = VoteTarget::Issue(issue);
            tables
                .votes
                .retain(|(kind, object, _)| (*kind, *object) != (target.kind(), target.object_id()));
        }
        let target = VoteTarget::Project(id);
        tables
            .votes
            .retain(|(kind, object, _)| (*kind, *object) != (target.kind(), target.object_id()));
        Ok(())
    }

    async fn next_reference(&self, id: ProjectId) -> Result<i64, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.projects.contains_key(&id) {
            return Err(missing("project", id));
        }
        let last = tables.last_refs.entry(id).or_insert(0);
        *last += 1;
        Ok(*last)
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn create(&self, membership: NewMembership) -> Result<Membership, RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(user) = membership.user
            && tables
                .memberships
                .values()
                .any(|m| m.project == membership.project && m.user == Some(user))
        {
            return Err(RepositoryError::duplicate(
                "The user is already member of the project",
            ));
        }
        let id = MembershipId::new(tables.next_id());
        let membership = Membership::from_new(id, membership);
        tables.memberships.insert(id, membership.clone());
        Ok(membership)
    }

    async fn find_by_id(&self, id: MembershipId) -> Result<Option<Membership>, RepositoryError> {
        Ok(self.lock()?.memberships.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Membership>, RepositoryError> {
        Ok(self
            .lock()?
            .memberships
            .values()
            .find(|m| m.token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_for_user(
        &self,
        project: ProjectId,
        user: UserId,
    ) -> Result<Option<Membership>, RepositoryError> {
        Ok(self
            .lock()?
            .memberships
            .values()
            .find(|m| m.project == project && m.user == Some(user))
            .cloned())
    }

    async fn list_by_project(
        &self,
        project: ProjectId,
    ) -> Result<Vec<Membership>, RepositoryError> {
        Ok(self
            .lock()?
            .memberships
            .values()
            .filter(|m| m.project == project)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Membership>, RepositoryError> {
        Ok(self
            .lock()?
            .memberships
            .values()
            .filter(|m| m.user == Some(user))
            .cloned()
            .collect())
    }

    async fn update(&self, membership: &Membership) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(user) = membership.user
            && tables.memberships.values().any(|m| {
                m.id != membership.id && m.project == membership.project && m.user == Some(user)
            })
        {
            return Err(RepositoryError::duplicate(
                "The user is already member of the project",
            ));
        }
        let stored = tables
            .memberships
            .get_mut(&membership.id)
            .ok_or_else(|| missing("membership", membership.id))?;
        *stored = membership.clone();
        Ok(())
    }

    async fn delete(&self, id: MembershipId) -> Result<(), RepositoryError> {
        self.lock()?
            .memberships
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("membership", id))
    }

    async fn reassign_role(&self, from: RoleId, to: RoleId) -> Result<(), RepositoryError> {
        for membership in self.lock()?.memberships.values_mut() {
            if membership.role == from {
                membership.role = to;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn create(&self, role: NewRole) -> Result<Role, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .roles
            .values()
            .any(|r| r.project == role.project && r.slug == role.slug)
        {
            return Err(RepositoryError::duplicate("role slug already in use"));
        }
        let id = RoleId::new(tables.next_id());
        let role = Role::from_new(id, role);
        tables.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn find_by_id(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.lock()?.roles.get(&id).cloned())
    }

    async fn list_by_project(&self, project: ProjectId) -> Result<Vec<Role>, RepositoryError> {
        let mut roles: Vec<Role> = self
            .lock()?
            .roles
            .values()
            .filter(|r| r.project == project)
            .cloned()
            .collect();
        roles.sort_by_key(|r| (r.order, r.id));
        Ok(roles)
    }

    async fn update(&self, role: &Role) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .roles
            .get_mut(&role.id)
            .ok_or_else(|| missing("role", role.id))?;
        *stored = role.clone();
        Ok(())
    }

    async fn delete(&self, id: RoleId) -> Result<(), RepositoryError> {
        self.lock()?
            .roles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("role", id))
    }
}

#[async_trait]
impl StatusRepository for MemoryStore {
    async fn create(&self, status: NewStatus) -> Result<Status, RepositoryError> {
        let mut tables = self.lock()?;
        let id = StatusId::new(tables.next_id());
        let status = Status::from_new(id, status);
        tables.statuses.insert(id, status.clone());
        Ok(status)
    }

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        Ok(self.lock()?.statuses.get(&id).cloned())
    }

    async fn list_by_project(
        &self,
        project: ProjectId,
        kind: StatusKind,
    ) -> Result<Vec<Status>, RepositoryError> {
        let mut statuses: Vec<Status> = self
            .lock()?
            .statuses
            .values()
            .filter(|s| s.project == project && s.kind == kind)
            .cloned()
            .collect();
        statuses.sort_by_key(|s| (s.order, s.id));
        Ok(statuses)
    }

    async fn update(&self, status: &Status) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .statuses
            .get_mut(&status.id)
            .ok_or_else(|| missing("status", status.id))?;
        *stored = status.clone();
        Ok(())
    }

    async fn delete(&self, id: StatusId) -> Result<(), RepositoryError> {
        self.lock()?
            .statuses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("status", id))
    }
}

#[async_trait]
impl UserStoryRepository for MemoryStore {
    async fn create(&self, story: NewUserStory) -> Result<UserStory, RepositoryError> {
        let mut tables = self.lock()?;
        let id = UserStoryId::new(tables.next_id());
        let story = UserStory::from_new(id, story);
        tables.user_stories.insert(id, story.clone());
        Ok(story)
    }

    async fn find_by_id(&self, id: UserStoryId) -> Result<Option<UserStory>, RepositoryError> {
        Ok(self.lock()?.user_stories.get(&id).cloned())
    }

    async fn find_by_ref(
        &self,
        project: ProjectId,
        reference: i64,
    ) -> Result<Option<UserStory>, RepositoryError> {
        Ok(self
            .lock()?
            .user_stories
            .values()
            .find(|s| s.project == project && s.reference == reference)
            .cloned())
    }

    async fn list(&self, filter: &UserStoryFilter) -> Result<Vec<UserStory>, RepositoryError> {
        let mut stories: Vec<UserStory> = self
            .lock()?
            .user_stories
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        stories.sort_by_key(|s| (s.backlog_order, s.id));
        Ok(stories)
    }

    async fn update(
        &self,
        story: &UserStory,
        expected_version: i32,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .user_stories
            .get_mut(&story.id)
            .ok_or_else(|| missing("user story", story.id))?;
        if stored.version != expected_version {
            return Err(RepositoryError::version_mismatch(
                expected_version,
                stored.version,
            ));
        }
        *stored = story.clone();
        Ok(())
    }

    async fn update_orders(
        &self,
        project: ProjectId,
        field: OrderField,
        orders: &[(UserStoryId, i64)],
    ) -> Result<Vec<UserStory>, RepositoryError> {
        let mut tables = self.lock()?;
        let mut previous = Vec::new();
        for (id, order) in orders {
            let Some(story) = tables.user_stories.get_mut(id) else {
                continue;
            };
            if story.project != project {
                continue;
            }
            previous.push(story.clone());
            story.set_order(field, *order);
            story.version += 1;
        }
        Ok(previous)
    }

    async fn delete(&self, id: UserStoryId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .user_stories
            .remove(&id)
            .ok_or_else(|| missing("user story", id))?;
        for task in tables.tasks.values_mut() {
            if task.user_story == Some(id) {
                task.user_story = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MilestoneRepository for MemoryStore {
    async fn create(&self, milestone: NewMilestone) -> Result<Milestone, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.milestones.values().any(|m| {
            m.project == milestone.project && (m.name == milestone.name || m.slug == milestone.slug)
        }) {
            return Err(RepositoryError::duplicate(
                "milestone name or slug already in use",
            ));
        }
        let id = MilestoneId::new(tables.next_id());
        let milestone = Milestone::from_new(id, milestone);
        tables.milestones.insert(id, milestone.clone());
        Ok(milestone)
    }

    async fn find_by_id(&self, id: MilestoneId) -> Result<Option<Milestone>, RepositoryError> {
        Ok(self.lock()?.milestones.get(&id).cloned())
    }

    async fn list(&self, filter: &MilestoneFilter) -> Result<Vec<Milestone>, RepositoryError> {
        let mut milestones: Vec<Milestone> = self
            .lock()?
            .milestones
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        milestones.sort_by(|a, b| {
            b.estimated_start
                .cmp(&a.estimated_start)
                .then(b.id.cmp(&a.id))
        });
        Ok(milestones)
    }

    async fn update(&self, milestone: &Milestone) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.milestones.values().any(|m| {
            m.id != milestone.id
                && m.project == milestone.project
                && (m.name == milestone.name || m.slug == milestone.slug)
        }) {
            return Err(RepositoryError::duplicate(
                "milestone name or slug already in use",
            ));
        }
        let stored = tables
            .milestones
            .get_mut(&milestone.id)
            .ok_or_else(|| missing("milestone", milestone.id))?;
        *stored = milestone.clone();
        Ok(())
    }

    async fn delete(&self, id: MilestoneId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .milestones
            .remove(&id)
            .ok_or_else(|| missing("milestone", id))?;
        for story in tables.user_stories.values_mut() {
            if story.milestone == Some(id) {
                story.milestone = None;
            }
        }
        for task in tables.tasks.values_mut() {
            if task.milestone == Some(id) {
                task.milestone = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create(&self, task: NewTask) -> Result<Task, RepositoryError> {
        let mut tables = self.lock()?;
        let id = TaskId::new(tables.next_id());
        let task = Task::from_new(id, task);
        tables.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, RepositoryError> {
        let mut tasks: Vec<Task> = self
            .lock()?
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.created_date, t.id));
        Ok(tasks)
    }

    async fn update(&self, task: &Task, expected_version: i32) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| missing("task", task.id))?;
        if stored.version != expected_version {
            return Err(RepositoryError::version_mismatch(
                expected_version,
                stored.version,
            ));
        }
        *stored = task.clone();
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<(), RepositoryError> {
        self.lock()?
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("task", id))
    }
}

#[async_trait]
impl IssueRepository for MemoryStore {
    async fn create(&self, issue: NewIssue) -> Result<Issue, RepositoryError> {
        let mut tables = self.lock()?;
        let id = IssueId::new(tables.next_id());
        let issue = Issue::from_new(id, issue);
        tables.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn find_by_id(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError> {
        Ok(self.lock()?.issues.get(&id).cloned())
    }

    async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>, RepositoryError> {
        let mut issues: Vec<Issue> = self
            .lock()?
            .issues
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        issues.sort_by(|a, b| b.created_date.cmp(&a.created_date).then(b.id.cmp(&a.id)));
        Ok(issues)
    }

    async fn update(&self, issue: &Issue, expected_version: i32) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .issues
            .get_mut(&issue.id)
            .ok_or_else(|| missing("issue", issue.id))?;
        if stored.version != expected_version {
            return Err(RepositoryError::version_mismatch(
                expected_version,
                stored.version,
            ));
        }
        *stored = issue.clone();
        Ok(())
    }

    async fn delete(&self, id: IssueId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .issues
            .remove(&id)
            .ok_or_else(|| missing("issue", id))?;
        let target = VoteTarget::Issue(id);
        tables
            .votes
            .retain(|(kind, object, _)| (*kind, *object) != (target.kind(), target.object_id()));
        Ok(())
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn add(&self, target: VoteTarget, user: UserId) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .votes
            .insert((target.kind(), target.object_id(), user)))
    }

    async fn remove(&self, target: VoteTarget, user: UserId) -> Result<bool, RepositoryError> {
        Ok(self
            .lock()?
            .votes
            .remove(&(target.kind(), target.object_id(), user)))
    }

    async fn voters(&self, target: VoteTarget) -> Result<Vec<UserId>, RepositoryError> {
        Ok(self
            .lock()?
            .votes
            .iter()
            .filter(|(kind, object, _)| *kind == target.kind() && *object == target.object_id())
            .map(|(_, _, user)| *user)
            .collect())
    }

    async fn count(&self, target: VoteTarget) -> Result<usize, RepositoryError> {
        Ok(self.voters(target).await?.len())
    }

    async fn starred_projects(&self, user: UserId) -> Result<Vec<ProjectId>, RepositoryError> {
        Ok(self
            .lock()?
            .votes
            .iter()
            .filter(|(kind, _, voter)| *kind == "project" && *voter == user)
            .map(|(_, object, _)| ProjectId::new(*object))
            .collect())
    }
}

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), RepositoryError> {
        self.lock()?.history.push(entry.clone());
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let mut entries: Vec<HistoryEntry> = self
            .lock()?
            .history
            .iter()
            .filter(|entry| entry.key == key)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    async fn find(&self, key: &str, id: Uuid) -> Result<Option<HistoryEntry>, RepositoryError> {
        Ok(self
            .lock()?
            .history
            .iter()
            .find(|entry| entry.key == key && entry.id == id)
            .cloned())
    }

    async fn update(&self, entry: &HistoryEntry) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .history
            .iter_mut()
            .find(|stored| stored.id == entry.id)
            .ok_or_else(|| missing("history entry", entry.id))?;
        stored.delete_comment_date = entry.delete_comment_date;
        stored.delete_comment_user = entry.delete_comment_user.clone();
        Ok(())
    }
}

#[async_trait]
impl FeedbackRepository for MemoryStore {
    async fn create(&self, feedback: NewFeedback) -> Result<FeedbackEntry, RepositoryError> {
        let mut tables = self.lock()?;
        let id = FeedbackId::new(tables.next_id());
        let entry = FeedbackEntry::from_new(id, feedback);
        tables.feedback.push(entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl TemplateRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<ProjectTemplate>, RepositoryError> {
        Ok(self.lock()?.templates.clone())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ProjectTemplate>, RepositoryError> {
        Ok(self
            .lock()?
            .templates
            .iter()
            .find(|template| template.slug == slug)
            .cloned())
    }

    async fn create(&self, template: &ProjectTemplate) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.templates.iter().any(|t| t.slug == template.slug) {
            return Err(RepositoryError::duplicate("template slug already in use"));
        }
        tables.templates.push(template.clone());
        Ok(())
    }
}
