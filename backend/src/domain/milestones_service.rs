//! Milestone (sprint) use-cases and the burndown statistics.

use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;

use crate::domain::milestone::{MILESTONE_NAME_MAX, burndown, validate_dates};
use crate::domain::permissions::{PermissionContext, ProjectPermission, Requester, rules};
use crate::domain::repositories::AccessCache;
use crate::domain::user_stories_service::authenticated;
use crate::domain::{
    Error, Milestone, MilestoneFilter, MilestoneId, MilestoneStats, NewMilestone, Project,
    ProjectId, Repositories, TaskFilter, UserStoryFilter, slug_candidates, slugify,
};

/// Fields of a milestone to create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMilestone {
    pub project: ProjectId,
    pub name: String,
    pub estimated_start: Option<NaiveDate>,
    pub estimated_finish: Option<NaiveDate>,
    pub disponibility: f64,
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MilestoneChanges {
    pub name: Option<String>,
    pub estimated_start: Option<NaiveDate>,
    pub estimated_finish: Option<NaiveDate>,
    pub closed: Option<bool>,
    pub disponibility: Option<f64>,
    pub order: Option<i32>,
}

/// Milestone service.
#[derive(Clone)]
pub struct MilestonesService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_field("name", "required", "This field is required."));
    }
    if name.chars().count() > MILESTONE_NAME_MAX {
        return Err(Error::invalid_field(
            "name",
            "max_length",
            format!("Ensure this field has no more than {MILESTONE_NAME_MAX} characters."),
        ));
    }
    Ok(name.to_owned())
}

fn required_date(value: Option<NaiveDate>, field: &str) -> Result<NaiveDate, Error> {
    value.ok_or_else(|| Error::invalid_field(field, "required", "This field is required."))
}

impl MilestonesService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn load(&self, id: MilestoneId) -> Result<(Milestone, Project), Error> {
        let milestone = self
            .repos
            .milestones
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Milestone not found"))?;
        let project = self.repos.project(milestone.project).await?;
        Ok((milestone, project))
    }

    async fn authorise(
        &self,
        requester: &Requester,
        project: &Project,
        action: &str,
    ) -> Result<(), Error> {
        let access = self.repos.access(requester, project).await?;
        rules::milestones().check(action, &PermissionContext::new(requester).with_project(&access))
    }

    async fn siblings(&self, project: ProjectId) -> Result<Vec<Milestone>, Error> {
        Ok(self
            .repos
            .milestones
            .list(&MilestoneFilter {
                project: Some(project),
                ..MilestoneFilter::default()
            })
            .await?)
    }

    /// Milestones the requester may view, latest first.
    pub async fn list(
        &self,
        requester: &Requester,
        filter: &MilestoneFilter,
    ) -> Result<Vec<Milestone>, Error> {
        let milestones = self.repos.milestones.list(filter).await?;
        let mut cache = AccessCache::default();
        let mut visible = Vec::with_capacity(milestones.len());
        for milestone in milestones {
            if cache
                .allows(&self.repos, requester, milestone.project, ProjectPermission::ViewMilestones)
                .await?
            {
                visible.push(milestone);
            }
        }
        Ok(visible)
    }

    /// Fetch one milestone the requester may view.
    pub async fn retrieve(&self, requester: &Requester, id: MilestoneId) -> Result<Milestone, Error> {
        let (milestone, project) = self.load(id).await?;
        self.authorise(requester, &project, "retrieve").await?;
        Ok(milestone)
    }

    /// Create a milestone owned by the requester. Names are unique per
    /// project; the slug takes the first free candidate.
    pub async fn create(
        &self,
        requester: &Requester,
        request: CreateMilestone,
    ) -> Result<Milestone, Error> {
        let project = self.repos.referenced_project(request.project).await?;
        self.authorise(requester, &project, "create").await?;
        let owner = authenticated(requester)?;
        let name = validate_name(&request.name)?;
        let start = required_date(request.estimated_start, "estimated_start")?;
        let finish = required_date(request.estimated_finish, "estimated_finish")?;
        validate_dates(start, finish)?;

        let existing = self.siblings(project.id).await?;
        if existing.iter().any(|milestone| milestone.name == name) {
            return Err(duplicated_name());
        }
        let slug = slug_candidates(&slugify(&name))
            .find(|candidate| existing.iter().all(|milestone| &milestone.slug != candidate))
            .unwrap_or_default();
        let order = request.order.unwrap_or_else(|| {
            existing.iter().map(|milestone| milestone.order).max().unwrap_or(0) + 1
        });
        let milestone = self
            .repos
            .milestones
            .create(NewMilestone {
                project: project.id,
                owner: Some(owner.id),
                name,
                slug,
                estimated_start: start,
                estimated_finish: finish,
                closed: false,
                disponibility: request.disponibility,
                order,
                created_date: self.clock.utc(),
            })
            .await?;
        tracing::info!(milestone = %milestone.id, project = %project.id, "milestone created");
        Ok(milestone)
    }

    /// Apply `changes`, keeping the start no later than the finish.
    ///
    /// Renaming keeps the original slug.
    pub async fn update(
        &self,
        requester: &Requester,
        id: MilestoneId,
        changes: MilestoneChanges,
    ) -> Result<Milestone, Error> {
        let (mut milestone, project) = self.load(id).await?;
        self.authorise(requester, &project, "partial_update").await?;

        if let Some(name) = changes.name.as_deref() {
            let name = validate_name(name)?;
            if name != milestone.name
                && self
                    .siblings(project.id)
                    .await?
                    .iter()
                    .any(|other| other.id != milestone.id && other.name == name)
            {
                return Err(duplicated_name());
            }
            milestone.name = name;
        }
        if let Some(start) = changes.estimated_start {
            milestone.estimated_start = start;
        }
        if let Some(finish) = changes.estimated_finish {
            milestone.estimated_finish = finish;
        }
        validate_dates(milestone.estimated_start, milestone.estimated_finish)?;
        if let Some(closed) = changes.closed {
            milestone.closed = closed;
        }
        if let Some(disponibility) = changes.disponibility {
            milestone.disponibility = disponibility;
        }
        if let Some(order) = changes.order {
            milestone.order = order;
        }
        milestone.modified_date = self.clock.utc();
        self.repos.milestones.update(&milestone).await?;
        Ok(milestone)
    }

    /// Delete a milestone. Its stories and tasks return to the backlog.
    pub async fn destroy(&self, requester: &Requester, id: MilestoneId) -> Result<(), Error> {
        let (milestone, project) = self.load(id).await?;
        self.authorise(requester, &project, "destroy").await?;
        self.repos.milestones.delete(milestone.id).await?;
        tracing::info!(milestone = %milestone.id, "milestone deleted");
        Ok(())
    }

    /// Completion counters and the day-by-day burndown of a milestone.
    pub async fn stats(&self, requester: &Requester, id: MilestoneId) -> Result<MilestoneStats, Error> {
        let (milestone, project) = self.load(id).await?;
        self.authorise(requester, &project, "stats").await?;

        let stories = self
            .repos
            .user_stories
            .list(&UserStoryFilter {
                project: Some(project.id),
                milestone: Some(milestone.id),
                ..UserStoryFilter::default()
            })
            .await?;
        let tasks = self
            .repos
            .tasks
            .list(&TaskFilter {
                project: Some(project.id),
                milestone: Some(milestone.id),
                ..TaskFilter::default()
            })
            .await?;
        let closed_on: Vec<_> = stories.iter().map(|story| story.finish_date).collect();

        Ok(MilestoneStats {
            days: burndown(milestone.estimated_start, milestone.estimated_finish, &closed_on),
            name: milestone.name,
            estimated_start: milestone.estimated_start,
            estimated_finish: milestone.estimated_finish,
            total_userstories: stories.len(),
            completed_userstories: stories.iter().filter(|story| story.is_closed).count(),
            total_tasks: tasks.len(),
            completed_tasks: tasks.iter().filter(|task| task.is_closed).count(),
            iocaine_doses: tasks.iter().filter(|task| task.is_iocaine).count(),
        })
    }
}

fn duplicated_name() -> Error {
    Error::invalid_field(
        "name",
        "duplicated",
        "A milestone with this name already exists in the project.",
    )
}

#[cfg(test)]
#[path = "milestones_service_tests.rs"]
mod tests;
