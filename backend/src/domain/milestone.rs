//! Milestones (sprints): time boxes that user stories and tasks are planned
//! into, plus the burndown figures derived from them.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Error, MilestoneId, ProjectId, UserId};

/// Maximum milestone name length.
pub const MILESTONE_NAME_MAX: usize = 200;

/// Milestone data before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMilestone {
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub name: String,
    pub slug: String,
    pub estimated_start: NaiveDate,
    pub estimated_finish: NaiveDate,
    pub closed: bool,
    pub disponibility: f64,
    pub order: i32,
    pub created_date: DateTime<Utc>,
}

/// A stored milestone.
///
/// ## Invariants
/// - `(project, name)` and `(project, slug)` are unique.
/// - `estimated_start` is not after `estimated_finish`.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub id: MilestoneId,
    pub project: ProjectId,
    pub owner: Option<UserId>,
    pub name: String,
    pub slug: String,
    pub estimated_start: NaiveDate,
    pub estimated_finish: NaiveDate,
    pub closed: bool,
    pub disponibility: f64,
    pub order: i32,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

impl Milestone {
    /// Attach a store-assigned id to an unsaved milestone.
    pub fn from_new(id: MilestoneId, new_milestone: NewMilestone) -> Self {
        let NewMilestone {
            project,
            owner,
            name,
            slug,
            estimated_start,
            estimated_finish,
            closed,
            disponibility,
            order,
            created_date,
        } = new_milestone;
        Self {
            id,
            project,
            owner,
            name,
            slug,
            estimated_start,
            estimated_finish,
            closed,
            disponibility,
            order,
            created_date,
            modified_date: created_date,
        }
    }
}

/// Reject a date range that ends before it starts.
///
/// # Errors
/// Returns an invalid-field error on `estimated_finish`.
pub fn validate_dates(start: NaiveDate, finish: NaiveDate) -> Result<(), Error> {
    if start > finish {
        return Err(Error::invalid_field(
            "estimated_finish",
            "invalid_dates",
            "The estimated start must be previous to the estimated finish.",
        ));
    }
    Ok(())
}

/// Filters accepted by the milestone listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MilestoneFilter {
    pub project: Option<ProjectId>,
    pub closed: Option<bool>,
}

impl MilestoneFilter {
    /// Whether `milestone` passes every filter.
    pub fn matches(&self, milestone: &Milestone) -> bool {
        self.project.is_none_or(|project| milestone.project == project)
            && self.closed.is_none_or(|closed| milestone.closed == closed)
    }
}

/// One day of a sprint burndown.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BurndownDay {
    pub day: NaiveDate,
    /// Day of the month, for chart labels.
    pub name: u32,
    pub open_userstories: usize,
    pub optimal_userstories: f64,
}

/// Progress figures for one milestone.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MilestoneStats {
    pub name: String,
    pub estimated_start: NaiveDate,
    pub estimated_finish: NaiveDate,
    pub total_userstories: usize,
    pub completed_userstories: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub iocaine_doses: usize,
    pub days: Vec<BurndownDay>,
}

/// Open stories per day between `start` and `finish`, both included, next to
/// the ideal straight line from all open to none.
///
/// A story counts as done on a day when it closed before that day ended.
pub fn burndown(
    start: NaiveDate,
    finish: NaiveDate,
    closed_on: &[Option<DateTime<Utc>>],
) -> Vec<BurndownDay> {
    let total = closed_on.len();
    let as_f64 = |count: usize| u32::try_from(count).map_or(f64::from(u32::MAX), f64::from);
    let span = usize::try_from((finish - start).num_days()).unwrap_or(0);
    let per_day = if span > 0 {
        as_f64(total) / as_f64(span)
    } else {
        0.0
    };
    let mut optimal = as_f64(total);

    let mut days = Vec::new();
    let mut current = start;
    while current <= finish {
        let closed = closed_on
            .iter()
            .flatten()
            .filter(|date| date.date_naive() <= current)
            .count();
        days.push(BurndownDay {
            day: current,
            name: current.day(),
            open_userstories: total - closed,
            optimal_userstories: optimal,
        });
        optimal -= per_day;
        let Some(next) = current.checked_add_days(Days::new(1)) else {
            break;
        };
        current = next;
    }
    days
}
