use chrono::{Datelike, Local, NaiveDate};

use super::calendar::{first_day_of_month, last_day_of_month};
use super::project::{ProjectId, TagId};
use super::task::Task;

/// One of the three due-date partitions: before the current month, a day of
/// the current month, or after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    Past,
    Day(u32),
    Future,
}

/// A due-bucket predicate anchored to a reference day. Anchoring "today" at
/// construction keeps the predicate pure; a perspective is rebuilt on every
/// focus change, so the anchor never goes stale within one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueFilter {
    pub bucket: DueBucket,
    pub today: NaiveDate,
}

impl DueFilter {
    pub fn new(bucket: DueBucket) -> Self {
        Self::anchored(bucket, Local::now().date_naive())
    }

    pub fn anchored(bucket: DueBucket, today: NaiveDate) -> Self {
        DueFilter { bucket, today }
    }

    /// Bucket containing `date`, as seen from `today`.
    pub fn containing(date: NaiveDate, today: NaiveDate) -> Self {
        let bucket = if date < first_day_of_month(today) {
            DueBucket::Past
        } else if date > last_day_of_month(today) {
            DueBucket::Future
        } else {
            DueBucket::Day(date.day())
        };
        Self::anchored(bucket, today)
    }

    pub fn matches(&self, due: NaiveDate) -> bool {
        match self.bucket {
            DueBucket::Past => due < first_day_of_month(self.today),
            DueBucket::Future => due > last_day_of_month(self.today),
            DueBucket::Day(day) => {
                due.year() == self.today.year()
                    && due.month() == self.today.month()
                    && due.day() == day
            }
        }
    }
}

/// A perspective filter: which tasks a view shows, whether the canonical
/// hierarchy is shown and editable, and whether the view is reorderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    All,
    Inbox,
    Project(ProjectId),
    Tag(TagId),
    Due(DueFilter),
}

impl Filter {
    pub fn accepts(&self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Inbox => task.project.is_none(),
            Filter::Project(project) => task.project == Some(*project),
            Filter::Tag(tag) => task.has_tag(*tag),
            Filter::Due(due) => task.due_at.is_some_and(|d| due.matches(d)),
        }
    }

    /// True when the view shows the canonical parent/child structure.
    /// Tag and Due views flatten every accepted task to the top level.
    pub fn allows_hierarchy(&self) -> bool {
        matches!(self, Filter::All | Filter::Inbox | Filter::Project(_))
    }

    /// True when the view's order is user-editable. All is read-only with
    /// respect to ordering.
    pub fn allows_order(&self) -> bool {
        !matches!(self, Filter::All)
    }

    /// Sort key for top-level entries in a flat (Tag/Due) view.
    pub fn order_key(&self, task: &Task) -> i64 {
        match self {
            Filter::Due(_) => task.due_position,
            Filter::Tag(tag) => task.position_in(*tag).unwrap_or(0),
            _ => task.position,
        }
    }

    /// Whether two filters are the same kind of view, ignoring the focused
    /// project/tag/bucket.
    pub fn same_kind(&self, other: &Filter) -> bool {
        matches!(
            (self, other),
            (Filter::All, Filter::All)
                | (Filter::Inbox, Filter::Inbox)
                | (Filter::Project(_), Filter::Project(_))
                | (Filter::Tag(_), Filter::Tag(_))
                | (Filter::Due(_), Filter::Due(_))
        )
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Filter::Project(_))
    }

    pub fn is_due(&self) -> bool {
        matches!(self, Filter::Due(_))
    }
}
