use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::project::{ProjectId, TagId};

/// Stable task identifier. Real tasks always have ids >= 1; ids are
/// allocated monotonically and never reused, even after deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

/// A task's position on one tag's ordering axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPosition {
    pub tag: TagId,
    pub position: i64,
}

/// A task record in the store.
///
/// `parent`/`children` are the canonical hierarchy, independent of any
/// perspective. The order fields are independent axes: `position` orders
/// siblings in the hierarchical (Inbox/Project) views, `due_position`
/// orders tasks sharing a due bucket, and each `tag_positions` entry orders
/// the task within one tag's view. An axis is only meaningful among tasks
/// visible on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub done: bool,
    pub due_at: Option<NaiveDate>,
    pub project: Option<ProjectId>,
    pub tag_positions: Vec<TagPosition>,
    pub parent: Option<TaskId>,
    pub children: Vec<TaskId>,
    pub position: i64,
    pub due_position: i64,
}

impl Task {
    /// Create a fresh top-level task with no project, tags, or due date.
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Task {
            id,
            title: title.into(),
            notes: String::new(),
            created_at: Utc::now(),
            done: false,
            due_at: None,
            project: None,
            tag_positions: Vec::new(),
            parent: None,
            children: Vec::new(),
            position: 0,
            due_position: 0,
        }
    }

    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tag_positions.iter().any(|tp| tp.tag == tag)
    }

    /// Position of this task on `tag`'s axis, if it carries the tag.
    pub fn position_in(&self, tag: TagId) -> Option<i64> {
        self.tag_positions
            .iter()
            .find(|tp| tp.tag == tag)
            .map(|tp| tp.position)
    }

    /// Write this task's position on `tag`'s axis. No-op if the task does
    /// not carry the tag.
    pub fn set_position_in(&mut self, tag: TagId, position: i64) {
        if let Some(tp) = self.tag_positions.iter_mut().find(|tp| tp.tag == tag) {
            tp.position = position;
        }
    }

    pub fn add_tag(&mut self, tag: TagId) {
        if !self.has_tag(tag) {
            self.tag_positions.push(TagPosition { tag, position: 0 });
        }
    }

    pub fn remove_tag(&mut self, tag: TagId) {
        self.tag_positions.retain(|tp| tp.tag != tag);
    }
}
