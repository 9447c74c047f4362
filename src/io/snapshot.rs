//! Flat, serializable images of the store. Object references become id
//! references here; [`crate::model::space::Space`] reconstructs the graph.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::project::{Project, ProjectId, Tag, TagId};
use crate::model::task::{TagPosition, Task, TaskId};

/// A complete persisted image of tasks, projects, and tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSnapshot {
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
    #[serde(default)]
    pub projects: Vec<ProjectSnapshot>,
    #[serde(default)]
    pub tags: Vec<TagSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_positions: Vec<TagPositionSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub due_position: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPositionSnapshot {
    pub tag_id: TagId,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub id: ProjectId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub id: TagId,
    pub title: String,
}

impl TaskSnapshot {
    /// Flat image of a task. Children are not listed; the hierarchy is
    /// recovered from the `parent_id` back-references.
    pub fn of(task: &Task) -> Self {
        TaskSnapshot {
            id: task.id,
            title: task.title.clone(),
            notes: task.notes.clone(),
            created_at: task.created_at,
            done: task.done,
            due_at: task.due_at,
            project_id: task.project,
            tag_positions: task
                .tag_positions
                .iter()
                .map(|tp| TagPositionSnapshot {
                    tag_id: tp.tag,
                    position: tp.position,
                })
                .collect(),
            parent_id: task.parent,
            position: task.position,
            due_position: task.due_position,
        }
    }

    /// Rebuild a task from its image. Children start empty: a snapshot only
    /// records the upward link, and command replay re-adds one node at a time.
    pub fn to_task(&self) -> Task {
        Task {
            id: self.id,
            title: self.title.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            done: self.done,
            due_at: self.due_at,
            project: self.project_id,
            tag_positions: self
                .tag_positions
                .iter()
                .map(|tp| TagPosition {
                    tag: tp.tag_id,
                    position: tp.position,
                })
                .collect(),
            parent: self.parent_id,
            children: Vec::new(),
            position: self.position,
            due_position: self.due_position,
        }
    }

    /// Position on `tag`'s axis as recorded in this image.
    pub fn position_in(&self, tag: TagId) -> Option<i64> {
        self.tag_positions
            .iter()
            .find(|tp| tp.tag_id == tag)
            .map(|tp| tp.position)
    }
}

impl ProjectSnapshot {
    pub fn of(project: &Project) -> Self {
        ProjectSnapshot {
            id: project.id,
            title: project.title.clone(),
        }
    }
}

impl TagSnapshot {
    pub fn of(tag: &Tag) -> Self {
        TagSnapshot {
            id: tag.id,
            title: tag.title.clone(),
        }
    }
}
