use indexmap::IndexMap;

use crate::io::snapshot::{ProjectSnapshot, SpaceSnapshot, TagSnapshot, TaskSnapshot};

use super::project::{Project, ProjectId, Tag, TagId};
use super::task::{Task, TaskId};

/// The task store: every task (top-level roots and all descendants alike),
/// plus projects and tags. The map's insertion order is the persisted
/// store-list order that the tree commit's add/remove diff maintains.
#[derive(Debug, Default)]
pub struct Space {
    tasks: IndexMap<TaskId, Task>,
    pub projects: Vec<Project>,
    pub tags: Vec<Tag>,
    /// High-water mark for id allocation. Ids are never reused, even when
    /// the highest-numbered task is deleted.
    allocated: i64,
}

impl Space {
    pub fn new() -> Self {
        Space::default()
    }

    /// Next free task id: one past the highest id ever stored here.
    pub fn next_id(&self) -> TaskId {
        TaskId(1 + self.max_id())
    }

    pub fn max_id(&self) -> i64 {
        self.allocated
            .max(self.tasks.keys().map(|id| id.0).max().unwrap_or(0))
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Append a task to the end of the store list.
    pub fn push_task(&mut self, task: Task) {
        self.allocated = self.allocated.max(task.id.0);
        self.tasks.insert(task.id, task);
    }

    /// Remove a task from the store, detaching it from its canonical
    /// parent's child list. Descendants are not touched; a commit that
    /// removes a subtree removes each member through its own diff entry.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let task = self.tasks.shift_remove(&id)?;
        if let Some(parent_id) = task.parent
            && let Some(parent) = self.tasks.get_mut(&parent_id)
        {
            parent.children.retain(|c| *c != id);
        }
        Some(task)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_by_title(&self, title: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.title == title)
    }

    pub fn tag(&self, id: TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn tag_by_title(&self, title: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.title == title)
    }

    pub fn add_project(&mut self, title: impl Into<String>) -> ProjectId {
        let id = ProjectId(1 + self.projects.iter().map(|p| p.id.0).max().unwrap_or(0));
        self.projects.push(Project {
            id,
            title: title.into(),
        });
        id
    }

    /// Delete a project, clearing the reference from every member task.
    pub fn delete_project(&mut self, id: ProjectId) {
        for task in self.tasks.values_mut() {
            if task.project == Some(id) {
                task.project = None;
            }
        }
        self.projects.retain(|p| p.id != id);
    }

    pub fn add_tag(&mut self, title: impl Into<String>) -> TagId {
        let id = TagId(1 + self.tags.iter().map(|t| t.id.0).max().unwrap_or(0));
        self.tags.push(Tag {
            id,
            title: title.into(),
        });
        id
    }

    /// Reconstruct the object graph from a flat snapshot.
    ///
    /// Dangling references degrade instead of failing: a parent id that
    /// resolves to no task (or to the task itself) leaves the task at the
    /// top level, and unknown project/tag ids are dropped. Child lists are
    /// ordered by the children's `position` fields (ties by id) so that a
    /// reload is stable regardless of store-list order.
    pub fn from_snapshot(snapshot: SpaceSnapshot) -> Self {
        let projects: Vec<Project> = snapshot
            .projects
            .iter()
            .map(|p| Project {
                id: p.id,
                title: p.title.clone(),
            })
            .collect();
        let tags: Vec<Tag> = snapshot
            .tags
            .iter()
            .map(|t| Tag {
                id: t.id,
                title: t.title.clone(),
            })
            .collect();

        let mut tasks: IndexMap<TaskId, Task> = IndexMap::new();
        for ts in &snapshot.tasks {
            let mut task = ts.to_task();
            task.parent = None;
            task.project = task.project.filter(|id| projects.iter().any(|p| p.id == *id));
            task.tag_positions
                .retain(|tp| tags.iter().any(|t| t.id == tp.tag));
            tasks.insert(task.id, task);
        }

        // Wire up the hierarchy from the parent back-references
        for ts in &snapshot.tasks {
            let Some(parent_id) = ts.parent_id else {
                continue;
            };
            if parent_id == ts.id || !tasks.contains_key(&parent_id) {
                continue;
            }
            if let Some(task) = tasks.get_mut(&ts.id) {
                task.parent = Some(parent_id);
            }
            if let Some(parent) = tasks.get_mut(&parent_id) {
                parent.children.push(ts.id);
            }
        }

        let positions: IndexMap<TaskId, i64> =
            tasks.values().map(|t| (t.id, t.position)).collect();
        for task in tasks.values_mut() {
            task.children
                .sort_by_key(|c| (positions.get(c).copied().unwrap_or(0), c.0));
        }

        let allocated = tasks.keys().map(|id| id.0).max().unwrap_or(0);
        Space {
            tasks,
            projects,
            tags,
            allocated,
        }
    }

    /// Flatten the store back into a snapshot (inverse of `from_snapshot`).
    pub fn to_snapshot(&self) -> SpaceSnapshot {
        SpaceSnapshot {
            tasks: self.tasks.values().map(TaskSnapshot::of).collect(),
            projects: self.projects.iter().map(ProjectSnapshot::of).collect(),
            tags: self.tags.iter().map(TagSnapshot::of).collect(),
        }
    }
}
