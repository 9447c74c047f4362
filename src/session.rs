//! The session wires the store, the active perspective, the command
//! recorder, and the repository together, and exposes the gesture surface.
//!
//! Every gesture runs to completion, commits the tree, and saves through
//! the repository before the next one is processed. Listeners are notified
//! once per gesture with the coalesced set of visible changes.

use chrono::Datelike;

use crate::command::{Command, CommandKind, Gesture, Recorder};
use crate::io::repository::{RepoError, Repository};
use crate::io::snapshot::TaskSnapshot;
use crate::model::{DueBucket, DueFilter, Filter, Space, calendar};
use crate::perspective::Perspective;
use crate::tree::{NodeId, TreeError};

/// What a completed gesture changed, for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Tree,
    Selection,
    EditMode,
    DropState,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct Session {
    repo: Box<dyn Repository>,
    pub space: Space,
    pub perspective: Perspective,
    recorder: Recorder,
    /// Image of the task under edit, for title-diff recording when the
    /// edit session ends.
    edit_origin: Option<TaskSnapshot>,
    listeners: Vec<Box<dyn FnMut(&[Change])>>,
}

impl Session {
    pub fn new(mut repo: Box<dyn Repository>, filter: Filter) -> Self {
        let space = Space::from_snapshot(repo.load());
        let perspective = Perspective::new(&space, filter);
        Session {
            repo,
            space,
            perspective,
            recorder: Recorder::new(),
            edit_origin: None,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&[Change]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&mut self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        for listener in &mut self.listeners {
            listener(changes);
        }
    }

    /// Commit the tree and persist the store.
    pub fn save(&mut self) -> Result<(), SessionError> {
        self.perspective.commit(&mut self.space)?;
        self.repo.save(&self.space.to_snapshot())?;
        Ok(())
    }

    /// Switch to a different perspective. In-flight edits are committed
    /// first; the recorder is cleared because its images reference the
    /// outgoing tree.
    pub fn focus(&mut self, filter: Filter) -> Result<(), SessionError> {
        self.save()?;
        self.refocus(filter);
        self.recorder.clear();
        Ok(())
    }

    /// Rebuild the perspective from the store without touching the
    /// recorder (membership refresh after a due/project change).
    fn refocus(&mut self, filter: Filter) {
        self.perspective = Perspective::new(&self.space, filter);
        self.edit_origin = None;
    }

    pub fn set_drop_target(&mut self, target: Option<NodeId>) {
        self.perspective.set_drop_target(target);
        self.notify(&[Change::DropState]);
    }

    pub fn set_drop_depth(&mut self, depth: i32) {
        self.perspective.set_drop_depth(depth);
        self.notify(&[Change::DropState]);
    }

    /// Execute one gesture: mutate, commit + save, record the invertible
    /// command if the gesture has one, notify listeners.
    pub fn send(&mut self, gesture: Gesture) -> Result<(), SessionError> {
        // Focus transitions manage their own save and recorder lifecycle
        match &gesture {
            Gesture::Focus(filter) => {
                self.focus(*filter)?;
                self.notify(&[Change::Tree, Change::Selection]);
                return Ok(());
            }
            Gesture::FocusUp => return self.focus_vertical(-7),
            Gesture::FocusDown => return self.focus_vertical(7),
            Gesture::FocusLeft => return self.move_due_focus(-1),
            Gesture::FocusRight => return self.move_due_focus(1),
            _ => {}
        }

        let before = self.current_snapshot();
        let mut changes: Vec<Change> = Vec::new();
        let mut refocus_after: Option<Filter> = None;

        match &gesture {
            Gesture::MoveNext => {
                self.perspective.next();
                self.retarget_edit_tracking();
                changes.push(Change::Selection);
            }
            Gesture::MovePrev => {
                self.perspective.prev();
                self.retarget_edit_tracking();
                changes.push(Change::Selection);
            }
            Gesture::ToggleDone => {
                self.perspective.toggle_done(&mut self.space);
                changes.push(Change::Tree);
            }
            Gesture::ToggleEditMode => {
                if self.perspective.edit_mode {
                    self.perspective.edit_mode = false;
                    self.flush_title_edit();
                } else {
                    self.perspective.edit_mode = true;
                    self.begin_edit_tracking();
                }
                changes.push(Change::EditMode);
            }
            Gesture::Insert => {
                if self.perspective.edit_mode {
                    self.flush_title_edit();
                }
                self.perspective.insert(&self.space);
                self.begin_edit_tracking();
                changes.extend([Change::Tree, Change::Selection, Change::EditMode]);
            }
            Gesture::Delete => {
                if self.perspective.edit_mode {
                    self.flush_title_edit();
                }
                self.edit_origin = None;
                self.perspective.remove();
                changes.extend([Change::Tree, Change::Selection, Change::EditMode]);
            }
            Gesture::Indent => {
                self.perspective.indent();
                changes.push(Change::Tree);
            }
            Gesture::Outdent => {
                self.perspective.outdent();
                changes.push(Change::Tree);
            }
            Gesture::Edit(id) => {
                if self.perspective.edit_mode {
                    self.flush_title_edit();
                }
                if let Some(node) = self.perspective.tree.find(*id) {
                    self.perspective.edit(node);
                    self.begin_edit_tracking();
                    changes.extend([Change::Selection, Change::EditMode]);
                }
            }
            Gesture::Select(id) => {
                if self.perspective.edit_mode {
                    self.flush_title_edit();
                }
                self.perspective.select(*id);
                if self.perspective.edit_mode {
                    self.begin_edit_tracking();
                }
                changes.push(Change::Selection);
            }
            Gesture::Drop => {
                self.perspective.drop();
                changes.extend([Change::Tree, Change::DropState]);
            }
            Gesture::SetDue(due) => {
                self.perspective.set_due(&mut self.space, *due);
                if self.perspective.filter().is_due() {
                    refocus_after = Some(self.perspective.filter());
                }
                changes.push(Change::Tree);
            }
            Gesture::SetProject(project) => {
                self.perspective.set_project(&mut self.space, *project);
                if self.perspective.filter().is_project() {
                    refocus_after = Some(self.perspective.filter());
                }
                changes.push(Change::Tree);
            }
            Gesture::MoveUp => {
                self.perspective.move_up();
                changes.push(Change::Tree);
            }
            Gesture::MoveDown => {
                self.perspective.move_down();
                changes.push(Change::Tree);
            }
            Gesture::AddProject(title) => {
                self.space.add_project(title.clone());
                changes.push(Change::Tree);
            }
            Gesture::DeleteProject(id) => {
                self.space.delete_project(*id);
                refocus_after = Some(self.perspective.filter());
                changes.push(Change::Tree);
            }
            Gesture::Undo => {
                if let Some(command) = self.recorder.undo() {
                    self.apply(&command);
                    changes.extend([Change::Tree, Change::Selection]);
                }
            }
            Gesture::Redo => {
                if let Some(command) = self.recorder.redo() {
                    self.apply(&command);
                    changes.extend([Change::Tree, Change::Selection]);
                }
            }
            Gesture::Focus(_)
            | Gesture::FocusUp
            | Gesture::FocusDown
            | Gesture::FocusLeft
            | Gesture::FocusRight => unreachable!("focus gestures are handled above"),
        }

        self.save()?;

        // Record after the save so the command's images carry the
        // committed parent links and positions
        if let Some(kind) = CommandKind::for_gesture(&gesture) {
            let command = Command {
                kind,
                before,
                after: self.current_snapshot(),
            };
            self.recorder.record(command);
        }

        if let Some(filter) = refocus_after {
            self.refocus(filter);
            changes.extend([Change::Tree, Change::Selection]);
        }

        self.notify(&changes);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Title-edit diffing
    // -----------------------------------------------------------------------

    fn current_snapshot(&self) -> Option<TaskSnapshot> {
        let id = self.perspective.current_task_id()?;
        self.perspective
            .tree
            .task(&self.space, id)
            .map(TaskSnapshot::of)
    }

    fn begin_edit_tracking(&mut self) {
        self.edit_origin = self.current_snapshot();
    }

    /// Record one `UpdateTitle` command if the tracked task's title changed
    /// since tracking began.
    fn flush_title_edit(&mut self) {
        let Some(origin) = self.edit_origin.take() else {
            return;
        };
        let now = self
            .perspective
            .tree
            .task(&self.space, origin.id)
            .map(TaskSnapshot::of);
        if let Some(now) = now
            && now.title != origin.title
        {
            self.recorder.record(Command {
                kind: CommandKind::UpdateTitle,
                before: Some(origin),
                after: Some(now),
            });
        }
    }

    /// Navigation while editing moves the edit session to the new current
    /// task: flush the old diff, start tracking the new one.
    fn retarget_edit_tracking(&mut self) {
        if self.perspective.edit_mode {
            self.flush_title_edit();
            self.begin_edit_tracking();
        }
    }

    // -----------------------------------------------------------------------
    // Command replay (undo/redo)
    // -----------------------------------------------------------------------

    /// Apply a recorded command image against the live tree. A command
    /// that references a task missing from the store or tree is a replay
    /// inconsistency: the recorder only holds commands for the current
    /// tree generation, so this fails fast instead of guessing.
    fn apply(&mut self, command: &Command) {
        match command.kind {
            CommandKind::ToggleDone => {
                let image = replay_image(command.before.as_ref());
                if let Some(task) = self.perspective.tree.task_mut(&mut self.space, image.id) {
                    task.done = !task.done;
                }
            }
            CommandKind::UpdateTitle => {
                let before = replay_image(command.before.as_ref());
                let after = replay_image(command.after.as_ref());
                if let Some(task) = self.perspective.tree.task_mut(&mut self.space, before.id) {
                    task.title = after.title.clone();
                }
            }
            CommandKind::UpdateDue => {
                let before = replay_image(command.before.as_ref());
                let after = replay_image(command.after.as_ref());
                if let Some(task) = self.perspective.tree.task_mut(&mut self.space, before.id) {
                    task.due_at = after.due_at;
                }
            }
            CommandKind::AddTask => {
                let image = replay_image(command.after.as_ref());
                let parent = image
                    .parent_id
                    .and_then(|p| self.perspective.tree.find(p))
                    .unwrap_or(self.perspective.tree.root());
                let position = match self.perspective.filter() {
                    Filter::Due(_) => image.due_position,
                    Filter::Tag(tag) => image.position_in(tag).unwrap_or(0),
                    _ => image.position,
                }
                .max(0) as usize;
                let node = self.perspective.tree.adopt(image.to_task());
                self.perspective.tree.add_child_at(parent, node, position);
                self.perspective.current = Some(node);
            }
            CommandKind::DeleteTask => {
                let image = replay_image(command.before.as_ref());
                let node = self
                    .perspective
                    .tree
                    .find(image.id)
                    .expect("replayed delete references a task missing from the tree");
                if let Some(parent) = self.perspective.tree.parent(node) {
                    self.perspective.tree.remove_child(parent, node);
                }
                if self.perspective.current == Some(node) {
                    self.perspective.current = self.perspective.tree.first();
                }
            }
            CommandKind::Indent => {
                let image = replay_image(command.before.as_ref());
                self.perspective.select(image.id);
                self.perspective.indent();
            }
            CommandKind::Outdent => {
                let image = replay_image(command.before.as_ref());
                self.perspective.select(image.id);
                self.perspective.outdent();
            }
            CommandKind::Drop => {
                // Restores the hierarchical location only; tag and due
                // positions of the originating view are not replayed
                let image = replay_image(command.after.as_ref());
                let parent = image
                    .parent_id
                    .and_then(|p| self.perspective.tree.find(p))
                    .unwrap_or(self.perspective.tree.root());
                let node = self
                    .perspective
                    .tree
                    .find(image.id)
                    .expect("replayed drop references a task missing from the tree");
                self.perspective
                    .tree
                    .add_child_at(parent, node, image.position.max(0) as usize);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Focus motions
    // -----------------------------------------------------------------------

    /// FocusUp/FocusDown: previous/next project in a project view, a week
    /// up/down on the month grid in a due view.
    fn focus_vertical(&mut self, delta: i64) -> Result<(), SessionError> {
        match self.perspective.filter() {
            Filter::Project(project) => {
                let Some(index) = self.space.projects.iter().position(|p| p.id == project)
                else {
                    return Ok(());
                };
                let target = if delta < 0 {
                    index.checked_sub(1)
                } else {
                    Some(index + 1)
                };
                if let Some(i) = target
                    && let Some(next) = self.space.projects.get(i)
                {
                    let filter = Filter::Project(next.id);
                    self.focus(filter)?;
                    self.notify(&[Change::Tree, Change::Selection]);
                }
                Ok(())
            }
            _ => self.move_due_focus(delta),
        }
    }

    /// Move the focused due day across the month grid. Only meaningful in
    /// a day-of-month due view; motions off the grid or outside the month
    /// are refused.
    fn move_due_focus(&mut self, delta: i64) -> Result<(), SessionError> {
        let Filter::Due(due) = self.perspective.filter() else {
            return Ok(());
        };
        let DueBucket::Day(day) = due.bucket else {
            return Ok(());
        };
        let Some(date) = due.today.with_day(day) else {
            return Ok(());
        };
        let index = calendar::grid_index(date) + delta;
        let Some(target) = calendar::date_at_grid_index(due.today, index) else {
            return Ok(());
        };
        self.focus(Filter::Due(DueFilter::anchored(
            DueBucket::Day(target.day()),
            due.today,
        )))?;
        self.notify(&[Change::Tree, Change::Selection]);
        Ok(())
    }
}

fn replay_image(image: Option<&TaskSnapshot>) -> &TaskSnapshot {
    image.expect("replayed command is missing its task image")
}
