//! The gesture vocabulary and the invertible-command recorder behind
//! undo/redo.
//!
//! A command stores flat before/after images of the task it touched; the
//! session replays an image against the live tree to undo or redo. Known
//! scope limits: `Drop` inversion restores the hierarchical position only
//! (not the tag or due axes of the originating view), and plain move-up/
//! move-down reorders are not recorded.

use chrono::NaiveDate;

use crate::io::snapshot::TaskSnapshot;
use crate::model::{Filter, ProjectId, TaskId};

/// Everything the outside world can ask the core to do, one gesture at a
/// time.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    MoveNext,
    MovePrev,
    ToggleDone,
    ToggleEditMode,
    Insert,
    Delete,
    Indent,
    Outdent,
    Edit(TaskId),
    Select(TaskId),
    Drop,
    SetDue(Option<NaiveDate>),
    SetProject(Option<ProjectId>),
    Focus(Filter),
    FocusLeft,
    FocusRight,
    FocusUp,
    FocusDown,
    MoveUp,
    MoveDown,
    AddProject(String),
    DeleteProject(ProjectId),
    Undo,
    Redo,
}

/// The recordable subset of gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ToggleDone,
    UpdateTitle,
    UpdateDue,
    AddTask,
    DeleteTask,
    Indent,
    Outdent,
    Drop,
}

impl CommandKind {
    /// The command a gesture records, if any. Navigation, selection, and
    /// focus changes are not undoable.
    pub fn for_gesture(gesture: &Gesture) -> Option<CommandKind> {
        match gesture {
            Gesture::ToggleDone => Some(CommandKind::ToggleDone),
            Gesture::Insert => Some(CommandKind::AddTask),
            Gesture::Delete => Some(CommandKind::DeleteTask),
            Gesture::Indent => Some(CommandKind::Indent),
            Gesture::Outdent => Some(CommandKind::Outdent),
            Gesture::Drop => Some(CommandKind::Drop),
            Gesture::SetDue(_) => Some(CommandKind::UpdateDue),
            _ => None,
        }
    }

    pub fn inverted(self) -> CommandKind {
        match self {
            CommandKind::AddTask => CommandKind::DeleteTask,
            CommandKind::DeleteTask => CommandKind::AddTask,
            CommandKind::Indent => CommandKind::Outdent,
            CommandKind::Outdent => CommandKind::Indent,
            CommandKind::ToggleDone
            | CommandKind::UpdateTitle
            | CommandKind::UpdateDue
            | CommandKind::Drop => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub before: Option<TaskSnapshot>,
    pub after: Option<TaskSnapshot>,
}

impl Command {
    pub fn inverted(&self) -> Command {
        Command {
            kind: self.kind.inverted(),
            before: self.after.clone(),
            after: self.before.clone(),
        }
    }
}

/// Undo/redo stacks. Recording a new command invalidates the redo stack.
#[derive(Debug, Default)]
pub struct Recorder {
    executed: Vec<Command>,
    undone: Vec<Command>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    pub fn record(&mut self, command: Command) {
        self.undone.clear();
        self.executed.push(command);
    }

    /// Pop the latest command and return its inverse for the session to
    /// apply. The forward command moves to the redo stack.
    pub fn undo(&mut self) -> Option<Command> {
        let command = self.executed.pop()?;
        let inverse = command.inverted();
        self.undone.push(command);
        Some(inverse)
    }

    /// Pop the latest undone command and return it for re-application.
    pub fn redo(&mut self) -> Option<Command> {
        let command = self.undone.pop()?;
        self.executed.push(command.clone());
        Some(command)
    }

    pub fn clear(&mut self) {
        self.executed.clear();
        self.undone.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }
}
