//! A perspective: one filtered tree plus the interaction state over it —
//! the selection cursor, the edit-mode flag, and the drag-and-drop target.

use chrono::{Datelike, NaiveDate};

use crate::model::{DueBucket, Filter, ProjectId, Space, Task, TaskId};
use crate::tree::{NodeId, Tree, TreeError};

pub struct Perspective {
    filter: Filter,
    pub tree: Tree,
    pub current: Option<NodeId>,
    pub edit_mode: bool,
    drop_target: Option<NodeId>,
    drop_depth: i32,
}

impl Perspective {
    pub fn new(space: &Space, filter: Filter) -> Self {
        let tree = Tree::build(space, filter);
        let current = tree.first();
        Perspective {
            filter,
            tree,
            current,
            edit_mode: false,
            drop_target: None,
            drop_depth: 0,
        }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn current_task_id(&self) -> Option<TaskId> {
        self.current.and_then(|n| self.tree.task_id(n))
    }

    /// Write the tree back into the store (see [`Tree::commit`]).
    pub fn commit(&mut self, space: &mut Space) -> Result<(), TreeError> {
        self.tree.commit(space)
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Move the cursor to the pre-order successor. With no selection, the
    /// first top-level node is selected. At the end of the tree the cursor
    /// stays put.
    pub fn next(&mut self) {
        match self.current {
            None => self.current = self.tree.first(),
            Some(current) => {
                if let Some(next) = self.tree.succeeding(current) {
                    self.current = Some(next);
                }
            }
        }
    }

    /// Move the cursor to the pre-order predecessor. Stepping past the
    /// first item would land on the root; the cursor stays put instead.
    pub fn prev(&mut self) {
        match self.current {
            None => self.current = self.tree.first(),
            Some(current) => {
                if let Some(prev) = self.tree.preceding(current)
                    && !self.tree.is_root(prev)
                {
                    self.current = Some(prev);
                }
            }
        }
    }

    /// Select the node for `id`, clearing the selection on a miss.
    pub fn select(&mut self, id: TaskId) {
        self.current = self.tree.find(id);
    }

    /// Select a node and enter edit mode (click-to-edit).
    pub fn edit(&mut self, node: NodeId) {
        self.current = Some(node);
        self.edit_mode = true;
    }

    // -----------------------------------------------------------------------
    // Structural editing
    // -----------------------------------------------------------------------

    /// Create a new empty task and select it in edit mode.
    ///
    /// If the current node has children the new task drills in as its
    /// first child; otherwise it becomes the current node's next sibling.
    /// With no selection it becomes the first top-level node. The task
    /// starts with the facet that makes it a member of the active view:
    /// the focused tag, the focused due day, or the focused project (for
    /// top-level insertions).
    pub fn insert(&mut self, space: &Space) -> NodeId {
        self.edit_mode = false;
        let id = self.tree.next_id(space);
        let mut task = Task::new(id, "");
        match self.filter {
            Filter::Tag(tag) => task.add_tag(tag),
            Filter::Due(due) => {
                if let DueBucket::Day(day) = due.bucket {
                    task.due_at = due.today.with_day(day);
                }
            }
            Filter::Project(project) => {
                let top_level = match self.current {
                    None => true,
                    Some(current) if !self.tree.children(current).is_empty() => false,
                    Some(current) => self.tree.parent(current) == Some(self.tree.root()),
                };
                if top_level {
                    task.project = Some(project);
                }
            }
            Filter::All | Filter::Inbox => {}
        }
        let node = self.tree.adopt(task);
        match self.current {
            Some(current) if !self.tree.children(current).is_empty() => {
                self.tree.add_child_at(current, node, 0);
            }
            Some(current) => {
                self.tree.insert_sibling(current, node);
            }
            None => {
                let root = self.tree.root();
                self.tree.add_child_at(root, node, 0);
            }
        }
        self.current = Some(node);
        self.edit_mode = true;
        node
    }

    /// Remove the current node and its subtree from the view. The cursor
    /// moves to the first surviving node after the subtree, falling back
    /// to the predecessor, else clearing.
    pub fn remove(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        let successor = self.tree.successor_outside(current);
        let predecessor = self
            .tree
            .preceding(current)
            .filter(|p| !self.tree.is_root(*p));
        if let Some(parent) = self.tree.parent(current) {
            self.tree.remove_child(parent, current);
        }
        self.current = successor.or(predecessor);
        self.edit_mode = false;
    }

    pub fn indent(&mut self) {
        if !self.filter.allows_hierarchy() {
            return;
        }
        if let Some(current) = self.current {
            self.tree.indent(current);
        }
    }

    pub fn outdent(&mut self) {
        if !self.filter.allows_hierarchy() {
            return;
        }
        let Some(current) = self.current else {
            return;
        };
        if self.tree.parent(current) == Some(self.tree.root()) {
            return;
        }
        self.tree.outdent(current);
    }

    pub fn move_up(&mut self) {
        if !self.filter.allows_order() {
            return;
        }
        if let Some(current) = self.current {
            self.tree.move_up(current);
        }
    }

    pub fn move_down(&mut self) {
        if !self.filter.allows_order() {
            return;
        }
        if let Some(current) = self.current {
            self.tree.move_down(current);
        }
    }

    // -----------------------------------------------------------------------
    // Drag and drop
    // -----------------------------------------------------------------------

    pub fn drop_target(&self) -> Option<NodeId> {
        self.drop_target
    }

    pub fn set_drop_target(&mut self, target: Option<NodeId>) {
        self.drop_target = target;
        if let Some(target) = target {
            self.drop_depth = self.clamp_drop_depth(target, self.tree.depth(target));
        }
    }

    pub fn drop_depth(&self) -> i32 {
        self.drop_depth
    }

    /// Request a nesting depth for the pending drop. The value is clamped
    /// to what the target position allows: at most one level beneath the
    /// target, and no shallower than the deepest level that would not
    /// orphan siblings after the target.
    pub fn set_drop_depth(&mut self, depth: i32) {
        if let Some(target) = self.drop_target {
            self.drop_depth = self.clamp_drop_depth(target, depth);
        }
    }

    fn clamp_drop_depth(&self, target: NodeId, requested: i32) -> i32 {
        let target_depth = self.tree.depth(target);
        let max = target_depth + 1;
        let mut min = target_depth;
        let mut node = target;
        while min > 0 && self.tree.is_last_child(node) {
            match self.tree.parent(node) {
                Some(parent) if !self.tree.is_root(parent) => {
                    min -= 1;
                    node = parent;
                }
                _ => break,
            }
        }
        requested.clamp(min, max)
    }

    /// Complete a drag of the current node onto the drop target at the
    /// clamped drop depth.
    ///
    /// Dropping onto the root inserts at the top. Dropping one level
    /// beneath the target makes the node the target's first child; a
    /// shallower depth inserts it as the next sibling of the target's
    /// ancestor at that depth. Drops that would nest a node inside itself
    /// or its own subtree are refused.
    pub fn drop(&mut self) {
        if !self.filter.allows_hierarchy() {
            return;
        }
        let (Some(current), Some(target)) = (self.current, self.drop_target) else {
            self.drop_target = None;
            return;
        };
        let depth = self.drop_depth;
        self.drop_target = None;
        self.drop_depth = 0;

        if self.tree.is_root(target) {
            let root = self.tree.root();
            self.tree.add_child_at(root, current, 0);
            return;
        }
        let target_depth = self.tree.depth(target);
        if target == current && depth >= target_depth {
            return;
        }
        // Never drop a node into its own subtree
        let mut ancestor = self.tree.parent(target);
        while let Some(a) = ancestor {
            if a == current {
                return;
            }
            ancestor = self.tree.parent(a);
        }

        if depth > target_depth {
            self.tree.add_child_at(target, current, 0);
        } else {
            let mut anchor = target;
            for _ in 0..(target_depth - depth) {
                match self.tree.parent(anchor) {
                    Some(parent) if !self.tree.is_root(parent) => anchor = parent,
                    _ => break,
                }
            }
            if let Some(parent) = self.tree.parent(anchor) {
                self.tree.add_child_after(parent, current, anchor);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Field edits on the current task
    // -----------------------------------------------------------------------

    pub fn toggle_done(&mut self, space: &mut Space) {
        if let Some(id) = self.current_task_id()
            && let Some(task) = self.tree.task_mut(space, id)
        {
            task.done = !task.done;
        }
    }

    pub fn set_title(&mut self, space: &mut Space, title: impl Into<String>) {
        if let Some(id) = self.current_task_id()
            && let Some(task) = self.tree.task_mut(space, id)
        {
            task.title = title.into();
        }
    }

    pub fn set_notes(&mut self, space: &mut Space, notes: impl Into<String>) {
        if let Some(id) = self.current_task_id()
            && let Some(task) = self.tree.task_mut(space, id)
        {
            task.notes = notes.into();
        }
    }

    pub fn set_due(&mut self, space: &mut Space, due: Option<NaiveDate>) {
        if let Some(id) = self.current_task_id()
            && let Some(task) = self.tree.task_mut(space, id)
        {
            task.due_at = due;
        }
    }

    /// Assign the current task to a project. Only top-level tasks carry a
    /// project; nested tasks belong to their root's project, so the write
    /// is refused for them.
    pub fn set_project(&mut self, space: &mut Space, project: Option<ProjectId>) {
        let Some(current) = self.current else {
            return;
        };
        if project.is_some() && self.tree.parent(current) != Some(self.tree.root()) {
            return;
        }
        if let Some(id) = self.tree.task_id(current)
            && let Some(task) = self.tree.task_mut(space, id)
        {
            task.project = project;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TagId;

    fn task(space: &mut Space, id: i64, parent: Option<i64>, position: i64) {
        let mut t = Task::new(TaskId(id), format!("task {id}"));
        t.parent = parent.map(TaskId);
        t.position = position;
        if let Some(p) = parent
            && let Some(parent_task) = space.task_mut(TaskId(p))
        {
            parent_task.children.push(TaskId(id));
        }
        space.push_task(t);
    }

    /// 1(2(3(4,5),6)),7,8 — the fixture tree the mutation tables use.
    fn sample_space() -> Space {
        let mut space = Space::new();
        task(&mut space, 1, None, 0);
        task(&mut space, 2, Some(1), 0);
        task(&mut space, 3, Some(2), 0);
        task(&mut space, 4, Some(3), 0);
        task(&mut space, 5, Some(3), 1);
        task(&mut space, 6, Some(2), 1);
        task(&mut space, 7, None, 1);
        task(&mut space, 8, None, 2);
        space
    }

    fn ids(p: &Perspective) -> Vec<i64> {
        p.tree.flatten().iter().map(|t| t.0).collect()
    }

    fn current_id(p: &Perspective) -> Option<i64> {
        p.current_task_id().map(|t| t.0)
    }

    #[test]
    fn starts_on_first_top_level_node() {
        let space = sample_space();
        let p = Perspective::new(&space, Filter::All);
        assert_eq!(current_id(&p), Some(1));
    }

    #[test]
    fn next_walks_preorder_and_stops_at_the_end() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        for expected in [2, 3, 4, 5, 6, 7, 8, 8] {
            p.next();
            assert_eq!(current_id(&p), Some(expected));
        }
    }

    #[test]
    fn prev_never_selects_the_root() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.prev();
        assert_eq!(current_id(&p), Some(1));
        p.next();
        p.prev();
        assert_eq!(current_id(&p), Some(1));
    }

    #[test]
    fn navigation_with_no_selection_selects_first() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.current = None;
        p.next();
        assert_eq!(current_id(&p), Some(1));
        p.current = None;
        p.prev();
        assert_eq!(current_id(&p), Some(1));
    }

    #[test]
    fn insert_after_leaf_becomes_next_sibling() {
        let mut space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(7));
        p.insert(&space);
        assert!(p.edit_mode);
        assert_eq!(current_id(&p), Some(9));
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6, 7, 9, 8]);
        p.commit(&mut space).unwrap();
        assert_eq!(space.task(TaskId(9)).unwrap().position, 2);
    }

    #[test]
    fn insert_on_parent_drills_in_as_first_child() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(3));
        p.insert(&space);
        assert_eq!(ids(&p), vec![1, 2, 3, 9, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn insert_with_no_selection_goes_on_top() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.current = None;
        p.insert(&space);
        assert_eq!(ids(&p), vec![9, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn remove_selects_successor_outside_the_subtree() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(2));
        p.edit_mode = true;
        p.remove();
        assert_eq!(current_id(&p), Some(7));
        assert!(!p.edit_mode);
        assert_eq!(ids(&p), vec![1, 7, 8]);
    }

    #[test]
    fn remove_last_node_falls_back_to_predecessor() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(8));
        p.remove();
        assert_eq!(current_id(&p), Some(7));
    }

    #[test]
    fn remove_only_node_clears_selection() {
        let mut space = Space::new();
        task(&mut space, 1, None, 0);
        let mut p = Perspective::new(&space, Filter::All);
        p.remove();
        assert_eq!(p.current, None);
    }

    #[test]
    fn outdent_refused_at_top_level() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(7));
        p.outdent();
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn structural_edits_refused_in_flat_views() {
        let mut space = sample_space();
        let tag = space.add_tag("t");
        for id in [7, 8] {
            space.task_mut(TaskId(id)).unwrap().add_tag(tag);
        }
        let mut p = Perspective::new(&space, Filter::Tag(tag));
        p.select(TaskId(8));
        p.indent();
        assert_eq!(ids(&p), vec![7, 8]);
        // Reordering is allowed on the tag axis
        p.move_up();
        assert_eq!(ids(&p), vec![8, 7]);
    }

    #[test]
    fn moves_refused_in_all_view() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(8));
        p.move_up();
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn drop_onto_root_inserts_on_top() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::Inbox);
        p.select(TaskId(8));
        p.set_drop_target(Some(p.tree.root()));
        p.drop();
        assert_eq!(ids(&p), vec![8, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(p.drop_target(), None);
    }

    #[test]
    fn drop_below_target_makes_first_child() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::Inbox);
        p.select(TaskId(8));
        let target = p.tree.find(TaskId(7)).unwrap();
        p.set_drop_target(Some(target));
        p.set_drop_depth(1);
        p.drop();
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let node8 = p.tree.find(TaskId(8)).unwrap();
        assert_eq!(p.tree.parent(node8), Some(p.tree.find(TaskId(7)).unwrap()));
    }

    #[test]
    fn drop_at_ancestor_depth_inserts_after_ancestor() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::Inbox);
        p.select(TaskId(8));
        let target = p.tree.find(TaskId(5)).unwrap();
        p.set_drop_target(Some(target));
        // Depth 2 resolves to 5's ancestor at depth 2, node 3: 8 lands
        // after 3 among 2's children
        p.set_drop_depth(2);
        p.drop();
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 8, 6, 7]);
        let node8 = p.tree.find(TaskId(8)).unwrap();
        assert_eq!(p.tree.depth(node8), 2);
    }

    #[test]
    fn drop_into_own_subtree_is_refused() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::Inbox);
        p.select(TaskId(2));
        let target = p.tree.find(TaskId(5)).unwrap();
        p.set_drop_target(Some(target));
        p.set_drop_depth(4);
        p.drop();
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn drop_onto_itself_is_refused() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::Inbox);
        p.select(TaskId(7));
        let target = p.tree.find(TaskId(7)).unwrap();
        p.set_drop_target(Some(target));
        p.drop();
        assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn drop_depth_clamps_to_valid_range() {
        let space = sample_space();
        let mut p = Perspective::new(&space, Filter::Inbox);
        p.select(TaskId(8));

        // 5 sits at depth 3; one deeper is allowed
        let target = p.tree.find(TaskId(5)).unwrap();
        p.set_drop_target(Some(target));
        p.set_drop_depth(9);
        assert_eq!(p.drop_depth(), 4);
        // 5 is the last child of 3, but 3 has a later sibling: the floor
        // stops one level up
        p.set_drop_depth(-3);
        assert_eq!(p.drop_depth(), 2);

        // 6 ends a last-child chain all the way up: the floor reaches 0
        let target = p.tree.find(TaskId(6)).unwrap();
        p.set_drop_target(Some(target));
        p.set_drop_depth(-3);
        assert_eq!(p.drop_depth(), 0);

        // 4 has a later sibling, so nothing shallower than its own depth
        let target = p.tree.find(TaskId(4)).unwrap();
        p.set_drop_target(Some(target));
        p.set_drop_depth(-3);
        assert_eq!(p.drop_depth(), 3);
    }

    #[test]
    fn set_project_only_on_top_level_tasks() {
        let mut space = sample_space();
        let project = space.add_project("p");
        let mut p = Perspective::new(&space, Filter::All);

        p.select(TaskId(3));
        p.set_project(&mut space, Some(project));
        assert_eq!(space.task(TaskId(3)).unwrap().project, None);

        p.select(TaskId(7));
        p.set_project(&mut space, Some(project));
        assert_eq!(space.task(TaskId(7)).unwrap().project, Some(project));
        // Clearing is always allowed
        p.set_project(&mut space, None);
        assert_eq!(space.task(TaskId(7)).unwrap().project, None);
    }

    #[test]
    fn field_edits_reach_pending_tasks() {
        let mut space = sample_space();
        let mut p = Perspective::new(&space, Filter::All);
        p.select(TaskId(8));
        p.insert(&space);
        p.set_title(&mut space, "new title");
        p.toggle_done(&mut space);
        p.commit(&mut space).unwrap();
        let task = space.task(TaskId(9)).unwrap();
        assert_eq!(task.title, "new title");
        assert!(task.done);
    }

    #[test]
    fn insert_inherits_the_view_facet() {
        use chrono::NaiveDate;

        // Tag view: the new task carries the focused tag
        let mut space = sample_space();
        let tag = space.add_tag("t");
        space.task_mut(TaskId(7)).unwrap().add_tag(tag);
        let mut p = Perspective::new(&space, Filter::Tag(tag));
        p.insert(&space);
        p.commit(&mut space).unwrap();
        assert!(space.task(TaskId(9)).unwrap().has_tag(tag));

        // Due view: the new task is due on the focused day
        let mut space = sample_space();
        let today = NaiveDate::from_ymd_opt(2019, 11, 20).unwrap();
        let filter = Filter::Due(crate::model::DueFilter::anchored(
            DueBucket::Day(20),
            today,
        ));
        let mut p = Perspective::new(&space, filter);
        p.insert(&space);
        p.commit(&mut space).unwrap();
        assert_eq!(space.task(TaskId(9)).unwrap().due_at, Some(today));

        // Project view: a top-level insertion joins the project
        let mut space = sample_space();
        let project = space.add_project("p");
        let mut p = Perspective::new(&space, Filter::Project(project));
        p.insert(&space);
        p.commit(&mut space).unwrap();
        assert_eq!(space.task(TaskId(9)).unwrap().project, Some(project));
    }

    #[test]
    fn tag_views_ignore_unrelated_tags() {
        let mut space = sample_space();
        let tag = space.add_tag("t");
        let other = TagId(99);
        space.task_mut(TaskId(7)).unwrap().add_tag(tag);
        let p = Perspective::new(&space, Filter::Tag(other));
        assert_eq!(p.current, None);
        assert!(ids(&p).is_empty());
    }
}
