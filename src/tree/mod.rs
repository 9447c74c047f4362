//! The ephemeral task tree: a rebuildable projection of the store for one
//! perspective filter.
//!
//! Nodes live in an arena indexed by [`NodeId`]; slot 0 is the synthetic
//! root, which wraps no task. Structural edits happen here and are written
//! back to the store in one place, [`Tree::commit`], which diffs the tree
//! against the snapshot taken at the previous commit to detect added and
//! removed tasks and rewrites order fields for the active filter's axis
//! only.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::model::{Filter, Space, Task, TaskId};

/// Index of a node in one tree's arena. Only meaningful for the tree that
/// issued it; a rebuilt tree issues fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

#[derive(Debug)]
struct Node {
    /// Backing task; `None` only for the synthetic root.
    task: Option<TaskId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Whether the filter predicate accepted the backing task. Context
    /// nodes (shown for orientation only) carry `false`.
    accepted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The flat-order reindex walk ran past every node in the tree. The
    /// traversal is corrupted; the commit is aborted before any order
    /// field was written.
    #[error("order walk exceeded {limit} nodes; tree traversal is corrupted")]
    UnboundedWalk { limit: usize },
}

pub struct Tree {
    filter: Filter,
    nodes: Vec<Node>,
    /// Tasks created in this tree that have not been committed to the
    /// store yet. Dropped (not persisted) if the tree is discarded first.
    pending: IndexMap<TaskId, Task>,
    /// Tasks reachable from the root at build time or at the last commit;
    /// the baseline for add/remove detection.
    original: Vec<TaskId>,
}

impl Tree {
    /// Project the store through `filter`.
    ///
    /// With hierarchy, accepted parentless tasks become roots (ordered by
    /// `position`) and every canonical descendant is attached beneath them,
    /// individually marked accepted or context. Without hierarchy (Tag and
    /// Due views), every accepted task becomes a direct child of the root,
    /// ordered by the filter's own axis, with one level of canonical
    /// children attached as context.
    pub fn build(space: &Space, filter: Filter) -> Tree {
        let mut tree = Tree {
            filter,
            nodes: vec![Node {
                task: None,
                parent: None,
                children: Vec::new(),
                accepted: false,
            }],
            pending: IndexMap::new(),
            original: Vec::new(),
        };

        if filter.allows_hierarchy() {
            let mut roots: Vec<&Task> = space
                .tasks()
                .filter(|t| filter.accepts(t) && t.parent.is_none())
                .collect();
            roots.sort_by_key(|t| (t.position, t.id));
            for root in roots {
                let node = tree.attach(ROOT, root.id, true);
                tree.attach_descendants(space, node, root);
            }
        } else {
            let mut members: Vec<&Task> = space.tasks().filter(|t| filter.accepts(t)).collect();
            members.sort_by_key(|t| (filter.order_key(t), t.id));
            for task in members {
                let node = tree.attach(ROOT, task.id, true);
                for child in &task.children {
                    if space.contains(*child) {
                        tree.attach(node, *child, false);
                    }
                }
            }
        }

        tree.original = tree.flatten();
        tree
    }

    fn attach(&mut self, parent: NodeId, task: TaskId, accepted: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            task: Some(task),
            parent: Some(parent),
            children: Vec::new(),
            accepted,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn attach_descendants(&mut self, space: &Space, node: NodeId, task: &Task) {
        for child_id in &task.children {
            if let Some(child) = space.task(*child_id) {
                let child_node = self.attach(node, child.id, self.filter.accepts(child));
                self.attach_descendants(space, child_node, child);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn is_root(&self, node: NodeId) -> bool {
        node == ROOT
    }

    /// The backing task id; `None` for the root.
    pub fn task_id(&self, node: NodeId) -> Option<TaskId> {
        self.nodes[node.0].task
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn is_accepted(&self, node: NodeId) -> bool {
        self.nodes[node.0].accepted
    }

    /// First top-level node, if any.
    pub fn first(&self) -> Option<NodeId> {
        self.nodes[ROOT.0].children.first().copied()
    }

    /// Nesting depth: root children are 0, the root itself -1.
    pub fn depth(&self, node: NodeId) -> i32 {
        let mut depth = -1;
        let mut n = node;
        while let Some(p) = self.nodes[n.0].parent {
            depth += 1;
            n = p;
        }
        depth
    }

    pub fn index_in_parent(&self, node: NodeId) -> usize {
        match self.nodes[node.0].parent {
            None => 0,
            Some(p) => self.nodes[p.0]
                .children
                .iter()
                .position(|c| *c == node)
                .unwrap_or(0),
        }
    }

    pub fn is_last_child(&self, node: NodeId) -> bool {
        match self.nodes[node.0].parent {
            None => true,
            Some(p) => self.index_in_parent(node) + 1 == self.nodes[p.0].children.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Pre-order successor: first child, else the next sibling of the
    /// nearest ancestor that has one. `None` at the end of the tree.
    pub fn succeeding(&self, node: NodeId) -> Option<NodeId> {
        if let Some(first) = self.nodes[node.0].children.first() {
            return Some(*first);
        }
        self.successor_outside(node)
    }

    /// The pre-order successor skipping `node`'s own subtree.
    pub fn successor_outside(&self, node: NodeId) -> Option<NodeId> {
        let mut n = node;
        while let Some(p) = self.nodes[n.0].parent {
            let siblings = &self.nodes[p.0].children;
            let index = self.index_in_parent(n);
            if index + 1 < siblings.len() {
                return Some(siblings[index + 1]);
            }
            n = p;
        }
        None
    }

    /// Pre-order predecessor: the previous sibling's deepest last
    /// descendant, or the parent when `node` is a first child. Returns the
    /// root itself for the first top-level node; callers treat "reached
    /// root" as "no predecessor".
    pub fn preceding(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let index = self.index_in_parent(node);
        if index == 0 {
            return Some(parent);
        }
        let mut n = self.nodes[parent.0].children[index - 1];
        while let Some(last) = self.nodes[n.0].children.last() {
            n = *last;
        }
        Some(n)
    }

    pub fn preceding_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let index = self.index_in_parent(node);
        if index == 0 {
            return None;
        }
        Some(self.nodes[parent.0].children[index - 1])
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes[node.0].parent?;
        let siblings = &self.nodes[parent.0].children;
        let index = self.index_in_parent(node);
        siblings.get(index + 1).copied()
    }

    /// The `n`th node in pre-order, counting the first top-level node as 0.
    pub fn nth(&self, n: usize) -> Option<NodeId> {
        let mut node = Some(ROOT);
        for _ in 0..=n {
            node = node.and_then(|x| self.succeeding(x));
        }
        node
    }

    /// Level-order search by task id. Accepted nodes sit closer to the
    /// root than context duplicates, so they are found first.
    pub fn find(&self, id: TaskId) -> Option<NodeId> {
        let mut queue: VecDeque<NodeId> = self.nodes[ROOT.0].children.iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if self.nodes[node.0].task == Some(id) {
                return Some(node);
            }
            queue.extend(self.nodes[node.0].children.iter().copied());
        }
        None
    }

    /// Task ids reachable from the root, pre-order.
    pub fn flatten(&self) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[ROOT.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if let Some(id) = self.nodes[node.0].task {
                out.push(id);
            }
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    /// Task ids of the filter members (accepted nodes), pre-order. Context
    /// nodes are excluded.
    pub fn members(&self) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[ROOT.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let n = &self.nodes[node.0];
            if n.accepted
                && let Some(id) = n.task
            {
                out.push(id);
            }
            stack.extend(n.children.iter().rev().copied());
        }
        out
    }

    // -----------------------------------------------------------------------
    // Task access (store + pending overlay)
    // -----------------------------------------------------------------------

    pub fn task<'a>(&'a self, space: &'a Space, id: TaskId) -> Option<&'a Task> {
        self.pending.get(&id).or_else(|| space.task(id))
    }

    pub fn task_mut<'a>(&'a mut self, space: &'a mut Space, id: TaskId) -> Option<&'a mut Task> {
        if self.pending.contains_key(&id) {
            self.pending.get_mut(&id)
        } else {
            space.task_mut(id)
        }
    }

    /// Next free task id, counting uncommitted tasks as taken.
    pub fn next_id(&self, space: &Space) -> TaskId {
        let pending_max = self.pending.keys().map(|id| id.0).max().unwrap_or(0);
        TaskId(1 + space.max_id().max(pending_max))
    }

    /// Take custody of a freshly created task and return a detached node
    /// for it. The task reaches the store only when a commit finds the
    /// node still attached; an unattached or re-removed node's task is
    /// silently dropped.
    pub fn adopt(&mut self, task: Task) -> NodeId {
        let task_id = task.id;
        self.pending.insert(task_id, task);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            task: Some(task_id),
            parent: None,
            children: Vec::new(),
            accepted: true,
        });
        id
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent {
            self.nodes[parent.0].children.retain(|c| *c != node);
            self.nodes[node.0].parent = None;
        }
    }

    /// Detach `child` from `parent`'s child list. No-op when `child` is not
    /// a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes[child.0].parent == Some(parent) {
            self.detach(child);
        }
    }

    /// Insert `child` under `parent` at `position` (clamped to the child
    /// list). When the child already lives under this parent, a requested
    /// index beyond `own_index + 1` is decremented to compensate for the
    /// removal shift; an index of exactly `own_index + 1` therefore lands
    /// after the next sibling.
    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, position: usize) {
        let mut position = position;
        if self.nodes[child.0].parent == Some(parent)
            && let Some(index) = self.nodes[parent.0].children.iter().position(|c| *c == child)
            && position > index + 1
        {
            position -= 1;
        }
        self.detach(child);
        let end = self.nodes[parent.0].children.len();
        if position > end {
            position = end;
        }
        self.nodes[parent.0].children.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Insert `child` under `parent` immediately after `after`. No-op when
    /// `after` is not a child of `parent`.
    pub fn add_child_after(&mut self, parent: NodeId, child: NodeId, after: NodeId) {
        if let Some(index) = self.nodes[parent.0].children.iter().position(|c| *c == after) {
            self.add_child_at(parent, child, index + 1);
        }
    }

    pub fn add_last_child(&mut self, parent: NodeId, child: NodeId) {
        let end = self.nodes[parent.0].children.len();
        self.add_child_at(parent, child, end);
    }

    /// Insert `new` as the next sibling of `node`.
    pub fn insert_sibling(&mut self, node: NodeId, new: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent {
            self.add_child_after(parent, new, node);
        }
    }

    /// Make `node` the last child of its preceding sibling. No-op without
    /// a preceding sibling.
    pub fn indent(&mut self, node: NodeId) {
        let Some(prev) = self.preceding_sibling(node) else {
            return;
        };
        let end = self.nodes[prev.0].children.len();
        self.add_child_at(prev, node, end);
    }

    /// Move `node` up one level, becoming the next sibling of its former
    /// parent. The former parent's children after `node` move along under
    /// it, preserving their order. No-op when the parent is the root.
    pub fn outdent(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let Some(grand) = self.nodes[parent.0].parent else {
            return;
        };
        let position = self.index_in_parent(node);
        self.add_child_after(grand, node, parent);
        let trailing: Vec<NodeId> = self.nodes[parent.0].children[position..].to_vec();
        for sibling in trailing {
            self.add_last_child(node, sibling);
        }
    }

    /// Swap with the previous sibling; a first child moves up to become its
    /// parent's previous sibling. No-op for top-level first nodes.
    pub fn move_up(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let index = self.index_in_parent(node);
        if index > 0 {
            self.add_child_at(parent, node, index - 1);
            return;
        }
        let Some(grand) = self.nodes[parent.0].parent else {
            return;
        };
        let parent_index = self.index_in_parent(parent);
        self.add_child_at(grand, node, parent_index);
    }

    /// Swap with the next sibling; a last child moves down to become its
    /// parent's next sibling. No-op for the last top-level node.
    pub fn move_down(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let index = self.index_in_parent(node);
        if index + 1 < self.nodes[parent.0].children.len() {
            self.add_child_at(parent, node, index + 1);
            return;
        }
        let Some(grand) = self.nodes[parent.0].parent else {
            return;
        };
        self.add_child_after(grand, node, parent);
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Reconcile the tree back into the store.
    ///
    /// Tasks reachable now but not at the last commit are appended to the
    /// store; tasks no longer reachable are removed. Surviving tasks get
    /// their order fields rewritten for the active filter's axis only:
    /// hierarchical views rewrite `position` (and the parent/children
    /// links the tree structure implies), Due and Tag views rewrite only
    /// their own axis. Tasks outside the view are never touched.
    pub fn commit(&mut self, space: &mut Space) -> Result<(), TreeError> {
        let current = self.flatten();
        let original_set: HashSet<TaskId> = self.original.iter().copied().collect();
        let current_set: HashSet<TaskId> = current.iter().copied().collect();

        for id in &current {
            if !original_set.contains(id)
                && let Some(task) = self.pending.shift_remove(id)
            {
                space.push_task(task);
            }
        }
        // Created tasks that never reached the tree (or were removed again
        // before this commit) are discarded, not persisted
        self.pending.clear();

        if self.filter.allows_hierarchy() {
            self.sync_hierarchy(space, &current_set, &original_set);
        } else {
            self.reindex_flat(space)?;
        }

        for id in &self.original {
            if !current_set.contains(id) {
                space.remove_task(*id);
            }
        }

        self.original = current;
        Ok(())
    }

    /// Write the tree's structure back through the task back-references:
    /// parent links, child lists, and sibling positions at every level.
    /// Canonical children that were never part of this tree (invisible to
    /// the filter) are preserved at the tail of their parent's list.
    fn sync_hierarchy(
        &self,
        space: &mut Space,
        current: &HashSet<TaskId>,
        original: &HashSet<TaskId>,
    ) {
        let mut stack: Vec<NodeId> = self.nodes[ROOT.0].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
            let Some(task_id) = self.nodes[node.0].task else {
                continue;
            };
            let parent_task = self.nodes[node.0]
                .parent
                .and_then(|p| self.nodes[p.0].task);
            let mut children: Vec<TaskId> = self.nodes[node.0]
                .children
                .iter()
                .filter_map(|c| self.nodes[c.0].task)
                .collect();
            let position = self.index_in_parent(node) as i64;
            if let Some(task) = space.task_mut(task_id) {
                let invisible: Vec<TaskId> = task
                    .children
                    .iter()
                    .copied()
                    .filter(|c| !current.contains(c) && !original.contains(c))
                    .collect();
                children.extend(invisible);
                task.parent = parent_task;
                task.children = children;
                task.position = position;
            }
        }
    }

    /// Walk the top-level sibling chain once, assigning a monotonically
    /// increasing counter to the active flat axis. Bounded: visiting more
    /// nodes than the tree holds means the sibling chain is corrupted, and
    /// the commit aborts before writing anything.
    fn reindex_flat(&self, space: &mut Space) -> Result<(), TreeError> {
        let limit = self.nodes.len();
        let mut order: Vec<TaskId> = Vec::new();
        let mut steps = 0usize;
        let mut node = self.succeeding(ROOT);
        while let Some(n) = node {
            steps += 1;
            if steps > limit {
                return Err(TreeError::UnboundedWalk { limit });
            }
            if let Some(id) = self.nodes[n.0].task {
                order.push(id);
            }
            node = self.next_sibling(n);
        }

        for (position, id) in order.into_iter().enumerate() {
            if let Some(task) = space.task_mut(id) {
                match self.filter {
                    Filter::Due(_) => task.due_position = position as i64,
                    Filter::Tag(tag) => task.set_position_in(tag, position as i64),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
