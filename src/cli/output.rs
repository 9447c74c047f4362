use crate::model::Space;
use crate::tree::{NodeId, Tree};

/// Render a perspective tree as an indented outline.
pub fn outline(space: &Space, tree: &Tree) -> String {
    let mut out = String::new();
    for node in tree.children(tree.root()) {
        outline_node(space, tree, *node, 0, &mut out);
    }
    out
}

fn outline_node(space: &Space, tree: &Tree, node: NodeId, depth: usize, out: &mut String) {
    if let Some(id) = tree.task_id(node)
        && let Some(task) = space.task(id)
    {
        let marker = if task.done { 'x' } else { ' ' };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("[{marker}] {:<4} {}", id.0, task.title));
        if let Some(due) = task.due_at {
            out.push_str(&format!("  (due {due})"));
        }
        if let Some(project) = task.project.and_then(|p| space.project(p)) {
            out.push_str(&format!("  @{}", project.title));
        }
        for tp in &task.tag_positions {
            if let Some(tag) = space.tag(tp.tag) {
                out.push_str(&format!("  #{}", tag.title));
            }
        }
        out.push('\n');
    }
    for child in tree.children(node) {
        outline_node(space, tree, *child, depth + 1, out);
    }
}
