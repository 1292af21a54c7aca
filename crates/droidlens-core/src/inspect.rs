//! Point-to-node hit testing and node path resolution.
//!
//! Operates purely on an in-memory node tree; no device access.

use crate::node::UiNode;

/// Finds the node under a screen point.
///
/// Among every positive-area node whose rectangle contains the point
/// (inclusive on all four edges), the smallest area wins - overlapping
/// ancestor/descendant rectangles are common in accessibility trees,
/// and the smallest is the element an operator intends to pick. Ties go
/// to the first node encountered in depth-first order. Parent and child
/// rectangles are not assumed to nest; source data may violate
/// containment.
pub fn find_node_at<'a>(root: &'a UiNode, x: i32, y: i32) -> Option<&'a UiNode> {
    fn walk<'a>(node: &'a UiNode, x: i32, y: i32, best: &mut Option<&'a UiNode>) {
        let rect = node.rect;
        if rect.width > 0 && rect.height > 0 && rect.contains(x, y) {
            let smaller = match best {
                Some(current) => rect.area() < current.rect.area(),
                None => true,
            };
            if smaller {
                *best = Some(node);
            }
        }
        for child in &node.children {
            walk(child, x, y, best);
        }
    }

    let mut best = None;
    walk(root, x, y, &mut best);
    best
}

/// Locates a node in the tree by reference identity and returns the
/// child-index path from the root (empty path means the root itself).
///
/// Identity, not value equality: two nodes can carry identical
/// attributes, and the caller wants the exact one it already holds -
/// typically to reselect it in a presentation tree after a hit test.
pub fn locate_by_identity(root: &UiNode, target: &UiNode) -> Option<Vec<usize>> {
    fn walk(node: &UiNode, target: *const UiNode, path: &mut Vec<usize>) -> bool {
        if std::ptr::eq(node, target) {
            return true;
        }
        for (i, child) in node.children.iter().enumerate() {
            path.push(i);
            if walk(child, target, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    let mut path = Vec::new();
    walk(root, target, &mut path).then_some(path)
}

/// Follows a child-index path from the root.
pub fn node_at_path<'a>(root: &'a UiNode, path: &[usize]) -> Option<&'a UiNode> {
    path.iter()
        .try_fold(root, |node, &index| node.children.get(index))
}
