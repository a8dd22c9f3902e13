//! Builds a navigable tree out of the flat, depth-ordered record list a
//! lineage query returns, and tracks collapse/expand state for display.

use std::collections::{HashMap, HashSet};

use crate::types::ImageRecord;

#[derive(Debug, Clone)]
struct TreeNode {
    record: ImageRecord,
    children: Vec<usize>,
}

/// One row of the rendered tree, in display order.
#[derive(Debug)]
pub struct VisibleNode<'a> {
    pub record: &'a ImageRecord,
    /// Indentation depth in the rendered tree. Matches `generation_depth`
    /// unless an ancestor was deleted and this subtree got promoted.
    pub depth: usize,
    pub has_children: bool,
    pub collapsed: bool,
    pub is_current: bool,
}

/// A derivation tree assembled from the flat lineage list, plus view state:
/// the currently selected image and the set of collapsed nodes.
///
/// Collapsing a node hides its descendants but not the node itself; the
/// state is pure presentation and never touches the records. Selecting a
/// node re-centers the view without rebuilding.
#[derive(Debug, Default)]
pub struct ImageTree {
    nodes: Vec<TreeNode>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
    collapsed: HashSet<String>,
    current: Option<String>,
}

impl ImageTree {
    /// Builds the tree in a single pass.
    ///
    /// The input must be ordered parents-before-children, which the lineage
    /// query guarantees by sorting on generation depth then creation time:
    /// a parent's depth is strictly smaller than its child's, so by the time
    /// a record is processed its source is already in the index. A record
    /// whose source is absent from the list (deleted ancestor) is rendered
    /// as a root instead of being dropped.
    #[must_use]
    pub fn from_records(records: Vec<ImageRecord>) -> Self {
        let mut tree = Self::default();

        for record in records {
            let node_index = tree.nodes.len();
            let parent = record
                .source_image_id
                .as_deref()
                .and_then(|source_id| tree.index.get(source_id).copied());

            tree.index.insert(record.id.clone(), node_index);
            tree.nodes.push(TreeNode {
                record,
                children: Vec::new(),
            });

            match parent {
                Some(parent_index) => tree.nodes[parent_index].children.push(node_index),
                None => tree.roots.push(node_index),
            }
        }

        tree
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ImageRecord> {
        self.index.get(id).map(|&i| &self.nodes[i].record)
    }

    /// Re-centers the view on `id`. Returns false (and keeps the previous
    /// selection) when the id is not part of this tree.
    pub fn select(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.current = Some(id.to_string());
        true
    }

    #[must_use]
    pub fn current(&self) -> Option<&ImageRecord> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    /// Toggles the collapse state of a node. Only nodes with children can
    /// collapse; returns the new state, or None for leaves and unknown ids.
    pub fn toggle_collapsed(&mut self, id: &str) -> Option<bool> {
        let &node_index = self.index.get(id)?;
        if self.nodes[node_index].children.is_empty() {
            return None;
        }

        if self.collapsed.remove(id) {
            Some(false)
        } else {
            self.collapsed.insert(id.to_string());
            Some(true)
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    pub fn collapse_all(&mut self) {
        self.collapsed = self
            .nodes
            .iter()
            .filter(|node| !node.children.is_empty())
            .map(|node| node.record.id.clone())
            .collect();
    }

    /// Walks the tree in display order, skipping the descendants of
    /// collapsed nodes.
    #[must_use]
    pub fn visible(&self) -> Vec<VisibleNode<'_>> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.push_visible(root, 0, &mut rows);
        }
        rows
    }

    fn push_visible<'a>(&'a self, node_index: usize, depth: usize, rows: &mut Vec<VisibleNode<'a>>) {
        let node = &self.nodes[node_index];
        let collapsed = self.collapsed.contains(&node.record.id);

        rows.push(VisibleNode {
            record: &node.record,
            depth,
            has_children: !node.children.is_empty(),
            collapsed,
            is_current: self.current.as_deref() == Some(node.record.id.as_str()),
        });

        if !collapsed {
            for &child in &node.children {
                self.push_visible(child, depth + 1, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;
    use chrono::{Duration, Utc};

    fn record(id: &str, source: Option<&str>, root: &str, depth: i64, offset: i64) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            owner_id: Some("user-1".to_string()),
            name: format!("{id}.png"),
            visibility: Visibility::Unlisted,
            likes_count: 0,
            comments_count: 0,
            created_at: Utc::now() + Duration::seconds(offset),
            source_image_id: source.map(String::from),
            transformation_prompt: source.map(|_| "prompt".to_string()),
            root_image_id: root.to_string(),
            generation_depth: depth,
        }
    }

    /// a ── b ── d
    ///   └─ c
    fn sample() -> Vec<ImageRecord> {
        vec![
            record("a", None, "a", 0, 0),
            record("b", Some("a"), "a", 1, 1),
            record("c", Some("a"), "a", 1, 2),
            record("d", Some("b"), "a", 2, 3),
        ]
    }

    #[test]
    fn test_single_pass_build() {
        let tree = ImageTree::from_records(sample());
        assert_eq!(tree.len(), 4);

        let rows = tree.visible();
        let ids: Vec<&str> = rows.iter().map(|row| row.record.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "d", "c"]);

        let depths: Vec<usize> = rows.iter().map(|row| row.depth).collect();
        assert_eq!(depths, [0, 1, 2, 1]);
    }

    #[test]
    fn test_dangling_source_becomes_root() {
        // "a" was deleted; its children arrive without their parent.
        let records = vec![
            record("b", Some("a"), "a", 1, 0),
            record("d", Some("b"), "a", 2, 1),
        ];
        let tree = ImageTree::from_records(records);

        let rows = tree.visible();
        assert_eq!(rows[0].record.id, "b");
        assert_eq!(rows[0].depth, 0);
        assert_eq!(rows[1].record.id, "d");
        assert_eq!(rows[1].depth, 1);
    }

    #[test]
    fn test_collapse_hides_subtree_not_node() {
        let mut tree = ImageTree::from_records(sample());

        assert_eq!(tree.toggle_collapsed("b"), Some(true));
        assert!(tree.is_collapsed("b"));
        let ids: Vec<&str> = tree
            .visible()
            .iter()
            .map(|row| row.record.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);

        assert_eq!(tree.toggle_collapsed("b"), Some(false));
        assert_eq!(tree.visible().len(), 4);
    }

    #[test]
    fn test_leaves_do_not_collapse() {
        let mut tree = ImageTree::from_records(sample());
        assert_eq!(tree.toggle_collapsed("d"), None);
        assert_eq!(tree.toggle_collapsed("missing"), None);
    }

    #[test]
    fn test_collapse_all_and_expand_all() {
        let mut tree = ImageTree::from_records(sample());

        tree.collapse_all();
        let ids: Vec<&str> = tree
            .visible()
            .iter()
            .map(|row| row.record.id.as_str())
            .collect();
        assert_eq!(ids, ["a"]);

        tree.expand_all();
        assert_eq!(tree.visible().len(), 4);
    }

    #[test]
    fn test_select_recenters_without_rebuilding() {
        let mut tree = ImageTree::from_records(sample());

        assert!(tree.select("c"));
        assert_eq!(tree.current().unwrap().id, "c");

        assert!(!tree.select("missing"));
        assert_eq!(tree.current().unwrap().id, "c");

        let current_rows: Vec<&str> = tree
            .visible()
            .iter()
            .filter(|row| row.is_current)
            .map(|row| row.record.id.as_str())
            .collect();
        assert_eq!(current_rows, ["c"]);
    }
}
