//! Include trees for eager loading relations.

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Relations requested with `with(...)`, as a tree of dotted paths.
///
/// `with("posts.comments")` and `with("posts.author")` share the `posts`
/// node. Only the nodes of the tree are attached to records; relations
/// transited by a through relation are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: IndexMap<SmolStr, IncludeTree>,
}

impl IncludeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dotted relation path.
    pub fn add_path(&mut self, path: &str) -> &mut Self {
        let mut node = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            node = node.children.entry(SmolStr::new(segment)).or_default();
        }
        node
    }

    /// Nested includes of a relation.
    pub fn get(&self, name: &str) -> Option<&IncludeTree> {
        self.children.get(name)
    }

    /// Direct children, in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &IncludeTree)> {
        self.children.iter()
    }

    /// Check if nothing is included.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Every leaf path in dotted form.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, child) in &self.children {
            if child.is_empty() {
                out.push(name.to_string());
            } else {
                out.extend(child.paths().into_iter().map(|p| format!("{name}.{p}")));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paths_share_prefixes() {
        let mut tree = IncludeTree::new();
        tree.add_path("posts.comments");
        tree.add_path("posts.author");
        tree.add_path("site");

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get("posts").map(IncludeTree::len), Some(2));
        assert_eq!(tree.paths(), vec!["posts.comments", "posts.author", "site"]);
    }

    #[test]
    fn test_empty_segments_ignored() {
        let mut tree = IncludeTree::new();
        tree.add_path("comments.");
        assert_eq!(tree.paths(), vec!["comments"]);
    }
}
