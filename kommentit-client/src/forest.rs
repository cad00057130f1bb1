use std::collections::HashMap;

use crate::api::{Comment, CommentId};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeIdx(pub(crate) usize);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    /// The comment as received, with its `children` always empty
    pub comment: Comment,

    pub parent: Option<NodeIdx>,

    /// Replies, in the order the server listed them
    pub children: Vec<NodeIdx>,
}

/// UI-only state of a comment
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CommentState {
    /// None until the user toggles the comment; the view then shows it collapsed
    pub expanded: Option<bool>,

    /// Whether the current session likes this comment
    pub liked: bool,

    /// Like count, as last known locally
    pub likes: u32,

    /// Whether the comment or one of its replies matches the nickname filter
    pub has_nickname: bool,
}

/// Comments of an article, arranged as reply trees
///
/// Nodes live in an arena and refer to each other by index. UI state lives in a
/// separate table keyed by comment id, whose entries get replaced as a whole.
#[derive(Clone, Debug, Default)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: Vec<NodeIdx>,
    index: HashMap<CommentId, NodeIdx>,
    states: HashMap<CommentId, CommentState>,
}

/// Flattens comments nested by the server into a pre-order list, emptying every
/// `children` along the way
pub fn flatten(comments: Vec<Comment>) -> Vec<Comment> {
    let mut res = Vec::with_capacity(comments.len());
    // stack of iterators to not recurse on deep threads
    let mut stack = vec![comments.into_iter()];
    while let Some(it) = stack.last_mut() {
        match it.next() {
            None => {
                stack.pop();
            }
            Some(mut c) => {
                let children = std::mem::take(&mut c.children);
                res.push(c);
                if !children.is_empty() {
                    stack.push(children.into_iter());
                }
            }
        }
    }
    res
}

impl Forest {
    pub fn new() -> Forest {
        Forest::default()
    }

    /// Builds the reply trees of a page of comments
    ///
    /// A comment is attached to its parent if the parent is anywhere in the page.
    /// Any other comment, including one whose parent is not in the page, becomes a
    /// root. Siblings keep the page order. Identifiers are not deduplicated: a
    /// repeated identifier refers to its latest occurrence.
    ///
    /// Links that would close a cycle are not made, the comment becomes a root.
    pub fn build(page: Vec<Comment>) -> Forest {
        let comments = flatten(page);
        let mut res = Forest {
            nodes: Vec::with_capacity(comments.len()),
            roots: Vec::new(),
            index: HashMap::with_capacity(comments.len()),
            states: HashMap::with_capacity(comments.len()),
        };
        for comment in comments {
            let idx = NodeIdx(res.nodes.len());
            if res.index.insert(comment.id.clone(), idx).is_some() {
                tracing::warn!(comment = %comment.id, "duplicate comment id in page");
            }
            res.states.insert(
                comment.id.clone(),
                CommentState {
                    likes: comment.likes,
                    ..CommentState::default()
                },
            );
            res.nodes.push(Node {
                comment,
                parent: None,
                children: Vec::new(),
            });
        }
        for i in 0..res.nodes.len() {
            let idx = NodeIdx(i);
            let parent = res.nodes[i]
                .comment
                .parent_id
                .as_ref()
                .and_then(|p| res.index.get(p))
                .copied();
            match parent {
                Some(p) if !res.is_ancestor_or_self(idx, p) => {
                    res.nodes[i].parent = Some(p);
                    res.nodes[p.0].children.push(idx);
                }
                Some(_) => {
                    tracing::warn!(comment = %res.nodes[i].comment.id, "reply cycle in page");
                    res.roots.push(idx);
                }
                None => res.roots.push(idx),
            }
        }
        res
    }

    fn is_ancestor_or_self(&self, ancestor: NodeIdx, idx: NodeIdx) -> bool {
        let mut cur = Some(idx);
        while let Some(i) = cur {
            if i == ancestor {
                return true;
            }
            cur = self.nodes[i.0].parent;
        }
        false
    }

    /// Appends a later page to this forest
    ///
    /// Roots of the page whose parent is already in this forest become its last
    /// replies; the other ones are appended as roots. A comment loaded again
    /// takes its likes from the page and keeps its expanded flag.
    pub fn graft(&mut self, page: Forest) {
        let base = self.nodes.len();
        let shift = |i: NodeIdx| NodeIdx(i.0 + base);
        let Forest {
            nodes,
            roots,
            index,
            states,
        } = page;
        let attach_to = roots
            .iter()
            .map(|r| {
                nodes[r.0]
                    .comment
                    .parent_id
                    .as_ref()
                    .and_then(|p| self.index.get(p))
                    .copied()
            })
            .collect::<Vec<_>>();
        self.nodes.extend(nodes.into_iter().map(|mut n| {
            n.parent = n.parent.map(shift);
            for c in n.children.iter_mut() {
                *c = shift(*c);
            }
            n
        }));
        for (root, parent) in roots.into_iter().zip(attach_to) {
            let root = shift(root);
            match parent {
                Some(p) => {
                    self.nodes[p.0].children.push(root);
                    self.nodes[root.0].parent = Some(p);
                }
                None => self.roots.push(root),
            }
        }
        for (id, idx) in index {
            if self.index.contains_key(&id) {
                tracing::warn!(comment = %id, "comment loaded twice");
            }
            self.index.insert(id, shift(idx));
        }
        for (id, state) in states {
            let expanded = self.states.get(&id).and_then(|s| s.expanded);
            self.states.insert(
                id,
                CommentState {
                    expanded: expanded.or(state.expanded),
                    ..state
                },
            );
        }
    }

    /// Number of nodes, duplicates included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeIdx] {
        &self.roots
    }

    /// Panics if `idx` does not come from this forest
    pub fn node(&self, idx: NodeIdx) -> &Node {
        &self.nodes[idx.0]
    }

    pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.node(idx).children
    }

    pub fn find(&self, id: &CommentId) -> Option<NodeIdx> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &CommentId) -> Option<&Node> {
        self.find(id).map(|i| self.node(i))
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.index.contains_key(id)
    }

    pub fn state(&self, id: &CommentId) -> Option<CommentState> {
        self.states.get(id).copied()
    }

    /// Replaces the state of a comment, returning false if the comment is not in
    /// this forest
    pub fn set_state(&mut self, id: &CommentId, state: CommentState) -> bool {
        match self.states.get_mut(id) {
            Some(s) => {
                *s = state;
                true
            }
            None => false,
        }
    }

    pub fn update_state<F>(&mut self, id: &CommentId, f: F) -> bool
    where
        F: FnOnce(CommentState) -> CommentState,
    {
        match self.state(id) {
            Some(s) => self.set_state(id, f(s)),
            None => false,
        }
    }

    /// Visits all nodes, parents before their replies, trees in root order
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            forest: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Identifiers of all comments, in pre-order
    pub fn ids(&self) -> impl Iterator<Item = &CommentId> {
        self.preorder().map(move |i| &self.node(i).comment.id)
    }

    /// Number of ancestors of the node
    pub fn depth(&self, idx: NodeIdx) -> usize {
        let mut res = 0;
        let mut cur = self.node(idx).parent;
        while let Some(p) = cur {
            res += 1;
            cur = self.node(p).parent;
        }
        res
    }
}

pub struct Preorder<'a> {
    forest: &'a Forest,
    stack: Vec<NodeIdx>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<NodeIdx> {
        let idx = self.stack.pop()?;
        self.stack
            .extend(self.forest.node(idx).children.iter().rev().copied());
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn comment(id: &str, parent: Option<&str>) -> Comment {
        let c = Comment::new(
            id,
            "author",
            "content",
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        );
        match parent {
            Some(p) => c.reply_to(p),
            None => c,
        }
    }

    fn ids_of(f: &Forest, nodes: &[NodeIdx]) -> Vec<String> {
        nodes
            .iter()
            .map(|i| f.node(*i).comment.id.0.clone())
            .collect()
    }

    fn id(s: &str) -> CommentId {
        CommentId::from(s)
    }

    #[test]
    fn builds_from_flat_list() {
        let f = Forest::build(vec![
            comment("a", None),
            comment("b", None),
            comment("a1", Some("a")),
            comment("a2", Some("a")),
            comment("a1x", Some("a1")),
        ]);
        assert_eq!(f.len(), 5);
        assert_eq!(ids_of(&f, f.roots()), vec!["a", "b"]);
        let a = f.find(&id("a")).unwrap();
        assert_eq!(ids_of(&f, &f.node(a).children), vec!["a1", "a2"]);
        let a1 = f.find(&id("a1")).unwrap();
        assert_eq!(ids_of(&f, f.children(a1)), vec!["a1x"]);
        assert_eq!(f.node(a1).parent, Some(a));
        assert_eq!(f.depth(f.find(&id("a1x")).unwrap()), 2);
    }

    #[test]
    fn flattens_server_nesting() {
        let mut a = comment("a", None);
        let mut a1 = comment("a1", Some("a"));
        a1.children = vec![comment("a1x", Some("a1"))];
        a.children = vec![a1, comment("a2", Some("a"))];
        let flat = flatten(vec![a, comment("b", None)]);
        assert_eq!(
            flat.iter().map(|c| c.id.0.as_str()).collect::<Vec<_>>(),
            vec!["a", "a1", "a1x", "a2", "b"],
        );
        assert!(flat.iter().all(|c| c.children.is_empty()));

        let mut a = comment("a", None);
        a.children = vec![comment("a1", Some("a"))];
        let f = Forest::build(vec![a]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.roots().len(), 1);
        assert!(f.node(f.roots()[0]).comment.children.is_empty());
    }

    #[test]
    fn missing_parent_makes_root() {
        let f = Forest::build(vec![comment("x", Some("elsewhere")), comment("y", None)]);
        assert_eq!(ids_of(&f, f.roots()), vec!["x", "y"]);
        assert_eq!(f.node(f.roots()[0]).parent, None);
    }

    #[test]
    fn parent_listed_later_still_links() {
        let f = Forest::build(vec![
            comment("reply", Some("p")),
            comment("p", None),
            comment("reply2", Some("p")),
        ]);
        assert_eq!(ids_of(&f, f.roots()), vec!["p"]);
        let p = f.find(&id("p")).unwrap();
        assert_eq!(ids_of(&f, &f.node(p).children), vec!["reply", "reply2"]);
        assert_eq!(
            f.ids().map(|i| i.0.as_str()).collect::<Vec<_>>(),
            vec!["p", "reply", "reply2"],
        );
    }

    #[test]
    fn cycles_are_broken() {
        let f = Forest::build(vec![comment("a", Some("a"))]);
        assert_eq!(f.roots().len(), 1);
        assert_eq!(f.preorder().count(), 1);

        let f = Forest::build(vec![
            comment("x", Some("z")),
            comment("y", Some("x")),
            comment("z", Some("y")),
        ]);
        assert_eq!(f.preorder().count(), 3);
        assert_eq!(ids_of(&f, f.roots()), vec!["z"]);
        assert_eq!(f.depth(f.find(&id("y")).unwrap()), 2);
    }

    #[test]
    fn initial_state_takes_likes() {
        let mut c = comment("a", None);
        c.likes = 7;
        let f = Forest::build(vec![c]);
        assert_eq!(
            f.state(&id("a")),
            Some(CommentState {
                expanded: None,
                liked: false,
                likes: 7,
                has_nickname: false,
            })
        );
    }

    #[test]
    fn graft_attaches_to_loaded_parents() {
        let mut f = Forest::build(vec![comment("a", None), comment("b", None)]);
        f.update_state(&id("a"), |s| CommentState {
            expanded: Some(true),
            ..s
        });
        f.graft(Forest::build(vec![
            comment("a1", Some("a")),
            comment("c", None),
            comment("c1", Some("c")),
            comment("z", Some("unknown")),
        ]));
        assert_eq!(f.len(), 6);
        assert_eq!(ids_of(&f, f.roots()), vec!["a", "b", "c", "z"]);
        let a = f.find(&id("a")).unwrap();
        assert_eq!(ids_of(&f, &f.node(a).children), vec!["a1"]);
        assert_eq!(f.node(f.find(&id("a1")).unwrap()).parent, Some(a));
        let c = f.find(&id("c")).unwrap();
        assert_eq!(ids_of(&f, &f.node(c).children), vec!["c1"]);
        assert_eq!(f.state(&id("a")).unwrap().expanded, Some(true));
        assert_eq!(
            f.ids().map(|i| i.0.as_str()).collect::<Vec<_>>(),
            vec!["a", "a1", "b", "c", "c1", "z"],
        );
    }

    #[test]
    fn graft_refreshes_likes_of_reloaded_comment() {
        let mut f = Forest::build(vec![comment("a", None)]);
        f.set_state(
            &id("a"),
            CommentState {
                expanded: Some(true),
                liked: false,
                likes: 1,
                has_nickname: false,
            },
        );
        let mut again = comment("a", None);
        again.likes = 5;
        let mut page = Forest::build(vec![again]);
        page.update_state(&id("a"), |s| CommentState { liked: true, ..s });
        f.graft(page);
        assert_eq!(
            f.state(&id("a")),
            Some(CommentState {
                expanded: Some(true),
                liked: true,
                likes: 5,
                has_nickname: false,
            })
        );
    }

    #[test]
    fn state_of_unknown_comment_is_not_set() {
        let mut f = Forest::build(vec![comment("a", None)]);
        assert!(!f.set_state(&id("nope"), CommentState::default()));
        assert!(!f.update_state(&id("nope"), |s| s));
        assert_eq!(f.state(&id("nope")), None);
    }
}
