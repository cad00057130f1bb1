use crate::{CommentState, Forest, NodeIdx};

/// Flags the comments written by authors whose name starts with `filter`, along
/// with all their ancestors
///
/// Matching ignores case and the whitespace around `filter`. All flags are
/// cleared first, so an empty filter just clears them. Returns whether any root
/// ended up flagged.
pub fn mark_nickname(forest: &mut Forest, filter: &str) -> bool {
    let filter = filter.trim().to_lowercase();
    let order = forest.preorder().collect::<Vec<_>>();
    let mut flags = vec![false; forest.len()];
    if !filter.is_empty() {
        // reverse pre-order sees every reply before its parent
        for &idx in order.iter().rev() {
            let node = forest.node(idx);
            let own_match = node.comment.author.to_lowercase().starts_with(&filter);
            let reply_match = node.children.iter().any(|c| flags[c.0]);
            flags[idx.0] = own_match || reply_match;
        }
    }
    for &idx in order.iter() {
        let id = forest.node(idx).comment.id.clone();
        let has_nickname = flags[idx.0];
        forest.update_state(&id, |s| CommentState { has_nickname, ..s });
    }
    forest.roots().iter().any(|r| flags[r.0])
}

/// Roots to display: all of them, or only the flagged ones when `hide_unmarked`
pub fn visible_roots(forest: &Forest, hide_unmarked: bool) -> Vec<NodeIdx> {
    forest
        .roots()
        .iter()
        .copied()
        .filter(|r| {
            !hide_unmarked
                || forest
                    .state(&forest.node(*r).comment.id)
                    .map_or(false, |s| s.has_nickname)
        })
        .collect()
}
