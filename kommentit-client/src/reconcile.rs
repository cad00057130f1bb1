use std::collections::HashMap;

use crate::{api::CommentId, CommentState, Forest};

/// Carries the expanded/collapsed choices of the user over to a freshly fetched
/// forest
///
/// The shape of `new` may differ arbitrarily from `old`, so this first collects
/// every choice of `old`, then applies them onto `new` by comment id. Comments
/// the user never toggled, and comments not in `old`, keep `expanded: None`.
pub fn transfer_expanded(old: &Forest, new: &mut Forest) {
    let choices = old
        .ids()
        .filter_map(|id| {
            old.state(id)
                .and_then(|s| s.expanded)
                .map(|expanded| (id, expanded))
        })
        .collect::<HashMap<&CommentId, bool>>();
    if choices.is_empty() {
        return;
    }
    let to_apply = new
        .ids()
        .filter_map(|id| choices.get(id).map(|e| (id.clone(), *e)))
        .collect::<Vec<_>>();
    for (id, expanded) in to_apply {
        new.update_state(&id, |s| CommentState {
            expanded: Some(expanded),
            ..s
        });
    }
}
