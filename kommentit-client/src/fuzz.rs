#![cfg(test)]

use std::collections::HashSet;

use chrono::{TimeZone, Utc};

use crate::{
    api::{Comment, CommentId},
    mark_nickname, transfer_expanded, CommentState, Forest, NodeIdx,
};

const AUTHORS: [&str; 4] = ["Alice", "alfred", "Bob", "Kalle"];

// (id, parent id, author) with few distinct ids, so that parents get found and
// ids get repeated
fn page(shape: &[(u8, Option<u8>, u8)]) -> Vec<Comment> {
    let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
    shape.iter()
        .map(|(id, parent, author)| {
            let c = Comment::new(
                &format!("c{}", id % 16),
                AUTHORS[usize::from(*author) % AUTHORS.len()],
                "content",
                t,
            );
            match parent {
                Some(p) => c.reply_to(&format!("c{}", p % 16)),
                None => c,
            }
        })
        .collect()
}

fn check_shape(f: &Forest) {
    let mut seen = HashSet::new();
    for idx in f.preorder() {
        assert!(seen.insert(idx), "node {idx:?} visited twice");
        let node = f.node(idx);
        for &c in node.children.iter() {
            assert_eq!(f.node(c).parent, Some(idx));
            assert_eq!(
                f.node(c).comment.parent_id.as_ref(),
                Some(&node.comment.id)
            );
        }
        match node.parent {
            None => assert!(f.roots().contains(&idx)),
            Some(p) => assert!(f.node(p).children.contains(&idx)),
        }
    }
    assert_eq!(seen.len(), f.len());
}

#[test]
fn build_keeps_every_comment_once() {
    bolero::check!()
        .with_type::<Vec<(u8, Option<u8>, u8)>>()
        .cloned()
        .for_each(|shape| {
            let f = Forest::build(page(&shape));
            assert_eq!(f.len(), shape.len());
            check_shape(&f);
        })
}

#[test]
fn graft_keeps_every_comment_once() {
    bolero::check!()
        .with_type::<(Vec<(u8, Option<u8>, u8)>, Vec<(u8, Option<u8>, u8)>)>()
        .cloned()
        .for_each(|(first, second)| {
            let mut f = Forest::build(page(&first));
            f.graft(Forest::build(page(&second)));
            assert_eq!(f.len(), first.len() + second.len());
            check_shape(&f);
        })
}

#[test]
fn nickname_marks_matches_and_ancestors() {
    bolero::check!()
        .with_type::<(Vec<(u8, Option<u8>, u8)>, u8)>()
        .cloned()
        .for_each(|(shape, filter)| {
            let filter = ["al", "BOB", " kalle ", "", "z"][usize::from(filter) % 5];
            let mut f = Forest::build(page(&shape));
            let found = mark_nickname(&mut f, filter);
            let flag = |i: NodeIdx| f.state(&f.node(i).comment.id).unwrap().has_nickname;
            let needle = filter.trim().to_lowercase();
            if needle.is_empty() {
                assert!(!found);
            }
            // duplicate ids share one state, so the flags are only exact without them
            let ids = f.ids().collect::<HashSet<_>>();
            if ids.len() == f.len() {
                for i in f.preorder() {
                    let node = f.node(i);
                    let author = node.comment.author.to_lowercase();
                    let own = !needle.is_empty() && author.starts_with(&needle);
                    let reply = node.children.iter().any(|c| flag(*c));
                    assert_eq!(flag(i), own || reply);
                }
            }
            let before = f.ids().map(|id| f.state(id)).collect::<Vec<_>>();
            assert_eq!(mark_nickname(&mut f, filter), found);
            let after = f.ids().map(|id| f.state(id)).collect::<Vec<_>>();
            assert_eq!(before, after);
        })
}

#[test]
fn reconcile_keeps_expanded_choices() {
    bolero::check!()
        .with_type::<(Vec<(u8, Option<u8>, u8)>, Vec<(u8, Option<u8>, u8)>, Vec<(u8, bool)>)>()
        .cloned()
        .for_each(|(old, new, toggles)| {
            let mut old = Forest::build(page(&old));
            for (id, expanded) in toggles {
                old.update_state(&CommentId(format!("c{}", id % 16)), |s| CommentState {
                    expanded: Some(expanded),
                    ..s
                });
            }
            let mut new = Forest::build(page(&new));
            let others_before = new.ids().map(|id| new.state(id)).collect::<Vec<_>>();
            transfer_expanded(&old, &mut new);
            for id in new.ids() {
                let got = new.state(id).unwrap();
                let expected = old.state(id).and_then(|s| s.expanded);
                assert_eq!(got.expanded, expected);
            }
            let others_after = new
                .ids()
                .map(|id| new.state(id).map(|s| CommentState { expanded: None, ..s }))
                .collect::<Vec<_>>();
            assert_eq!(others_before, others_after);
        })
}
