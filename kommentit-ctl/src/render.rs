use std::fmt::Write;

use chrono::TimeZone;
use kommentit_client::{
    api::{GroupedDiscussion, TopicDetails},
    ArticleHistoryItem, Forest, NodeIdx, PendingReply,
};

const INDENT: &str = "    ";

pub fn topic(t: &TopicDetails) -> String {
    let mut res = format!("# {}\n", t.title);
    let _ = writeln!(res, "{} accepted comments", t.accepted_comments_count);
    if t.is_locked {
        res.push_str("(locked: no new comments)\n");
    }
    res
}

/// Renders the threads of `roots`, replies indented under their parent
///
/// Collapsed comments only show how many replies they hide.
pub fn threads(
    forest: &Forest,
    roots: &[NodeIdx],
    expand_all: bool,
    pending: &[PendingReply],
) -> String {
    let mut res = String::new();
    let mut stack = roots.iter().rev().map(|r| (*r, 0)).collect::<Vec<_>>();
    while let Some((idx, depth)) = stack.pop() {
        let node = forest.node(idx);
        let c = &node.comment;
        let state = forest.state(&c.id).unwrap_or_default();
        let pad = INDENT.repeat(depth);
        let marks = format!(
            "{}{}",
            if state.liked { " ♥" } else { "" },
            if state.has_nickname { " *" } else { "" },
        );
        let _ = writeln!(
            res,
            "{pad}[{}] {} ({}, {} likes){marks}",
            c.id,
            c.author,
            c.created_at.format("%Y-%m-%d %H:%M"),
            state.likes,
        );
        for line in c.content.lines() {
            let _ = writeln!(res, "{pad}  {line}");
        }
        for p in pending.iter().filter(|p| p.parent_id == c.id) {
            let _ = writeln!(
                res,
                "{pad}{INDENT}[{}] awaiting moderation: {}",
                p.reply_id, p.content
            );
        }
        if node.children.is_empty() {
            continue;
        }
        if expand_all || state.expanded == Some(true) {
            stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
        } else {
            let _ = writeln!(res, "{pad}{INDENT}({} replies hidden)", node.children.len());
        }
    }
    res
}

pub fn history(items: &[ArticleHistoryItem]) -> String {
    let mut res = String::new();
    for i in items {
        let when = chrono::Utc
            .timestamp_millis_opt(i.timestamp)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(res, "{when}  {}  {}", i.id, i.title);
    }
    res
}

pub fn discussions(ds: &[GroupedDiscussion]) -> String {
    let mut res = String::new();
    for d in ds {
        let _ = writeln!(res, "{} ({}): {}", d.title, d.article_id, d.url);
        for c in d.comments.iter() {
            let _ = writeln!(res, "{INDENT}{c}");
        }
    }
    res
}
