use std::collections::HashMap;

use crate::ArticleId;

/// One item of the user's viewing history, as returned by the history service
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub collectorreceived: i64,

    #[serde(default)]
    pub content_type: String,

    #[serde(default)]
    pub yle_id: String,

    #[serde(default, rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub application: Option<String>,

    #[serde(default)]
    pub comment: Option<HistoryComment>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HistoryComment {
    pub id: String,
    pub content: String,
    pub title: String,
    pub url: String,
}

/// The user's own comments on one article
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedDiscussion {
    pub article_id: ArticleId,
    pub title: String,
    pub url: String,

    /// Comment contents, in history order
    pub comments: Vec<String>,
    pub latest_comment_content: String,
}

/// Keeps only the comment entries of a viewing history, and groups them by article
///
/// Articles are listed in the order in which they first appear in the history.
/// Entries whose url does not point to an article are skipped.
pub fn group_discussions(entries: Vec<HistoryEntry>) -> Vec<GroupedDiscussion> {
    let mut res: Vec<GroupedDiscussion> = Vec::new();
    let mut by_article: HashMap<ArticleId, usize> = HashMap::new();
    for e in entries {
        if e.application.as_deref() != Some("comments") {
            continue;
        }
        let comment = match e.comment {
            Some(c) if !c.url.is_empty() => c,
            _ => continue,
        };
        let article_id = match ArticleId::from_article_url(&comment.url) {
            Some(id) => id,
            None => continue,
        };
        match by_article.get(&article_id) {
            Some(&idx) => {
                let d = &mut res[idx];
                d.comments.push(comment.content.clone());
                d.latest_comment_content = comment.content;
            }
            None => {
                by_article.insert(article_id.clone(), res.len());
                res.push(GroupedDiscussion {
                    article_id,
                    title: comment.title,
                    url: comment.url,
                    comments: vec![comment.content.clone()],
                    latest_comment_content: comment.content,
                });
            }
        }
    }
    res
}
