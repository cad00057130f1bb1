use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::Time;

#[derive(
    Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> CommentId {
        CommentId(s.to_string())
    }
}

/// A comment, as returned by the accepted-comments listing
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: u32,

    pub created_at: Time,

    #[serde(default)]
    pub parent_id: Option<CommentId>,

    /// Root of the thread this comment belongs to
    #[serde(default)]
    pub top_comment_id: Option<CommentId>,

    /// Replies, when the API decided to nest them itself
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Comment>,
}

impl Comment {
    pub fn new(id: &str, author: &str, content: &str, created_at: Time) -> Comment {
        Comment {
            id: CommentId::from(id),
            author: author.to_string(),
            content: content.to_string(),
            likes: 0,
            created_at,
            parent_id: None,
            top_comment_id: None,
            children: Vec::new(),
        }
    }

    pub fn reply_to(mut self, parent: &str) -> Comment {
        self.parent_id = Some(CommentId::from(parent));
        self
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReply {
    pub parent_id: CommentId,
    pub content: String,
}

/// What the API answers to a reply submission. The reply only shows up in the
/// accepted listing after moderation.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ReplyReceipt {
    pub id: CommentId,
}
