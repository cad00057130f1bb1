use std::collections::HashSet;

use crate::{
    api::{ArticleId, CommentId},
    Forest, KvStore,
};

const KEY_PENDING_REPLIES: &str = "pending_replies";

/// A reply accepted by the server but not yet seen in the accepted listing
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReply {
    pub parent_id: CommentId,
    pub reply_id: CommentId,
    pub content: String,
    pub article_id: ArticleId,
}

/// Pending replies of all articles, persisted as a single collection
#[derive(Clone, Debug)]
pub struct PendingReplies<S> {
    store: S,
}

impl<S: KvStore> PendingReplies<S> {
    pub fn new(store: S) -> PendingReplies<S> {
        PendingReplies { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn all(&self) -> Vec<PendingReply> {
        match self.store.load(KEY_PENDING_REPLIES) {
            Ok(r) => r.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(?err, "ignoring unreadable pending replies");
                Vec::new()
            }
        }
    }

    pub fn for_article(&self, article: &ArticleId) -> Vec<PendingReply> {
        self.all()
            .into_iter()
            .filter(|r| r.article_id == *article)
            .collect()
    }

    /// Records a reply, unless one with the same `reply_id` is already known
    pub fn add(&self, reply: PendingReply) -> anyhow::Result<()> {
        let mut all = self.all();
        if all.iter().any(|r| r.reply_id == reply.reply_id) {
            tracing::warn!(reply = %reply.reply_id, "reply already pending");
            return Ok(());
        }
        all.push(reply);
        self.store.save(KEY_PENDING_REPLIES, &all)
    }

    pub fn remove(&self, reply: &CommentId) -> anyhow::Result<()> {
        let mut all = self.all();
        let before = all.len();
        all.retain(|r| r.reply_id != *reply);
        if all.len() != before {
            self.store.save(KEY_PENDING_REPLIES, &all)?;
        }
        Ok(())
    }

    /// Drops the replies of `article` that now show up in `forest`, returning them
    pub fn cleanup(
        &self,
        article: &ArticleId,
        forest: &Forest,
    ) -> anyhow::Result<Vec<PendingReply>> {
        let all = self.all();
        if all.is_empty() {
            return Ok(Vec::new());
        }
        let loaded = forest.ids().collect::<HashSet<_>>();
        let (approved, kept): (Vec<_>, Vec<_>) = all
            .into_iter()
            .partition(|r| r.article_id == *article && loaded.contains(&r.reply_id));
        if !approved.is_empty() {
            for r in approved.iter() {
                tracing::info!(%article, reply = %r.reply_id, "pending reply got approved");
            }
            self.store.save(KEY_PENDING_REPLIES, &kept)?;
        }
        Ok(approved)
    }
}
