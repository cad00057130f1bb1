use crate::{
    api::{ArticleId, Time},
    KvStore,
};

const KEY_ARTICLE_HISTORY: &str = "articleHistory";
const MAX_HISTORY_ITEMS: usize = 20;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ArticleHistoryItem {
    pub id: ArticleId,
    pub title: String,

    /// Milliseconds since the epoch of the last visit
    pub timestamp: i64,
}

/// Articles recently read, most recent first
#[derive(Clone, Debug)]
pub struct History<S> {
    store: S,
}

impl<S: KvStore> History<S> {
    pub fn new(store: S) -> History<S> {
        History { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self) -> Vec<ArticleHistoryItem> {
        match self.store.load(KEY_ARTICLE_HISTORY) {
            Ok(h) => h.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(?err, "ignoring unreadable article history");
                Vec::new()
            }
        }
    }

    pub fn latest(&self) -> Option<ArticleHistoryItem> {
        self.get().into_iter().next()
    }

    /// Moves the article to the front of the history, with a fresh title and
    /// timestamp
    pub fn add_or_update(&self, id: &ArticleId, title: &str, now: Time) -> anyhow::Result<()> {
        if id.is_empty() || title.is_empty() {
            return Ok(());
        }
        let mut items = self.get();
        items.retain(|i| i.id != *id);
        items.insert(
            0,
            ArticleHistoryItem {
                id: id.clone(),
                title: title.to_string(),
                timestamp: now.timestamp_millis(),
            },
        );
        items.truncate(MAX_HISTORY_ITEMS);
        self.store.save(KEY_ARTICLE_HISTORY, &items)
    }

    /// Forgets the given articles
    pub fn clear(&self, ids: &[ArticleId]) -> anyhow::Result<()> {
        let mut items = self.get();
        items.retain(|i| !ids.contains(&i.id));
        self.store.save(KEY_ARTICLE_HISTORY, &items)
    }

    pub fn clear_all(&self) -> anyhow::Result<()> {
        self.store.delete(KEY_ARTICLE_HISTORY)
    }
}
