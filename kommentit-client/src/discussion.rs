use chrono::Utc;

use crate::{
    api::{ArticleId, CommentId, CommentService, Error, NewReply, Time, TopicDetails},
    mark_nickname, visible_roots, CommentState, FetchedPage, Forest, History, KvStore,
    LoadConfig, LoadController, LoadState, LoadTicket, NodeIdx, PendingReplies, PendingReply,
};

/// Fetches everything a load needs: the page itself, the liked comments, and on
/// reset loads the topic details
///
/// Not being logged in is not an error for the liked comments, there just are
/// none.
pub async fn fetch_page<A>(api: &A, ticket: &LoadTicket) -> Result<FetchedPage, Error>
where
    A: CommentService + Sync + ?Sized,
{
    let comments = api.fetch_comments(&ticket.article, ticket.offset, ticket.limit);
    let liked = async {
        match api.fetch_liked(&ticket.article).await {
            Err(e) if e.is_permission_denied() => Ok(Vec::new()),
            r => r,
        }
    };
    if ticket.reset {
        let topic = api.topic_details(&ticket.article);
        let (comments, liked, topic) = futures::try_join!(comments, liked, topic)?;
        Ok(FetchedPage {
            comments,
            liked,
            topic: Some(topic),
        })
    } else {
        let (comments, liked) = futures::try_join!(comments, liked)?;
        Ok(FetchedPage {
            comments,
            liked,
            topic: None,
        })
    }
}

/// The comment section of one article at a time, as seen by a reader
pub struct Discussion<A, S> {
    api: A,
    article: ArticleId,
    topic: Option<TopicDetails>,
    controller: LoadController,
    pending: PendingReplies<S>,
    history: History<S>,
    nickname_filter: String,
    filter_found_matches: bool,
    hide_unmarked: bool,
}

impl<A, S> Discussion<A, S>
where
    A: CommentService + Sync,
    S: KvStore + Clone,
{
    pub fn new(api: A, store: S, config: LoadConfig) -> Discussion<A, S> {
        Discussion {
            api,
            article: ArticleId::default(),
            topic: None,
            controller: LoadController::new(config),
            pending: PendingReplies::new(store.clone()),
            history: History::new(store),
            nickname_filter: String::new(),
            filter_found_matches: false,
            hide_unmarked: false,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn article(&self) -> &ArticleId {
        &self.article
    }

    /// Switches to another article, forgetting everything about the current one
    ///
    /// The nickname filter itself is kept. Returns whether the article changed.
    pub fn set_article(&mut self, article: ArticleId) -> bool {
        if article == self.article {
            return false;
        }
        tracing::debug!(from = %self.article, to = %article, "switching article");
        self.article = article;
        self.topic = None;
        self.controller.reset();
        self.filter_found_matches = false;
        self.hide_unmarked = false;
        true
    }

    /// Opens the most recently read article, if no article is open yet
    pub fn open_latest_from_history(&mut self) -> Option<ArticleId> {
        if !self.article.is_empty() {
            return None;
        }
        let latest = self.history.latest()?;
        self.set_article(latest.id.clone());
        Some(latest.id)
    }

    /// Starts a load of the current article, see [`LoadController::begin`]
    pub fn begin_load(&mut self, reset: bool, now: Time) -> Option<LoadTicket> {
        if self.article.is_empty() {
            self.controller.reset();
            self.topic = None;
            return None;
        }
        self.controller.begin(&self.article, reset, now)
    }

    /// Applies the result of a load started by [`Discussion::begin_load`],
    /// returning whether new data got applied
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<FetchedPage, Error>,
        now: Time,
    ) -> bool {
        let current = self.controller.in_flight() == Some(ticket);
        let topic = match &result {
            Ok(page) => page.topic.clone(),
            Err(_) => None,
        };
        if !self.controller.complete(ticket, result, now) {
            if current && ticket.reset {
                self.topic = None;
                self.filter_found_matches = false;
                self.hide_unmarked = false;
            }
            return false;
        }

        if let Some(topic) = topic {
            let title = if topic.title.is_empty() {
                self.article.to_string()
            } else {
                topic.title.clone()
            };
            if let Err(err) = self.history.add_or_update(&self.article, &title, now) {
                tracing::warn!(article = %self.article, ?err, "failed recording article history");
            }
            self.topic = Some(topic);
        }
        self.refresh_nickname_flags();
        if let Err(err) = self.pending.cleanup(&self.article, self.controller.forest()) {
            tracing::warn!(article = %self.article, ?err, "failed cleaning up pending replies");
        }
        true
    }

    /// Reloads from the start, or loads the next page, depending on `reset`
    pub async fn load(&mut self, reset: bool) -> bool {
        let ticket = match self.begin_load(reset, Utc::now()) {
            Some(t) => t,
            None => return false,
        };
        let result = fetch_page(&self.api, &ticket).await;
        self.complete_load(&ticket, result, Utc::now())
    }

    pub async fn load_more(&mut self) -> bool {
        self.load(false).await
    }

    pub fn forest(&self) -> &Forest {
        self.controller.forest()
    }

    pub fn controller(&self) -> &LoadController {
        &self.controller
    }

    pub fn state(&self) -> LoadState {
        self.controller.state()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading(Utc::now())
    }

    pub fn is_loading_at(&self, now: Time) -> bool {
        self.controller.is_loading(now)
    }

    pub fn has_more(&self) -> bool {
        self.controller.has_more()
    }

    pub fn failed(&self) -> bool {
        self.controller.failed()
    }

    pub fn topic(&self) -> Option<&TopicDetails> {
        self.topic.as_ref()
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    /// Flips a comment between expanded and collapsed
    pub fn toggle_expanded(&mut self, comment: &CommentId) -> bool {
        self.controller
            .forest_mut()
            .update_state(comment, |s| CommentState {
                expanded: Some(!s.expanded.unwrap_or(false)),
                ..s
            })
    }

    pub async fn like(&mut self, comment: &CommentId) -> bool {
        self.send_like(comment, true).await
    }

    pub async fn unlike(&mut self, comment: &CommentId) -> bool {
        self.send_like(comment, false).await
    }

    async fn send_like(&mut self, comment: &CommentId, liked: bool) -> bool {
        let article = self.article.clone();
        let res = if liked {
            self.api.like(&article, comment).await
        } else {
            self.api.unlike(&article, comment).await
        };
        match res {
            Ok(()) => self.apply_like(&article, comment, liked),
            Err(err) => {
                tracing::error!(%article, %comment, liked, ?err, "failed to change like");
                false
            }
        }
    }

    /// Records a like change the server accepted
    ///
    /// The change is dropped if it was for another article or the comment is no
    /// longer loaded. The count only moves if the liked flag actually flips.
    pub fn apply_like(&mut self, article: &ArticleId, comment: &CommentId, liked: bool) -> bool {
        if *article != self.article {
            tracing::warn!(%article, %comment, "dropping like for an article no longer shown");
            return false;
        }
        let applied = self.controller.forest_mut().update_state(comment, |s| {
            let likes = match (s.liked, liked) {
                (false, true) => s.likes + 1,
                (true, false) => s.likes.saturating_sub(1),
                _ => s.likes,
            };
            CommentState { liked, likes, ..s }
        });
        if !applied {
            tracing::warn!(%article, %comment, "dropping like for a comment no longer loaded");
        }
        applied
    }

    /// Posts a reply, which stays pending until it shows up in a later load
    pub async fn reply(&mut self, parent: &CommentId, content: &str) -> Option<PendingReply> {
        if self.article.is_empty() || content.trim().is_empty() {
            return None;
        }
        if self.topic.as_ref().map_or(false, |t| t.is_locked) {
            tracing::debug!(article = %self.article, %parent, "not replying, topic is locked");
            return None;
        }
        let article = self.article.clone();
        let new = NewReply {
            parent_id: parent.clone(),
            content: content.to_string(),
        };
        let receipt = match self.api.submit_reply(&article, &new).await {
            Ok(r) => r,
            Err(err) => {
                tracing::error!(%article, %parent, ?err, "failed to submit reply");
                return None;
            }
        };
        let reply = PendingReply {
            parent_id: new.parent_id,
            reply_id: receipt.id,
            content: new.content,
            article_id: article,
        };
        if let Err(err) = self.pending.add(reply.clone()) {
            tracing::warn!(reply = %reply.reply_id, ?err, "failed saving pending reply");
        }
        Some(reply)
    }

    /// Pending replies of the current article
    pub fn pending_replies(&self) -> Vec<PendingReply> {
        self.pending.for_article(&self.article)
    }

    pub fn pending_replies_to(&self, parent: &CommentId) -> Vec<PendingReply> {
        self.pending_replies()
            .into_iter()
            .filter(|r| r.parent_id == *parent)
            .collect()
    }

    pub fn nickname_filter(&self) -> &str {
        &self.nickname_filter
    }

    /// Whether the current filter matched any top-level comment
    pub fn filter_found_matches(&self) -> bool {
        self.filter_found_matches
    }

    pub fn set_nickname_filter(&mut self, filter: &str) -> bool {
        self.nickname_filter = filter.to_string();
        self.refresh_nickname_flags();
        self.filter_found_matches
    }

    /// Only shows the top-level comments matching the filter, if there are any;
    /// returns whether unmarked comments are now hidden
    pub fn set_hide_unmarked(&mut self, hide: bool) -> bool {
        self.hide_unmarked = hide && self.filter_found_matches;
        self.hide_unmarked
    }

    pub fn hide_unmarked(&self) -> bool {
        self.hide_unmarked
    }

    pub fn visible_roots(&self) -> Vec<NodeIdx> {
        visible_roots(self.controller.forest(), self.hide_unmarked)
    }

    fn refresh_nickname_flags(&mut self) {
        let found = mark_nickname(self.controller.forest_mut(), &self.nickname_filter);
        self.filter_found_matches = found;
        if !found {
            self.hide_unmarked = false;
        }
    }
}
