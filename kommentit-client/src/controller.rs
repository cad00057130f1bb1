use std::collections::HashSet;

use crate::{
    api::{ArticleId, Comment, CommentId, Error, Time, TopicDetails},
    transfer_expanded, CommentState, Forest, LoadConfig,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// A page load that was started and not completed yet
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadTicket {
    pub article: ArticleId,
    pub offset: usize,
    pub limit: usize,

    /// If true, the result replaces the whole forest
    pub reset: bool,
    pub started_at: Time,

    /// Distinguishes loads begun with the same arguments
    generation: u64,
}

/// What the server answered to a page load
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FetchedPage {
    pub comments: Vec<Comment>,

    /// Comments of the article liked by the current session
    pub liked: Vec<CommentId>,

    /// Only fetched on reset loads
    pub topic: Option<TopicDetails>,
}

/// Pagination state of the comments of one article
///
/// At most one load can be in flight. Loads are split in a `begin` and a
/// `complete` step so that the fetch itself can happen outside of any borrow of
/// the controller.
#[derive(Clone, Debug)]
pub struct LoadController {
    config: LoadConfig,
    state: LoadState,
    in_flight: Option<LoadTicket>,
    generation: u64,
    forest: Forest,
    offset: usize,
    has_more: bool,
    failed: bool,
    loading_until: Option<Time>,
}

impl LoadController {
    pub fn new(config: LoadConfig) -> LoadController {
        LoadController {
            config,
            state: LoadState::Idle,
            in_flight: None,
            generation: 0,
            forest: Forest::new(),
            offset: 0,
            has_more: true,
            failed: false,
            loading_until: None,
        }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// For UI state changes; the tree itself is only ever changed by loads
    pub fn forest_mut(&mut self) -> &mut Forest {
        &mut self.forest
    }

    /// Number of top-level items received since the last reset
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether the last load failed
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn in_flight(&self) -> Option<&LoadTicket> {
        self.in_flight.as_ref()
    }

    /// Whether the loading indicator should be shown at time `now`
    ///
    /// This stays true for `min_loading` after the start of a successful load,
    /// even though its data is already available.
    pub fn is_loading(&self, now: Time) -> bool {
        self.state == LoadState::Loading || self.loading_until.map_or(false, |t| now < t)
    }

    /// Starts a load, returning None if there is nothing to do
    ///
    /// Nothing is done while another load is in flight, nor for an incremental
    /// load once the server ran out of comments.
    pub fn begin(&mut self, article: &ArticleId, reset: bool, now: Time) -> Option<LoadTicket> {
        if self.state == LoadState::Loading {
            tracing::debug!(%article, reset, "ignoring load request, already loading");
            return None;
        }
        if !reset && !self.has_more {
            tracing::debug!(%article, "ignoring load request, no more comments");
            return None;
        }
        self.generation += 1;
        let ticket = LoadTicket {
            article: article.clone(),
            offset: if reset { 0 } else { self.offset },
            limit: self.config.page_size(),
            reset,
            started_at: now,
            generation: self.generation,
        };
        tracing::debug!(%article, offset = ticket.offset, limit = ticket.limit, reset, "loading comments");
        self.state = LoadState::Loading;
        self.failed = false;
        self.loading_until = None;
        self.in_flight = Some(ticket.clone());
        Some(ticket)
    }

    /// Applies the result of a load, returning whether it was applied
    ///
    /// Results of a load other than the one in flight are dropped.
    pub fn complete(
        &mut self,
        ticket: &LoadTicket,
        result: Result<FetchedPage, Error>,
        now: Time,
    ) -> bool {
        if self.in_flight.as_ref().map(|t| t.generation) != Some(ticket.generation) {
            tracing::warn!(article = %ticket.article, "dropping result of a stale load");
            return false;
        }
        self.in_flight = None;
        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::error!(article = %ticket.article, ?err, "failed to load comments");
                self.state = LoadState::Errored;
                self.failed = true;
                self.has_more = false;
                self.loading_until = None;
                if ticket.reset {
                    self.forest = Forest::new();
                    self.offset = 0;
                }
                return false;
            }
        };

        let received = page.comments.len();
        let mut new = Forest::build(page.comments);
        let liked = page.liked.into_iter().collect::<HashSet<_>>();
        let liked_here = new
            .ids()
            .filter(|id| liked.contains(*id))
            .cloned()
            .collect::<Vec<_>>();
        for id in liked_here {
            new.update_state(&id, |s| CommentState { liked: true, ..s });
        }

        if ticket.reset {
            transfer_expanded(&self.forest, &mut new);
            self.forest = new;
            self.offset = received;
            self.has_more = true;
        } else {
            self.forest.graft(new);
            self.offset += received;
        }
        if received < ticket.limit {
            self.has_more = false;
        }
        self.state = LoadState::Loaded;
        let shown_until = ticket.started_at + self.config.min_loading;
        self.loading_until = (now < shown_until).then_some(shown_until);
        tracing::info!(
            article = %ticket.article,
            received,
            total = self.forest.len(),
            has_more = self.has_more,
            "loaded comments"
        );
        true
    }

    /// Forgets everything, including any load in flight
    pub fn reset(&mut self) {
        self.state = LoadState::Idle;
        self.generation += 1;
        self.in_flight = None;
        self.forest = Forest::new();
        self.offset = 0;
        self.has_more = false;
        self.failed = false;
        self.loading_until = None;
    }
}
