use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use kommentit_api::{
    ArticleId, Comment, CommentId, CommentService, Error, NewReply, ReplyReceipt, TopicDetails,
};
use parking_lot::Mutex;

/// In-memory stand-in for the comments API
pub struct MockServer(Mutex<Db>);

#[derive(Debug, Default)]
struct Db {
    articles: BTreeMap<ArticleId, DbArticle>,
    logged_in: bool,
    fail_next: Option<Error>,
    num_requests: usize,
}

#[derive(Debug)]
struct DbArticle {
    topic: TopicDetails,

    /// Flat, in the order the listing returns them
    accepted: Vec<Comment>,
    liked: HashSet<CommentId>,
    awaiting_moderation: Vec<Comment>,
}

impl DbArticle {
    fn find_mut(&mut self, id: &CommentId) -> Option<&mut Comment> {
        self.accepted.iter_mut().find(|c| c.id == *id)
    }
}

impl Db {
    /// Counts the request, and fails it if a failure was requested
    fn request(&mut self) -> Result<(), Error> {
        self.num_requests += 1;
        match self.fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn article(&self, id: &ArticleId) -> Result<&DbArticle, Error> {
        self.articles.get(id).ok_or(Error::Status(404))
    }

    fn article_mut(&mut self, id: &ArticleId) -> Result<&mut DbArticle, Error> {
        self.articles.get_mut(id).ok_or(Error::Status(404))
    }

    fn logged_in(&self) -> Result<(), Error> {
        match self.logged_in {
            true => Ok(()),
            false => Err(Error::PermissionDenied),
        }
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(Mutex::new(Db {
            logged_in: true,
            ..Db::default()
        }))
    }

    pub fn add_article(&self, id: &ArticleId, title: &str) {
        self.0.lock().articles.insert(
            id.clone(),
            DbArticle {
                topic: TopicDetails {
                    title: title.to_string(),
                    is_locked: false,
                    accepted_comments_count: 0,
                    external_id: id.to_string(),
                },
                accepted: Vec::new(),
                liked: HashSet::new(),
                awaiting_moderation: Vec::new(),
            },
        );
    }

    /// Adds an already-moderated comment at the end of the listing
    ///
    /// Panics if the article does not exist.
    pub fn add_comment(&self, article: &ArticleId, comment: Comment) {
        let mut db = self.0.lock();
        let a = db
            .articles
            .get_mut(article)
            .unwrap_or_else(|| panic!("adding comment to unknown article {article}"));
        a.accepted.push(comment);
        a.topic.accepted_comments_count = a.accepted.len() as u64;
    }

    pub fn lock_article(&self, article: &ArticleId) {
        if let Some(a) = self.0.lock().articles.get_mut(article) {
            a.topic.is_locked = true;
        }
    }

    /// Moves every reply waiting for moderation to the end of the listing
    pub fn approve_replies(&self, article: &ArticleId) -> Vec<CommentId> {
        let mut db = self.0.lock();
        let a = match db.articles.get_mut(article) {
            Some(a) => a,
            None => return Vec::new(),
        };
        let approved = std::mem::take(&mut a.awaiting_moderation);
        let ids = approved.iter().map(|c| c.id.clone()).collect();
        a.accepted.extend(approved);
        a.topic.accepted_comments_count = a.accepted.len() as u64;
        ids
    }

    pub fn set_logged_in(&self, logged_in: bool) {
        self.0.lock().logged_in = logged_in;
    }

    /// Makes the next request fail with `err`
    pub fn fail_next(&self, err: Error) {
        self.0.lock().fail_next = Some(err);
    }

    /// Return the number of requests received so far
    pub fn test_num_requests(&self) -> usize {
        self.0.lock().num_requests
    }

    /// Return the like count the server has for a comment
    pub fn test_likes(&self, article: &ArticleId, comment: &CommentId) -> Option<u32> {
        let db = self.0.lock();
        let a = db.articles.get(article)?;
        a.accepted.iter().find(|c| c.id == *comment).map(|c| c.likes)
    }

    pub fn test_num_awaiting_moderation(&self, article: &ArticleId) -> usize {
        self.0
            .lock()
            .articles
            .get(article)
            .map_or(0, |a| a.awaiting_moderation.len())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl CommentService for MockServer {
    async fn fetch_comments(
        &self,
        article: &ArticleId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, Error> {
        let mut db = self.0.lock();
        db.request()?;
        let a = db.article(article)?;
        Ok(a.accepted.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn fetch_liked(&self, article: &ArticleId) -> Result<Vec<CommentId>, Error> {
        let mut db = self.0.lock();
        db.request()?;
        db.logged_in()?;
        let a = db.article(article)?;
        let mut liked = a.liked.iter().cloned().collect::<Vec<_>>();
        liked.sort();
        Ok(liked)
    }

    async fn topic_details(&self, article: &ArticleId) -> Result<TopicDetails, Error> {
        let mut db = self.0.lock();
        db.request()?;
        Ok(db.article(article)?.topic.clone())
    }

    async fn like(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error> {
        let mut db = self.0.lock();
        db.request()?;
        db.logged_in()?;
        let a = db.article_mut(article)?;
        if a.find_mut(comment).is_none() {
            return Err(Error::Status(404));
        }
        if a.liked.insert(comment.clone()) {
            if let Some(c) = a.find_mut(comment) {
                c.likes += 1;
            }
        }
        Ok(())
    }

    async fn unlike(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error> {
        let mut db = self.0.lock();
        db.request()?;
        db.logged_in()?;
        let a = db.article_mut(article)?;
        if a.find_mut(comment).is_none() {
            return Err(Error::Status(404));
        }
        if a.liked.remove(comment) {
            if let Some(c) = a.find_mut(comment) {
                c.likes = c.likes.saturating_sub(1);
            }
        }
        Ok(())
    }

    async fn submit_reply(
        &self,
        article: &ArticleId,
        reply: &NewReply,
    ) -> Result<ReplyReceipt, Error> {
        let mut db = self.0.lock();
        db.request()?;
        db.logged_in()?;
        let a = db.article_mut(article)?;
        if a.topic.is_locked {
            return Err(Error::PermissionDenied);
        }
        if reply.content.trim().is_empty() || a.find_mut(&reply.parent_id).is_none() {
            return Err(Error::Status(400));
        }
        let id = CommentId(format!("33-{}", uuid::Uuid::new_v4()));
        let mut c = Comment::new(&id.0, "mock-user", &reply.content, Utc::now())
            .reply_to(reply.parent_id.as_str());
        c.top_comment_id = a
            .find_mut(&reply.parent_id)
            .and_then(|p| p.top_comment_id.clone().or_else(|| Some(p.id.clone())));
        a.awaiting_moderation.push(c);
        Ok(ReplyReceipt { id })
    }
}
