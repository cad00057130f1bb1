use async_trait::async_trait;

use crate::{ArticleId, Comment, CommentId, Error, NewReply, ReplyReceipt, TopicDetails};

/// Everything the comment view needs from the comments API
#[async_trait]
pub trait CommentService {
    /// Accepted comments of the article, by decreasing relevance
    async fn fetch_comments(
        &self,
        article: &ArticleId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, Error>;

    /// Comments of the article that the current session has liked
    async fn fetch_liked(&self, article: &ArticleId) -> Result<Vec<CommentId>, Error>;

    async fn topic_details(&self, article: &ArticleId) -> Result<TopicDetails, Error>;

    async fn like(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error>;

    async fn unlike(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error>;

    async fn submit_reply(
        &self,
        article: &ArticleId,
        reply: &NewReply,
    ) -> Result<ReplyReceipt, Error>;
}

#[async_trait]
impl<S: CommentService + Sync + ?Sized> CommentService for &S {
    async fn fetch_comments(
        &self,
        article: &ArticleId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, Error> {
        (**self).fetch_comments(article, offset, limit).await
    }

    async fn fetch_liked(&self, article: &ArticleId) -> Result<Vec<CommentId>, Error> {
        (**self).fetch_liked(article).await
    }

    async fn topic_details(&self, article: &ArticleId) -> Result<TopicDetails, Error> {
        (**self).topic_details(article).await
    }

    async fn like(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error> {
        (**self).like(article, comment).await
    }

    async fn unlike(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error> {
        (**self).unlike(article, comment).await
    }

    async fn submit_reply(
        &self,
        article: &ArticleId,
        reply: &NewReply,
    ) -> Result<ReplyReceipt, Error> {
        (**self).submit_reply(article, reply).await
    }
}
