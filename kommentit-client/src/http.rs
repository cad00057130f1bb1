use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

use crate::{
    api::{
        group_discussions, ArticleId, Comment, CommentId, CommentService, Error,
        GroupedDiscussion, HistoryEntry, NewReply, ReplyReceipt, TopicDetails,
    },
    ClientConfig,
};

lazy_static::lazy_static! {
    static ref TITLE: Regex =
        Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid");
    static ref SITE_SUFFIX: Regex =
        Regex::new(r"\s*[-|]\s*Yle.*$").expect("site suffix regex is valid");
}

/// Talks to the real services, keeping the session cookie between requests
///
/// Only idempotent requests get retried on transient failures.
#[derive(Clone)]
pub struct HttpApi {
    config: ClientConfig,
    client: reqwest::Client,
    retrying: ClientWithMiddleware,
}

fn network(e: impl std::fmt::Display) -> Error {
    Error::Network(e.to_string())
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    match status.is_success() {
        true => Ok(resp),
        false => Err(Error::from_status(status.as_u16())),
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await.map_err(network)?;
    serde_json::from_str(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
}

/// Extracts the title of an html page, without the site name
pub fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE.captures(html)?.get(1)?.as_str().trim();
    let title = SITE_SUFFIX.replace(raw, "").trim().to_string();
    match title.is_empty() {
        true => None,
        false => Some(title),
    }
}

impl HttpApi {
    pub fn new(config: ClientConfig) -> anyhow::Result<HttpApi> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .context("building http client")?;
        let policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let retrying = ClientBuilder::new(client.clone())
            .with(RetryTransientMiddleware::new_with_policy(policy))
            .build();
        Ok(HttpApi {
            config,
            client,
            retrying,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn app_params(&self) -> [(&'static str, &str); 2] {
        [
            ("app_id", self.config.app_id.as_str()),
            ("app_key", self.config.app_key.as_str()),
        ]
    }

    fn login_params(&self) -> [(&'static str, &str); 3] {
        [
            ("app_id", self.config.login_app_id.as_str()),
            ("app_key", self.config.login_app_key.as_str()),
            ("initiating_app", self.config.initiating_app.as_str()),
        ]
    }

    fn topic_url(&self, article: &ArticleId) -> String {
        format!("{}/v1/topics/{}", self.config.comments_url, article)
    }

    async fn get_json<T>(&self, url: String, query: &[(&str, &str)]) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(%url, "fetching");
        let resp = self
            .retrying
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(%url, ?e, "request failed");
                network(e)
            })?;
        parse_json(check_status(resp)?).await
    }

    /// Logs in, storing the session cookie on success
    ///
    /// Any failure just leaves the session logged out.
    pub async fn login(&self, user: &str, password: &str) -> bool {
        let url = format!("{}/v1/user/login", self.config.login_url);
        let resp = self
            .client
            .post(&url)
            .query(&self.login_params())
            .form(&[("username", user), ("password", password)])
            .send()
            .await;
        match resp {
            Ok(r) if r.status().as_u16() == 200 || r.status().as_u16() == 204 => {
                tracing::info!(user, "logged in");
                true
            }
            Ok(r) => {
                tracing::warn!(user, status = r.status().as_u16(), "login refused");
                false
            }
            Err(err) => {
                tracing::error!(user, ?err, "failed to log in");
                false
            }
        }
    }

    pub async fn logout(&self) {
        let url = format!("{}/v1/user/login", self.config.login_url);
        let resp = self
            .client
            .delete(&url)
            .query(&self.login_params())
            .send()
            .await;
        match resp {
            Err(e) => tracing::error!("failed to log out: {:?}", e),
            Ok(resp) if !resp.status().is_success() => {
                tracing::warn!(status = resp.status().as_u16(), "log out was refused")
            }
            Ok(_) => (),
        }
    }

    /// The articles the logged-in user commented on, with their comments
    ///
    /// Not being logged in gives an empty list.
    pub async fn my_discussions(&self) -> Result<Vec<GroupedDiscussion>, Error> {
        let url = format!("{}/v2/tv/history", self.config.datacloud_url);
        let query = [
            ("limit", "40"),
            ("exclude_sub_accounts", "true"),
            ("fetch_comments", "true"),
        ];
        match self.get_json::<Vec<HistoryEntry>>(url, &query).await {
            Ok(entries) => Ok(group_discussions(entries)),
            Err(Error::PermissionDenied) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Title of the article on the news site
    pub async fn fetch_title(&self, article: &ArticleId) -> Option<String> {
        if article.is_empty() {
            return None;
        }
        let url = format!("{}/a/{}", self.config.news_url, article);
        let resp = self.retrying.get(&url).send().await.map_err(network);
        let html = match resp.and_then(check_status) {
            Ok(r) => r.text().await.map_err(network),
            Err(e) => Err(e),
        };
        match html {
            Ok(html) => extract_title(&html),
            Err(err) => {
                tracing::warn!(%article, ?err, "failed to fetch article title");
                None
            }
        }
    }

    async fn post_like(
        &self,
        article: &ArticleId,
        comment: &CommentId,
        action: &str,
    ) -> Result<(), Error> {
        let url = format!("{}/comments/{}/{}", self.topic_url(article), comment, action);
        tracing::debug!(%url, "posting");
        let resp = self
            .client
            .post(&url)
            .query(&self.app_params())
            .send()
            .await
            .map_err(network)?;
        check_status(resp)?;
        Ok(())
    }
}

#[async_trait]
impl CommentService for HttpApi {
    async fn fetch_comments(
        &self,
        article: &ArticleId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Comment>, Error> {
        if article.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/v2/topics/{}/comments/accepted",
            self.config.comments_url, article
        );
        let (offset, limit) = (offset.to_string(), limit.to_string());
        let [app_id, app_key] = self.app_params();
        let query = [
            app_id,
            app_key,
            ("accepted", "true"),
            ("order", "relevance:desc"),
            ("limit", limit.as_str()),
            ("offset", offset.as_str()),
        ];
        self.get_json(url, &query).await
    }

    async fn fetch_liked(&self, article: &ArticleId) -> Result<Vec<CommentId>, Error> {
        if article.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/comments/liked", self.topic_url(article));
        self.get_json(url, &self.app_params()).await
    }

    async fn topic_details(&self, article: &ArticleId) -> Result<TopicDetails, Error> {
        if article.is_empty() {
            return Ok(TopicDetails::empty());
        }
        self.get_json(self.topic_url(article), &self.app_params()).await
    }

    async fn like(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error> {
        self.post_like(article, comment, "like").await
    }

    async fn unlike(&self, article: &ArticleId, comment: &CommentId) -> Result<(), Error> {
        self.post_like(article, comment, "unlike").await
    }

    async fn submit_reply(
        &self,
        article: &ArticleId,
        reply: &NewReply,
    ) -> Result<ReplyReceipt, Error> {
        let url = format!("{}/comments", self.topic_url(article));
        tracing::debug!(%url, parent = %reply.parent_id, "submitting reply");
        let resp = self
            .client
            .post(&url)
            .query(&self.app_params())
            .json(reply)
            .send()
            .await
            .map_err(network)?;
        parse_json(check_status(resp)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_of_article_page() {
        let html = r#"<html><head><meta charset="utf-8">
            <TITLE>Kunnat karsivat palveluita | Yle Uutiset</TITLE></head></html>"#;
        assert_eq!(
            extract_title(html),
            Some(String::from("Kunnat karsivat palveluita"))
        );
        assert_eq!(
            extract_title("<title>\n  Sää helpottaa - Yle Uutiset - yle.fi\n</title>"),
            Some(String::from("Sää helpottaa"))
        );
        assert_eq!(extract_title("<title>Plain</title>"), Some(String::from("Plain")));
        assert_eq!(extract_title("<title> - Yle</title>"), None);
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[tokio::test]
    async fn empty_article_needs_no_request() {
        let api = HttpApi::new(ClientConfig {
            comments_url: String::from("http://127.0.0.1:9"),
            ..ClientConfig::default()
        })
        .unwrap();
        let article = ArticleId::default();
        assert_eq!(api.fetch_comments(&article, 0, 20).await, Ok(Vec::new()));
        assert_eq!(api.fetch_liked(&article).await, Ok(Vec::new()));
        assert_eq!(api.topic_details(&article).await, Ok(TopicDetails::empty()));
        assert_eq!(api.fetch_title(&article).await, None);
    }
}
