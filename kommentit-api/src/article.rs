use std::fmt;

use regex::Regex;

lazy_static::lazy_static! {
    // Article ids look like `74-20194923`
    static ref ARTICLE_ID_IN_TEXT: Regex =
        Regex::new(r"(\d{2}-\d{8})").expect("article id regex is valid");
    static ref ARTICLE_ID_AT_URL_END: Regex =
        Regex::new(r"/a/(\d+-\d+)$").expect("article url regex is valid");
}

#[derive(
    Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    /// Extracts an article id from user input: either a pasted article url, or the
    /// id itself
    ///
    /// Input that contains no recognizable id but has spaces in it is rejected. Any
    /// other single word is taken as-is, so that ids with an unusual format still
    /// work.
    pub fn parse_input(input: &str) -> Option<ArticleId> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Some(m) = ARTICLE_ID_IN_TEXT.captures(input).and_then(|c| c.get(1)) {
            return Some(ArticleId(m.as_str().to_string()));
        }
        if !input.contains(' ') {
            return Some(ArticleId(input.to_string()));
        }
        None
    }

    /// Extracts the article id from an url ending in `/a/<article-id>`
    pub fn from_article_url(url: &str) -> Option<ArticleId> {
        ARTICLE_ID_AT_URL_END
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| ArticleId(m.as_str().to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Link to the comment section of the article on the news site
    pub fn comments_link(&self) -> String {
        format!("https://yle.fi/a/{}#comments", self.0)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> ArticleId {
        ArticleId(s.to_string())
    }
}
