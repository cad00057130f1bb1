use crate::api::MAX_PAGE_SIZE;

/// Where the services live, and how to identify to them
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    pub comments_url: String,
    pub login_url: String,
    pub datacloud_url: String,
    pub news_url: String,

    /// Application credentials of the comments API
    pub app_id: String,
    pub app_key: String,

    /// Application credentials of the login service
    pub login_app_id: String,
    pub login_app_key: String,
    pub initiating_app: String,

    /// Retries for idempotent requests that failed transiently
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            comments_url: String::from("https://comments.api.yle.fi"),
            login_url: String::from("https://login.api.yle.fi"),
            datacloud_url: String::from("https://datacloud.api.yle.fi"),
            news_url: String::from("https://yle.fi"),
            app_id: String::from("yle-comments-plugin"),
            app_key: String::new(),
            login_app_id: String::from("tunnus_shared_ui_202004_prod"),
            login_app_key: String::new(),
            initiating_app: String::from("uutiset"),
            max_retries: 3,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadConfig {
    /// Comments requested per page, clamped to what the API accepts
    pub page_size: usize,

    /// The loading indicator stays on for at least this long after a load started
    pub min_loading: chrono::Duration,
}

impl Default for LoadConfig {
    fn default() -> LoadConfig {
        LoadConfig {
            page_size: MAX_PAGE_SIZE,
            min_loading: chrono::Duration::milliseconds(500),
        }
    }
}

impl LoadConfig {
    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let mut c = LoadConfig::default();
        assert_eq!(c.page_size(), 20);
        c.page_size = 0;
        assert_eq!(c.page_size(), 1);
        c.page_size = 500;
        assert_eq!(c.page_size(), 20);
        c.page_size = 2;
        assert_eq!(c.page_size(), 2);
    }
}
