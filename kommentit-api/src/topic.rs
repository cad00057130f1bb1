#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetails {
    #[serde(default)]
    pub title: String,

    /// If true, no new comments can be posted
    #[serde(default)]
    pub is_locked: bool,

    #[serde(default)]
    pub accepted_comments_count: u64,

    #[serde(default)]
    pub external_id: String,
}

impl TopicDetails {
    /// Details reported for a missing article id, without asking the server
    pub fn empty() -> TopicDetails {
        TopicDetails {
            title: String::new(),
            is_locked: true,
            accepted_comments_count: 0,
            external_id: String::new(),
        }
    }
}
