use chrono::Utc;

mod article;
pub use article::ArticleId;

mod comment;
pub use comment::{Comment, CommentId, NewReply, ReplyReceipt};

mod discussion;
pub use discussion::{group_discussions, GroupedDiscussion, HistoryComment, HistoryEntry};

mod error;
pub use error::Error;

mod service;
pub use service::CommentService;

mod topic;
pub use topic::TopicDetails;

pub type Time = chrono::DateTime<Utc>;

/// The API refuses page sizes outside of this range
pub const MAX_PAGE_SIZE: usize = 20;
