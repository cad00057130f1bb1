mod config;
pub use config::{ClientConfig, LoadConfig};

mod controller;
pub use controller::{FetchedPage, LoadController, LoadState, LoadTicket};

mod discussion;
pub use discussion::{fetch_page, Discussion};

mod forest;
pub use forest::{flatten, CommentState, Forest, Node, NodeIdx};

mod fuzz;

mod history;
pub use history::{ArticleHistoryItem, History};

#[cfg(not(target_arch = "wasm32"))]
mod http;
#[cfg(not(target_arch = "wasm32"))]
pub use http::{extract_title, HttpApi};

mod nickname;
pub use nickname::{mark_nickname, visible_roots};

mod pending;
pub use pending::{PendingReplies, PendingReply};

mod reconcile;
pub use reconcile::transfer_expanded;

mod storage;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStore;
pub use storage::{JsonFileStore, KvStore, MemoryStore};

pub mod api {
    pub use kommentit_api::*;
}
