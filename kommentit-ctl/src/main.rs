use std::path::PathBuf;

use anyhow::Context;
use kommentit_client::{
    api::{ArticleId, CommentId, CommentService},
    ClientConfig, Discussion, History, HttpApi, JsonFileStore, LoadConfig, PendingReplies,
};

mod render;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(long, env = "KOMMENTIT_COMMENTS_URL", default_value = "https://comments.api.yle.fi")]
    comments_url: String,

    #[structopt(long, env = "KOMMENTIT_LOGIN_URL", default_value = "https://login.api.yle.fi")]
    login_url: String,

    #[structopt(long, env = "KOMMENTIT_DATACLOUD_URL", default_value = "https://datacloud.api.yle.fi")]
    datacloud_url: String,

    #[structopt(long, env = "KOMMENTIT_NEWS_URL", default_value = "https://yle.fi")]
    news_url: String,

    #[structopt(long, env = "KOMMENTIT_APP_ID", default_value = "yle-comments-plugin")]
    app_id: String,

    #[structopt(long, env = "KOMMENTIT_APP_KEY", hide_env_values = true, default_value = "")]
    app_key: String,

    #[structopt(long, env = "KOMMENTIT_LOGIN_APP_ID", default_value = "tunnus_shared_ui_202004_prod")]
    login_app_id: String,

    #[structopt(long, env = "KOMMENTIT_LOGIN_APP_KEY", hide_env_values = true, default_value = "")]
    login_app_key: String,

    /// Retries of failed idempotent requests
    #[structopt(long, env = "KOMMENTIT_MAX_RETRIES", default_value = "3")]
    max_retries: u32,

    /// Where reading history and pending replies are kept
    #[structopt(long, env = "KOMMENTIT_STATE_DIR", parse(from_os_str))]
    state_dir: Option<PathBuf>,

    /// Log in as this user before running the command, with the password taken
    /// from KOMMENTIT_PASSWORD
    #[structopt(short, long, env = "KOMMENTIT_USER")]
    user: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Show the comments of an article
    Show {
        /// Article id or url; defaults to the last article read
        article: Option<String>,

        /// Mark comments whose author starts with this, and their ancestors
        #[structopt(short, long)]
        nickname: Option<String>,

        /// Only show the threads where the nickname was found
        #[structopt(long)]
        only_matching: bool,

        /// Number of pages to load
        #[structopt(short, long, default_value = "1")]
        pages: usize,

        /// Comments per page
        #[structopt(long, default_value = "20")]
        page_size: usize,

        /// Show replies too
        #[structopt(short, long)]
        expand: bool,
    },

    /// Like a comment
    Like { article: String, comment: String },

    /// Remove a like from a comment
    Unlike { article: String, comment: String },

    /// Reply to a comment; the reply shows up once moderated
    Reply {
        article: String,
        parent: String,
        content: String,
    },

    /// List the articles read recently
    History,

    /// Forget articles from the reading history, or all of them
    HistoryClear { articles: Vec<String> },

    /// List replies still awaiting moderation
    Pending,

    /// List the articles the logged-in user commented on
    MyDiscussions,

    /// Print the title of an article
    Title { article: String },
}

fn parse_article(input: &str) -> anyhow::Result<ArticleId> {
    ArticleId::parse_input(input)
        .with_context(|| format!("{input:?} is neither an article id nor an article url"))
}

fn state_dir(dir: Option<&PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir.clone());
    }
    let home = std::env::var_os("HOME").context("retrieving HOME environment variable")?;
    Ok(PathBuf::from(home).join(".local/state/kommentit"))
}

fn config(opt: &Opt) -> ClientConfig {
    ClientConfig {
        comments_url: opt.comments_url.clone(),
        login_url: opt.login_url.clone(),
        datacloud_url: opt.datacloud_url.clone(),
        news_url: opt.news_url.clone(),
        app_id: opt.app_id.clone(),
        app_key: opt.app_key.clone(),
        login_app_id: opt.login_app_id.clone(),
        login_app_key: opt.login_app_key.clone(),
        max_retries: opt.max_retries,
        ..ClientConfig::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let api = HttpApi::new(config(&opt))?;
    let store = JsonFileStore::open(state_dir(opt.state_dir.as_ref())?)?;

    if let Some(user) = &opt.user {
        let password = std::env::var("KOMMENTIT_PASSWORD")
            .context("retrieving KOMMENTIT_PASSWORD environment variable")?;
        if !api.login(user, &password).await {
            anyhow::bail!("failed logging in as {user}");
        }
    }

    let res = run(opt.cmd, &api, store).await;
    if opt.user.is_some() {
        api.logout().await;
    }
    res
}

async fn run(cmd: Command, api: &HttpApi, store: JsonFileStore) -> anyhow::Result<()> {
    match cmd {
        Command::Show {
            article,
            nickname,
            only_matching,
            pages,
            page_size,
            expand,
        } => {
            let config = LoadConfig {
                page_size,
                ..LoadConfig::default()
            };
            let mut d = Discussion::new(api, store, config);
            match article {
                Some(a) => {
                    d.set_article(parse_article(&a)?);
                }
                None => {
                    d.open_latest_from_history()
                        .context("no article given and reading history is empty")?;
                }
            }
            if !d.load(true).await {
                anyhow::bail!("failed loading comments of {}", d.article());
            }
            for _ in 1..pages {
                if !d.load_more().await {
                    break;
                }
            }
            if let Some(n) = nickname {
                if !d.set_nickname_filter(&n) {
                    tracing::warn!(nickname = %n, "no comment by this nickname");
                }
                d.set_hide_unmarked(only_matching);
            }
            if let Some(t) = d.topic() {
                print!("{}", render::topic(t));
            }
            let roots = d.visible_roots();
            print!(
                "{}",
                render::threads(d.forest(), &roots, expand, &d.pending_replies())
            );
            if d.has_more() {
                println!("(more comments available, use --pages)");
            }
            println!("{}", d.article().comments_link());
        }
        Command::Like { article, comment } => {
            api.like(&parse_article(&article)?, &CommentId(comment))
                .await
                .context("liking comment")?;
        }
        Command::Unlike { article, comment } => {
            api.unlike(&parse_article(&article)?, &CommentId(comment))
                .await
                .context("removing like")?;
        }
        Command::Reply {
            article,
            parent,
            content,
        } => {
            let mut d = Discussion::new(api, store, LoadConfig::default());
            d.set_article(parse_article(&article)?);
            let reply = d
                .reply(&CommentId(parent), &content)
                .await
                .context("reply was not accepted")?;
            println!("reply {} awaiting moderation", reply.reply_id);
        }
        Command::History => {
            print!("{}", render::history(&History::new(store).get()));
        }
        Command::HistoryClear { articles } => {
            let history = History::new(store);
            if articles.is_empty() {
                history.clear_all()?;
            } else {
                let ids = articles
                    .iter()
                    .map(|a| parse_article(a))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                history.clear(&ids)?;
            }
        }
        Command::Pending => {
            for p in PendingReplies::new(store).all() {
                println!("{} -> {}: {}", p.article_id, p.parent_id, p.content);
            }
        }
        Command::MyDiscussions => {
            let ds = api
                .my_discussions()
                .await
                .context("fetching own discussions")?;
            print!("{}", render::discussions(&ds));
        }
        Command::Title { article } => {
            let article = parse_article(&article)?;
            let title = api
                .fetch_title(&article)
                .await
                .with_context(|| format!("fetching title of {article}"))?;
            println!("{title}");
        }
    }

    Ok(())
}
