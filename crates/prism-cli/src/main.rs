mod dashboard;
mod notifier;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use prism_sdk::admin::{DEFAULT_PAGE_SIZE, USERS_PAGE_SIZE};
use prism_sdk::{
    AdminClient, ChannelStatus, ClientConfig, CredentialStore, FileCredentialStore, Gateway,
    GatewayError, NoticeQuery, PageRequest, StreamSession,
};

use crate::notifier::ConsoleNotifier;

#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(about = "Prism admin console")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Base address of the admin API (e.g. http://localhost:8080/api/v1)
    #[arg(long, env = "PRISM_API_BASE_URL", global = true)]
    pub api_url: Option<String>,

    /// Address of the live stream server (e.g. nats://localhost:4222)
    #[arg(long, env = "PRISM_STREAM_URL", global = true)]
    pub stream_url: Option<String>,

    /// Credential file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PRISM_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// List platform users
    Users(PageArgs),
    /// List the home feed
    Feeds(PageArgs),
    /// List notices, newest first
    Notices {
        /// Only notices whose title or body contains this text
        #[arg(long, default_value = "")]
        search: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Category channel moderation
    Channels {
        #[command(subcommand)]
        action: ChannelAction,
    },
    /// Resolve a stored file name to its URL
    FileUrl { filename: String },
    /// Live connected-user counters
    Dashboard {
        /// Print updates line by line instead of the full-screen view
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChannelAction {
    /// List channels with their moderation state
    List(PageArgs),
    /// Approve a pending channel
    Approve { id: u64 },
    /// Reject a pending channel
    Reject { id: u64 },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Items per page
    #[arg(long)]
    pub size: Option<u32>,
}

impl PageArgs {
    fn request(self, default_size: u32) -> PageRequest {
        PageRequest::new(
            self.page.saturating_sub(1),
            self.size.unwrap_or(default_size),
        )
    }
}

fn footer<T>(page: &prism_sdk::Page<T>) -> String {
    format!(
        "page {}/{} ({} total)",
        page.display_number(),
        page.total_pages.max(1),
        page.total_elements
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(url) = cli.stream_url {
        config.stream_url = url;
    }

    let store: Arc<dyn CredentialStore> = match cli.credentials {
        Some(path) => Arc::new(FileCredentialStore::open(path)),
        None => Arc::new(
            FileCredentialStore::open_default().context("cannot locate the config directory")?,
        ),
    };

    let stream_url = config.stream_url.clone();
    let gateway = Gateway::new(config, Arc::clone(&store))?
        .with_notifier(Arc::new(ConsoleNotifier));
    let admin = AdminClient::new(Arc::new(gateway));

    match run(cli.command, &admin, &store, &stream_url).await {
        Err(e) if matches!(e.downcast_ref::<GatewayError>(), Some(GatewayError::AuthRequired)) => {
            // The notifier already told the user to log in again.
            std::process::exit(2);
        }
        other => other,
    }
}

async fn run(
    command: Commands,
    admin: &AdminClient,
    store: &Arc<dyn CredentialStore>,
    stream_url: &str,
) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let profile = admin.login(&email, &password).await?;
            println!(
                "Signed in as {} ({})",
                profile.label(),
                profile.authority.as_deref().unwrap_or("no authority")
            );
        }
        Commands::Logout => {
            admin.logout();
            println!("Signed out.");
        }
        Commands::Users(page) => {
            let page = admin.list_users(page.request(USERS_PAGE_SIZE)).await?;
            println!("{:>5}  {:<24} {:<18} {:<10} STATE", "ID", "EMAIL", "NAME", "LOCATION");
            for u in &page.content {
                println!(
                    "{:>5}  {:<24} {:<18} {:<10} {}",
                    u.id,
                    u.email,
                    u.display_name,
                    u.location.as_deref().unwrap_or("-"),
                    u.account_state()
                );
            }
            println!("{}", footer(&page));
        }
        Commands::Feeds(page) => {
            let page = admin.list_feeds(page.request(DEFAULT_PAGE_SIZE)).await?;
            println!("{:>5}  {:<16} {:<28} {:>6} {:>6}  CREATED", "ID", "AUTHOR", "TITLE", "VIEWS", "LIKES");
            for f in &page.content {
                println!(
                    "{:>5}  {:<16} {:<28} {:>6} {:>6}  {}",
                    f.id,
                    f.author_name(),
                    f.title,
                    f.view_count,
                    f.likes_count,
                    f.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            println!("{}", footer(&page));
        }
        Commands::Notices { search, page } => {
            let query = NoticeQuery::search(search).with_page(page.request(DEFAULT_PAGE_SIZE));
            let page = admin.list_notices(&query).await?;
            println!("{:>5}  {:<36} {:<14} CREATED", "ID", "TITLE", "AUTHOR");
            for n in &page.content {
                println!(
                    "{:>5}  {:<36} {:<14} {}",
                    n.id,
                    n.title,
                    n.author,
                    n.created_at.format("%Y-%m-%d")
                );
            }
            println!("{}", footer(&page));
        }
        Commands::Channels { action } => match action {
            ChannelAction::List(page) => {
                let page = admin.list_category_channels(page.request(DEFAULT_PAGE_SIZE)).await?;
                println!("{:>5}  {:<20} {:>7}  STATUS", "ID", "NAME", "MEMBERS");
                for c in &page.content {
                    println!(
                        "{:>5}  {:<20} {:>7}  {}",
                        c.id,
                        c.display_name,
                        c.category_channel_user_counts.join_count,
                        c.category_channel_status
                    );
                }
                println!("{}", footer(&page));
            }
            ChannelAction::Approve { id } => {
                admin.set_channel_status(id, ChannelStatus::Approved).await?;
            }
            ChannelAction::Reject { id } => {
                admin.set_channel_status(id, ChannelStatus::Rejected).await?;
            }
        },
        Commands::FileUrl { filename } => {
            println!("{}", admin.file_url(&filename).await?);
        }
        Commands::Dashboard { plain } => {
            let session = StreamSession::open(stream_url, store.current().as_ref())
                .await
                .with_context(|| format!("cannot reach the stream server at {stream_url}"))?;
            dashboard::run(session, plain).await?;
        }
    }
    Ok(())
}
