use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use repobrowse_core::{
    views::{BookmarkListEvent, DetailEvent, ErrorDisplay, ListEvent, RepoListState},
    AppServices, BookmarkListStore, Config, FetchError, Grouping, RepoDetailStore, RepoListStore,
    Repository, ServiceRegistry,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "repobrowse")]
#[command(version, about = "Browse public GitHub repositories and keep bookmarks", long_about = None)]
struct Cli {
    /// GitHub token, overrides the config file
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Page through the public repository listing
    Browse {
        /// How many pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// How to group the results
        #[arg(long, value_enum, default_value_t = GroupBy::Owner)]
        group_by: GroupBy,

        /// Only show repositories matching this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show repository details
    Show {
        /// Repository name (owner/repo)
        name: String,

        /// Bookmark it while we're here
        #[arg(long, conflicts_with = "unbookmark")]
        bookmark: bool,

        /// Drop the bookmark
        #[arg(long)]
        unbookmark: bool,
    },
    /// Manage bookmarks
    Bookmarks {
        #[command(subcommand)]
        action: BookmarkAction,
    },
}

#[derive(Subcommand)]
enum BookmarkAction {
    /// List bookmarks, most recent first
    List {
        /// Print as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Remove one bookmark (owner/repo)
    Remove { name: String },
    /// Remove every bookmark
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Owner,
    Fork,
    Language,
    Stars,
}

impl From<GroupBy> for Grouping {
    fn from(value: GroupBy) -> Self {
        match value {
            GroupBy::Owner => Grouping::OwnerType,
            GroupBy::Fork => Grouping::ForkStatus,
            GroupBy::Language => Grouping::Language,
            GroupBy::Stars => Grouping::Stargazers,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repobrowse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(token) = cli.token {
        config.github.token = Some(token);
    }

    let services = ServiceRegistry::from_config(&config)?
        .resolve()
        .context("Failed to set up services")?;

    match command {
        Commands::Browse {
            pages,
            group_by,
            filter,
        } => browse(&services, pages, group_by.into(), filter).await,
        Commands::Show {
            name,
            bookmark,
            unbookmark,
        } => show(&services, &name, bookmark, unbookmark).await,
        Commands::Bookmarks { action } => bookmarks(&services, action).await,
    }
}

async fn browse(
    services: &AppServices,
    pages: usize,
    grouping: Grouping,
    filter: Option<String>,
) -> anyhow::Result<()> {
    tracing::info!("Browsing {} page(s) grouped by {}", pages, grouping.as_str());

    let store = RepoListStore::new(services);
    if let Some(filter) = filter {
        store.send(ListEvent::UpdateSearch(filter));
    }

    store.send(ListEvent::LoadInitial);
    let mut state = wait_for_page(&store, 0).await;

    for _ in 1..pages {
        if !state.can_load_more() {
            break;
        }
        store.send(ListEvent::LoadMore);
        state = wait_for_page(&store, state.page_request).await;
    }

    if let Some(ErrorDisplay::Blocking(message)) = state.error_display() {
        bail!("Couldn't load repositories: {}", message);
    }

    // Group once all pages are in so there's a single enrichment pass
    // The enrichment pass is marked pending in the same step as the regroup
    store.send(ListEvent::ChangeGrouping(grouping));
    state = store
        .wait_until(|s| s.grouping == grouping && !s.is_enriching())
        .await;

    for group in state.groups() {
        println!("{} ({})", group.key, group.repos.len());
        for repo in &group.repos {
            println!("  {}", summary_line(repo, state.is_bookmarked(repo.id)));
        }
    }

    if let Some(ErrorDisplay::Inline(message)) = state.error_display() {
        eprintln!("Stopped early: {}", message);
    }
    if state.has_more_pages() {
        println!("More pages available; try --pages {}", pages + 1);
    }

    Ok(())
}

/// Wait until the page fetch started after `previous` settles
async fn wait_for_page(store: &RepoListStore, previous: u64) -> RepoListState {
    store
        .wait_until(|s| s.page_request > previous && !s.is_fetching_page())
        .await
}

async fn show(
    services: &AppServices,
    name: &str,
    bookmark: bool,
    unbookmark: bool,
) -> anyhow::Result<()> {
    let repo = match services.provider.fetch_repository(name).await {
        Ok(repo) => repo,
        Err(e) if e.as_fetch() == Some(&FetchError::NotFound) => {
            bail!("No repository named {}", name)
        }
        Err(e) => return Err(e).with_context(|| format!("Couldn't fetch {}", name)),
    };

    let store = RepoDetailStore::new(services, repo);
    store.send(DetailEvent::LoadDetail);

    let mut state = store.state();
    if (bookmark && !state.is_bookmarked) || (unbookmark && state.is_bookmarked) {
        let want = !state.is_bookmarked;
        store.send(DetailEvent::ToggleBookmark);
        state = store.wait_until(|s| s.is_bookmarked == want).await;
    }

    let repo = &state.repository;
    println!("{}", repo.full_name);
    if let Some(description) = &repo.description {
        println!("  {}", description);
    }
    println!("  {}", repo.html_url);
    println!(
        "  owner: {}{}",
        repo.owner.login,
        repo.owner
            .kind
            .map(|k| format!(" ({})", k))
            .unwrap_or_default()
    );
    println!("  stars: {}", count(repo.stars()));
    println!("  forks: {}", count(repo.forks()));
    println!("  open issues: {}", count(repo.open_issues()));
    println!("  language: {}", repo.language().unwrap_or("Unknown"));
    if let Some(updated) = repo.updated_at() {
        println!("  updated: {}", updated.format("%Y-%m-%d"));
    }
    if repo.fork {
        println!("  fork");
    }
    println!(
        "  {}",
        if state.is_bookmarked {
            "bookmarked"
        } else {
            "not bookmarked"
        }
    );

    Ok(())
}

async fn bookmarks(services: &AppServices, action: BookmarkAction) -> anyhow::Result<()> {
    let store = BookmarkListStore::new(services);

    match action {
        BookmarkAction::List { json } => {
            let state = store.state();
            if json {
                println!("{}", serde_json::to_string_pretty(state.bookmarks.items())?);
            } else if state.bookmarks.is_empty() {
                println!("No bookmarks yet");
            } else {
                for repo in state.bookmarks.items() {
                    println!("{}", summary_line(repo, true));
                }
            }
        }
        BookmarkAction::Remove { name } => {
            let state = store.state();
            let Some(repo) = state
                .bookmarks
                .items()
                .iter()
                .find(|r| r.full_name.eq_ignore_ascii_case(&name))
                .cloned()
            else {
                println!("{} is not bookmarked", name);
                return Ok(());
            };

            store.send(BookmarkListEvent::Remove(repo.clone()));
            store.wait_until(|s| !s.bookmarks.contains(repo.id)).await;
            println!("Removed {}", repo.full_name);
        }
        BookmarkAction::Clear => {
            store.send(BookmarkListEvent::DeleteAll);
            store.wait_until(|s| s.bookmarks.is_empty()).await;
            println!("All bookmarks removed");
        }
    }

    Ok(())
}

fn summary_line(repo: &Repository, bookmarked: bool) -> String {
    let mut line = format!("{}{}", if bookmarked { "* " } else { "" }, repo.full_name);
    if let Some(stars) = repo.stars() {
        line.push_str(&format!("  ★ {}", stars));
    }
    if let Some(language) = repo.language() {
        line.push_str(&format!("  [{}]", language));
    }
    if let Some(description) = &repo.description {
        line.push_str(&format!("  - {}", description));
    }
    line
}

fn count(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
