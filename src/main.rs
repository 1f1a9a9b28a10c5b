use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lisbon_scout::api::{HttpApi, InMemoryApi, ListingsApi, RunRequest, ScraperStatus};
use lisbon_scout::browser::{BrowseMode, ListingBrowser, PaginationDisplay};
use lisbon_scout::config::Config;
use lisbon_scout::engine::{
    BedroomCategory, FilterCriteria, InfiniteWindow, PageButton, PageState, SortField, SortSpec,
};
use lisbon_scout::models::{Flag, Listing};
use lisbon_scout::notify::LogNotifier;
use lisbon_scout::poller::PollHandle;
use lisbon_scout::store::ListingStore;
use lisbon_scout::toggle::{self, DiscardPolicy, ToggleMode, ToggleOptions, ToggleOutcome};

#[derive(Parser)]
#[command(name = "lisbon-scout", version, about = "Browse scraped Lisbon rental listings")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "LISBON_SCOUT_API_URL")]
    api_url: Option<String>,

    /// Browse a JSON export instead of talking to the backend
    #[arg(long, global = true, value_name = "FILE")]
    offline: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List listings with filters, sorting and paging
    List(ListArgs),
    /// Show a single listing
    Show { id: String },
    /// Flip favorite, contacted or discarded on a listing
    Toggle {
        id: String,
        flag: Flag,
        /// Flip locally before the backend answers
        #[arg(long)]
        optimistic: bool,
    },
    /// Show scraper status
    Status {
        /// Keep polling until no run is active
        #[arg(long)]
        watch: bool,
    },
    /// Trigger a scraper run
    Run {
        #[arg(long, conflicts_with = "scrapers")]
        all: bool,
        #[arg(long = "scraper", value_name = "NAME")]
        scrapers: Vec<String>,
        /// Poll status until the run finishes
        #[arg(long)]
        watch: bool,
    },
    /// Check the configured credentials
    Login,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    max_price: Option<f64>,
    /// Comma-separated: studio,1,2,3+
    #[arg(long, value_delimiter = ',')]
    bedrooms: Vec<BedroomCategory>,
    #[arg(long = "source")]
    sources: Vec<String>,
    #[arg(long)]
    favorites: bool,
    #[arg(long)]
    contacted: bool,
    #[arg(long)]
    discarded: bool,
    #[arg(long)]
    search: Option<String>,
    /// price, area or bedrooms (default: newest first)
    #[arg(long)]
    sort: Option<SortField>,
    #[arg(long, requires = "sort")]
    desc: bool,
    #[arg(long, default_value_t = 1, conflicts_with = "infinite")]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
    /// Load everything and show a growing window instead of server pages
    #[arg(long)]
    infinite: bool,
    /// Extra "load more" steps in infinite mode
    #[arg(long, default_value_t = 0, requires = "infinite")]
    more: usize,
    /// Save the shown listings as JSON
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

impl ListArgs {
    fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new()
            .with_bedrooms(self.bedrooms.iter().copied())
            .with_sources(self.sources.iter().cloned())
            .with_search(self.search.clone().unwrap_or_default());
        criteria.price_ceiling = self.max_price;
        criteria.favorites_only = self.favorites;
        criteria.contacted_only = self.contacted;
        criteria.discarded_only = self.discarded;
        criteria
    }

    fn sort_spec(&self) -> SortSpec {
        match (self.sort, self.desc) {
            (Some(field), false) => SortSpec::ascending(field),
            (Some(field), true) => SortSpec::descending(field),
            (None, _) => SortSpec::newest_first(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lisbon_scout=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }

    if let Command::Login = cli.command {
        if cli.offline.is_some() {
            bail!("Nothing to log in to in offline mode");
        }
        if config.credentials.is_none() {
            bail!("Set LISBON_SCOUT_EMAIL and LISBON_SCOUT_PASSWORD to log in");
        }
    }

    let api = connect(&config, cli.offline.as_deref()).await?;

    match cli.command {
        Command::List(args) => list(api, &config, &args).await,
        Command::Show { id } => show(api.as_ref(), &id).await,
        Command::Toggle {
            id,
            flag,
            optimistic,
        } => toggle(api.as_ref(), &id, flag, optimistic).await,
        Command::Status { watch } => {
            let status = api.scraper_status().await.context("Failed to fetch scraper status")?;
            print_status(&status);
            if watch && status.is_running() {
                watch_status(api, &config).await;
            }
            Ok(())
        }
        Command::Run { all, scrapers, watch } => {
            let request = if all {
                RunRequest::all()
            } else if !scrapers.is_empty() {
                RunRequest::only(scrapers)
            } else {
                RunRequest::default()
            };
            let response = api.run_scrapers(&request).await.context("Failed to start scrapers")?;
            info!("🚀 Scraper run requested: {}", response.status);
            if let Some(output) = response.output {
                println!("{output}");
            }
            if watch {
                watch_status(api, &config).await;
            }
            Ok(())
        }
        Command::Login => {
            println!("✅ Logged in to {}", config.api_url);
            Ok(())
        }
    }
}

async fn connect(config: &Config, offline: Option<&Path>) -> Result<Arc<dyn ListingsApi>> {
    if let Some(path) = offline {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let listings: Vec<Listing> = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a listing export", path.display()))?;
        info!("📂 Offline mode: {} listings from {}", listings.len(), path.display());
        return Ok(Arc::new(InMemoryApi::new(listings)));
    }

    let api = HttpApi::with_timeout(&config.api_url, config.timeout)
        .context("Failed to create HTTP client")?;
    if let Some(credentials) = &config.credentials {
        api.login(credentials).await.context("Login failed")?;
    } else {
        warn!("No credentials configured, requests go out unauthenticated");
    }
    Ok(Arc::new(api))
}

async fn list(api: Arc<dyn ListingsApi>, config: &Config, args: &ListArgs) -> Result<()> {
    let mode = if args.infinite {
        BrowseMode::Infinite(InfiniteWindow::default())
    } else {
        let page_size = args.page_size.unwrap_or(config.page_size);
        let page = PageState::new(page_size).starting_at(args.page);
        BrowseMode::ServerPaged(page)
    };

    let mut browser = ListingBrowser::with_mode(api, Arc::new(LogNotifier), mode)
        .with_sort(args.sort_spec())
        .with_criteria(args.criteria());

    browser.refresh().await.context("Failed to load listings")?;
    for _ in 0..args.more {
        if !browser.load_more() {
            break;
        }
    }

    let visible = browser.visible();
    for (i, listing) in visible.iter().enumerate() {
        print_listing(i + 1, listing);
    }

    match browser.pagination() {
        PaginationDisplay::Pages { range, buttons } => {
            println!("{range}");
            if buttons.len() > 1 {
                println!("Pages: {}", format_buttons(&buttons, page_of(browser.mode())));
            }
        }
        PaginationDisplay::Filtered { shown } => {
            println!(
                "{shown} matching listings on this page (page numbers hidden while filtering)"
            );
        }
        PaginationDisplay::Window { shown, matched } => {
            println!("Showing {shown} of {matched} matching listings");
        }
    }

    if let Some(path) = &args.export {
        let json = serde_json::to_string_pretty(&visible)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("💾 Saved {} listings to {}", visible.len(), path.display());
    }

    Ok(())
}

async fn show(api: &dyn ListingsApi, id: &str) -> Result<()> {
    let listing = api
        .get_listing(id)
        .await
        .with_context(|| format!("Failed to load listing {id}"))?;

    print_listing(1, &listing);
    if let Some(description) = &listing.description {
        println!("   {description}");
    }
    if let Some(floor) = &listing.floor {
        println!("   Floor: {floor}");
    }
    let hierarchy: Vec<&str> = listing.location_names().collect();
    if !hierarchy.is_empty() {
        println!("   Location: {}", hierarchy.join(" › "));
    }
    for photo in &listing.photos {
        println!("   📷 {photo}");
    }
    Ok(())
}

async fn toggle(api: &dyn ListingsApi, id: &str, flag: Flag, optimistic: bool) -> Result<()> {
    let listing = api
        .get_listing(id)
        .await
        .with_context(|| format!("Failed to load listing {id}"))?;
    let mut store = ListingStore::from_listings(vec![listing]);

    let options = ToggleOptions {
        mode: if optimistic {
            ToggleMode::Optimistic
        } else {
            ToggleMode::Confirmed
        },
        discard: DiscardPolicy::Keep,
    };

    match toggle::toggle_flag(api, &mut store, id, flag, options, &LogNotifier).await {
        ToggleOutcome::Applied { value } => {
            println!("{} {id}: {flag} = {value}", if value { "✅" } else { "➖" });
            Ok(())
        }
        ToggleOutcome::Failed { reason } => bail!("Could not toggle {flag} on {id}: {reason}"),
        ToggleOutcome::Superseded => Ok(()),
        ToggleOutcome::NotLoaded => bail!("Listing {id} is not loaded"),
    }
}

async fn watch_status(api: Arc<dyn ListingsApi>, config: &Config) {
    let handle = PollHandle::spawn(api, config.poll);
    let mut updates = handle.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(status) = updates.borrow_and_update().clone() {
                    print_status(&status);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping status watch");
                break;
            }
        }
    }

    handle.stop().await;
}

fn print_listing(position: usize, listing: &Listing) {
    let bedrooms = if listing.is_studio() {
        "studio".to_string()
    } else {
        format!("T{}", listing.bedrooms)
    };

    println!("{}. {} ({:.0} €/month)", position, listing.name, listing.price);
    println!("   {} · {:.0} m² · {}", bedrooms, listing.area, listing.zone);

    let flags: Vec<String> = Flag::ALL
        .into_iter()
        .filter(|flag| listing.flag(*flag))
        .map(|flag| flag.to_string())
        .collect();
    if flags.is_empty() {
        println!("   Source: {}", listing.source);
    } else {
        println!("   Source: {} [{}]", listing.source, flags.join(", "));
    }

    println!("   ID: {}", listing.id);
    if let Some(url) = &listing.url {
        println!("   URL: {url}");
    }
    if let Some(photo) = listing.cover_photo() {
        println!("   Photo: {photo}");
    }
    println!();
}

fn print_status(status: &ScraperStatus) {
    let run = &status.main_run;
    let icon = if run.is_running() {
        "⏳"
    } else if run.is_failed() {
        "❌"
    } else {
        "✅"
    };
    let state = if run.status.is_empty() {
        "idle"
    } else {
        run.status.as_str()
    };
    println!("{icon} Main run: {state}");
    if let Some(started) = run.started_at {
        println!("   Started:  {started}");
    }
    if let Some(finished) = run.finished_at {
        println!("   Finished: {finished}");
    }
    if let Some(found) = run.houses_found {
        println!("   Listings found: {found}");
    }
    if let Some(error) = &run.error_message {
        println!("   Error: {error}");
    }

    for (key, scraper) in &status.scrapers {
        let name = scraper.name.as_deref().unwrap_or(key);
        let last = scraper.last_status.as_deref().unwrap_or("never run");
        match scraper.houses_found {
            Some(found) => println!("   - {name}: {last} ({found} listings)"),
            None => println!("   - {name}: {last}"),
        }
        if let Some(error) = &scraper.error_message {
            println!("     Error: {error}");
        }
    }
}

fn page_of(mode: BrowseMode) -> usize {
    match mode {
        BrowseMode::ServerPaged(page) => page.current_page(),
        BrowseMode::Infinite(_) => 1,
    }
}

fn format_buttons(buttons: &[PageButton], current: usize) -> String {
    buttons
        .iter()
        .map(|button| match button {
            PageButton::Page(n) if *n == current => format!("[{n}]"),
            PageButton::Page(n) => n.to_string(),
            PageButton::Ellipsis => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
