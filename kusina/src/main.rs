//! kusina - restaurant admin dashboard CLI
//!
//! Commands:
//! - `login` / `logout` / `status` - session management
//! - `sales` / `engagement` - reports (terminal, markdown or JSON)
//! - `menu` - list dishes, add a dish
//! - `applications` - review and accept restaurant applications
//! - `reported` - moderate reported videos
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/kusina/config.toml (~/.config/kusina/config.toml)
//! - Session and logs: $XDG_STATE_HOME/kusina/ (~/.local/state/kusina/)

mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use kusina_core::admin::{
    accept_application, add_dish, delete_video, list_applications, list_menu, reported_videos,
    set_application_status, DishImage, NewDish,
};
use kusina_core::analytics::{
    generate_engagement_report, generate_sales_report, resolve_restaurant, ReportOptions,
    ReportPeriod, SalesReport,
};
use kusina_core::auth::{self, verify_business, AuthClient};
use kusina_core::storage::content_type_for;
use kusina_core::{ApplicationStatus, Config, Fetcher, FirestoreStore, Session, SupabaseStorage};

use crate::output::Export;

#[derive(Parser)]
#[command(name = "kusina")]
#[command(about = "Restaurant admin dashboard: reports, menu and moderation")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with a business account
    Login {
        #[arg(long, env = "KUSINA_EMAIL")]
        email: String,

        #[arg(long, env = "KUSINA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the saved session
    Logout,

    /// Show configuration and session status
    Status,

    /// Sales report for your restaurant
    Sales {
        /// Period: YYYY, YYYY-MM or Nd (default: current month)
        #[arg(long)]
        period: Option<String>,

        /// Restaurant id (default: the one linked to your account)
        #[arg(long)]
        restaurant: Option<String>,

        /// Disable trend comparison with previous period
        #[arg(long)]
        no_trends: bool,

        /// Export format (md = markdown, json = JSON)
        #[arg(long)]
        export: Option<String>,
    },

    /// Platform engagement report
    Engagement {
        /// Period: YYYY, YYYY-MM or Nd (default: current month)
        #[arg(long)]
        period: Option<String>,

        /// Disable trend comparison with previous period
        #[arg(long)]
        no_trends: bool,

        /// Export format (md = markdown, json = JSON)
        #[arg(long)]
        export: Option<String>,
    },

    /// Menu management
    Menu {
        #[command(subcommand)]
        command: MenuCommand,
    },

    /// Restaurant applications
    Applications {
        #[command(subcommand)]
        command: ApplicationsCommand,
    },

    /// Reported videos
    Reported {
        #[command(subcommand)]
        command: ReportedCommand,
    },
}

#[derive(Subcommand)]
enum MenuCommand {
    /// List dishes, newest first
    List,

    /// Add a dish to your restaurant
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        price: f64,

        #[arg(long)]
        description: String,

        /// Image file (max 10MB)
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ApplicationsCommand {
    /// List applications, newest first
    List,

    /// Accept an application and create its restaurant
    Accept { id: String },

    /// Set an application's status (e.g. denied)
    SetStatus { id: String, status: String },
}

#[derive(Subcommand)]
enum ReportedCommand {
    /// List reported videos with their reports
    List,

    /// Delete a video and all its reports
    Delete { video_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = kusina_core::logging::init(&config.logging).ok();

    match args.command {
        Command::Login { email, password } => cmd_login(&config, &email, &password).await,
        Command::Logout => cmd_logout(),
        Command::Status => cmd_status(&config),
        Command::Sales {
            period,
            restaurant,
            no_trends,
            export,
        } => cmd_sales(&config, period, restaurant, !no_trends, export).await,
        Command::Engagement {
            period,
            no_trends,
            export,
        } => cmd_engagement(&config, period, !no_trends, export).await,
        Command::Menu { command } => cmd_menu(&config, command).await,
        Command::Applications { command } => cmd_applications(&config, command).await,
        Command::Reported { command } => cmd_reported(&config, command).await,
    }
}

/// The saved session, refreshed if its token expired.
async fn current_session(config: &Config) -> Result<Session> {
    let path = Config::session_path();
    let saved = Session::load(&path).context("failed to read saved session")?;
    let session = auth::require(saved.as_ref())?.clone();

    if !session.is_expired(Utc::now()) {
        return Ok(session);
    }

    let client = AuthClient::new(&config.store)?;
    let refreshed = client
        .ensure_fresh(session)
        .await
        .context("session expired; sign in again with `kusina login`")?;
    refreshed.save(&path)?;
    tracing::debug!(uid = %refreshed.uid, "Refreshed session token");
    Ok(refreshed)
}

fn open_store(config: &Config) -> Result<FirestoreStore> {
    config.store.validate()?;
    Ok(FirestoreStore::new(&config.store)?)
}

fn build_fetcher<'a>(
    config: &Config,
    store: &'a FirestoreStore,
    session: &'a Session,
) -> Fetcher<'a> {
    Fetcher::new(store, session)
        .with_batch_size(config.store.in_batch_size)
        .with_max_concurrent_batches(config.store.max_concurrent_batches)
}

fn open_storage(config: &Config) -> Result<SupabaseStorage> {
    Ok(SupabaseStorage::new(&config.storage)?)
}

fn parse_period(config: &Config, period: Option<String>) -> Result<ReportPeriod> {
    let offset = config.reports.offset()?;
    match period {
        Some(value) => {
            let today = Utc::now().with_timezone(&offset).date_naive();
            Ok(ReportPeriod::parse(&value, today)?)
        }
        None => Ok(ReportPeriod::current_month(offset)),
    }
}

async fn cmd_login(config: &Config, email: &str, password: &str) -> Result<()> {
    let client = AuthClient::new(&config.store)?;
    let store = open_store(config)?;

    let session = client.sign_in(email, password).await?;
    let profile = verify_business(&store, &session).await?;

    session.save(&Config::session_path())?;
    tracing::info!(uid = %session.uid, "Signed in");
    println!("Signed in as {}", profile.label());
    if let Some(restaurant_id) = &profile.restaurant_id {
        println!("Restaurant: {}", restaurant_id);
    }
    Ok(())
}

fn cmd_logout() -> Result<()> {
    Session::clear(&Config::session_path())?;
    tracing::info!("Signed out");
    println!("Signed out.");
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("kusina configuration");
    println!("====================");
    println!();
    println!("Config file:   {}", Config::config_path().display());
    println!(
        "Project:       {}",
        config.store.project_id.as_deref().unwrap_or("<not set>")
    );
    println!(
        "Storage URL:   {}",
        config.storage.url.as_deref().unwrap_or("<not set>")
    );
    println!("Batch size:    {}", config.store.in_batch_size);
    println!("Top N:         {}", config.reports.top_n);
    println!();

    match Session::load(&Config::session_path())? {
        Some(session) => {
            println!(
                "Signed in:     {} ({})",
                session.email.as_deref().unwrap_or(&session.uid),
                if session.is_expired(Utc::now()) {
                    "token expired"
                } else {
                    "active"
                }
            );
        }
        None => println!("Signed in:     no"),
    }
    Ok(())
}

async fn cmd_sales(
    config: &Config,
    period: Option<String>,
    restaurant: Option<String>,
    include_trends: bool,
    export: Option<String>,
) -> Result<()> {
    let export = Export::parse(export.as_deref())?;
    let session = current_session(config).await?;
    let store = open_store(config)?;
    let period = parse_period(config, period)?;
    let options = ReportOptions::from_config(&config.reports)?.with_trends(include_trends);

    let fetcher = build_fetcher(config, &store, &session);

    let report = load_sales(&fetcher, restaurant, period, &options)
        .await
        .context("failed to generate sales report")?;

    output::print_sales(&report, export, &config.reports.currency_symbol)
}

async fn load_sales(
    fetcher: &Fetcher<'_>,
    restaurant: Option<String>,
    period: ReportPeriod,
    options: &ReportOptions,
) -> kusina_core::Result<SalesReport> {
    let restaurant_id = match restaurant {
        Some(id) => id,
        None => resolve_restaurant(fetcher).await?,
    };
    generate_sales_report(fetcher, &restaurant_id, period, options).await
}

async fn cmd_engagement(
    config: &Config,
    period: Option<String>,
    include_trends: bool,
    export: Option<String>,
) -> Result<()> {
    let export = Export::parse(export.as_deref())?;
    let session = current_session(config).await?;
    let store = open_store(config)?;
    let period = parse_period(config, period)?;
    let options = ReportOptions::from_config(&config.reports)?.with_trends(include_trends);

    let fetcher = build_fetcher(config, &store, &session);
    let report = generate_engagement_report(&fetcher, period, &options)
        .await
        .context("failed to generate engagement report")?;

    output::print_engagement(&report, export)
}

async fn cmd_menu(config: &Config, command: MenuCommand) -> Result<()> {
    let session = current_session(config).await?;
    let store = open_store(config)?;
    let storage = open_storage(config)?;
    let fetcher = build_fetcher(config, &store, &session);

    match command {
        MenuCommand::List => {
            let entries = list_menu(&fetcher, &storage)
                .await
                .context("failed to load menu")?;
            output::print_menu(&entries, &config.reports.currency_symbol);
        }
        MenuCommand::Add {
            name,
            category,
            price,
            description,
            image,
        } => {
            let image = match image {
                Some(path) => Some(read_image(&path)?),
                None => None,
            };
            let dish = add_dish(
                &fetcher,
                &storage,
                NewDish {
                    name,
                    category,
                    price,
                    description,
                    image,
                },
            )
            .await
            .context("failed to add dish")?;
            println!("Added dish {} ({})", dish.name, dish.id);
        }
    }
    Ok(())
}

fn read_image(path: &Path) -> Result<DishImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(DishImage {
        content_type: content_type_for(&file_name).to_string(),
        file_name,
        bytes,
    })
}

async fn cmd_applications(config: &Config, command: ApplicationsCommand) -> Result<()> {
    let session = current_session(config).await?;
    let store = open_store(config)?;
    let fetcher = build_fetcher(config, &store, &session);

    match command {
        ApplicationsCommand::List => {
            let applications = list_applications(&fetcher)
                .await
                .context("failed to load applications")?;
            output::print_applications(&applications);
        }
        ApplicationsCommand::Accept { id } => {
            let storage = open_storage(config)?;
            let outcome = accept_application(&fetcher, &storage, &id)
                .await
                .context("failed to accept application")?;
            output::print_accept_outcome(&outcome);
        }
        ApplicationsCommand::SetStatus { id, status } => {
            let status = ApplicationStatus::parse(&status);
            set_application_status(&fetcher, &id, &status)
                .await
                .context("failed to update application")?;
            println!("Application {} is now {}", id, status.as_str());
        }
    }
    Ok(())
}

async fn cmd_reported(config: &Config, command: ReportedCommand) -> Result<()> {
    let session = current_session(config).await?;
    let store = open_store(config)?;
    let fetcher = build_fetcher(config, &store, &session);

    match command {
        ReportedCommand::List => {
            let videos = reported_videos(&fetcher)
                .await
                .context("failed to load reported videos")?;
            output::print_reported(&videos);
        }
        ReportedCommand::Delete { video_id } => {
            let removed = delete_video(&fetcher, &video_id)
                .await
                .context("failed to delete video")?;
            println!("Deleted video {} and {} reports", video_id, removed);
        }
    }
    Ok(())
}
