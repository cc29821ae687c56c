use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use listing_desk::domain::estimate::estimate;
use listing_desk::view::{SubmitControl, Thumbnail};
use listing_desk::{
    DataUrlDecoder, FileStore, FormField, ImageFile, ListingConfig, ListingForm, ListingPage,
    ListingView, Notice, NoticeKind, ReqwestHttpClient, StatField, SubmissionOutcome,
};

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "listing-desk", about = "List a game account on the marketplace", version)]
struct Cli {
    /// Listings API base URL ($LISTING_DESK_API_BASE)
    #[arg(long, env = "LISTING_DESK_API_BASE")]
    api_base: Option<String>,

    /// JSON file holding the stored `token` and `user` ($LISTING_DESK_SESSION)
    #[arg(long, env = "LISTING_DESK_SESSION", default_value = "session.json")]
    session: PathBuf,

    /// Optional JSON config file overriding the defaults
    #[arg(long, env = "LISTING_DESK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the price estimate for a set of stats
    Estimate {
        /// Stat as name=value, e.g. `level=80` (repeatable)
        #[arg(long = "stat", value_name = "NAME=VALUE")]
        stats: Vec<String>,
    },
    /// Submit a listing
    Submit {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        highlights: String,
        #[arg(long, default_value = "")]
        rank: String,
        /// Stat as name=value, e.g. `mythic_count=3` (repeatable)
        #[arg(long = "stat", value_name = "NAME=VALUE")]
        stats: Vec<String>,
        /// Image file to attach (repeatable)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
        /// Run the console test fallback when the server offers it
        #[arg(long)]
        console_test: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LISTING_DESK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ListingConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ListingConfig::default(),
    };
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base;
    }

    match cli.command {
        Commands::Estimate { stats } => cmd_estimate(&stats),
        Commands::Submit {
            uid,
            title,
            highlights,
            rank,
            stats,
            images,
            console_test,
        } => {
            let mut form = ListingForm::new()
                .with(FormField::Uid, uid)
                .with(FormField::Title, title)
                .with(FormField::Highlights, highlights)
                .with(FormField::Rank, rank);
            for raw in &stats {
                let (stat, value) = parse_stat(raw)?;
                form.set(FormField::Stat(stat), value);
            }
            cmd_submit(config, &cli.session, form, images, console_test).await
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_estimate(stats: &[String]) -> Result<()> {
    let mut form = ListingForm::new();
    for raw in stats {
        let (stat, value) = parse_stat(raw)?;
        form.set(FormField::Stat(stat), value);
    }
    println!("{}", estimate(&form));
    Ok(())
}

async fn cmd_submit(
    config: ListingConfig,
    session_path: &Path,
    form: ListingForm,
    images: Vec<PathBuf>,
    console_test: bool,
) -> Result<()> {
    let view = Arc::new(TerminalView);
    let mut page = ListingPage::init(
        &FileStore::new(session_path),
        config,
        Arc::new(ReqwestHttpClient::new()),
        view,
        Arc::new(DataUrlDecoder),
    )
    .context("Log in first: no usable session")?;

    for field in FormField::all() {
        page.set_field(field, form.get(field));
    }
    if !images.is_empty() {
        page.add_files(images.iter().map(ImageFile::from_path).collect())
            .await;
    }

    let outcome = page.submit().await;

    if let Some(redirect) = page.take_redirect() {
        redirect.await.context("Redirect task failed")?;
    }

    if console_test && page.console_helper().is_some() {
        if page.run_console_test().await == Some(true) {
            return Ok(());
        }
        bail!("Console test submission failed");
    }

    match outcome {
        SubmissionOutcome::Succeeded(_) => Ok(()),
        other => bail!("Listing not created ({})", other.label()),
    }
}

fn parse_stat(raw: &str) -> Result<(StatField, String)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("Expected NAME=VALUE, got '{raw}'");
    };
    let stat = StatField::from_name(name.trim())
        .with_context(|| format!("Unknown stat '{}'", name.trim()))?;
    Ok((stat, value.trim().to_string()))
}

// ── Terminal view ─────────────────────────────────────────────────────────────

struct TerminalView;

impl ListingView for TerminalView {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => println!("✓ {}", notice.text),
            NoticeKind::Error => eprintln!("✗ {}", notice.text),
        }
    }

    fn set_field_invalid(&self, field: FormField, invalid: bool) {
        if invalid {
            eprintln!("  invalid: --{field}");
        }
    }

    fn set_price(&self, price: Option<i64>) {
        if let Some(price) = price {
            println!("Estimated price: {price}");
        }
    }

    fn set_loading(&self, visible: bool) {
        if visible {
            println!("Submitting...");
        }
    }

    fn set_submit_control(&self, _control: SubmitControl) {}

    fn reset_form(&self) {}

    fn render_gallery(&self, thumbnails: &[Thumbnail]) {
        tracing::debug!(images = thumbnails.len(), "Gallery updated");
    }

    fn open_viewer(&self, _src: &str) {}

    fn show_console_helper(&self) {
        println!("The server hit a foreign key error; rerun with --console-test to use the bypass.");
    }

    fn set_console_helper_enabled(&self, _enabled: bool) {}

    fn remove_console_helper(&self) {}

    fn navigate(&self, path: &str) {
        eprintln!("Please log in again ({path})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat() {
        let (stat, value) = parse_stat("mythic_count = 3").unwrap();
        assert_eq!(stat, StatField::MythicCount);
        assert_eq!(value, "3");
        assert!(parse_stat("level").is_err());
        assert!(parse_stat("wins=4").is_err());
    }

    #[test]
    fn test_cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "listing-desk",
            "submit",
            "--uid",
            "ABC123",
            "--title",
            "Conqueror Account",
            "--stat",
            "level=80",
            "--image",
            "a.png",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit { uid, stats, images, console_test, .. } => {
                assert_eq!(uid, "ABC123");
                assert_eq!(stats, vec!["level=80".to_string()]);
                assert_eq!(images, vec![PathBuf::from("a.png")]);
                assert!(!console_test);
            }
            Commands::Estimate { .. } => panic!("expected submit"),
        }
    }
}
