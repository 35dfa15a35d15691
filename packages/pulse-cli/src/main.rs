//! Documentation module extraction CLI.
//!
//! Reads URLs (one per line) from a file or stdin and prints the extracted
//! modules as a JSON array on stdout. Progress and the run summary go to
//! stderr. Ctrl-C stops the run and still prints what finished.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use module_extraction::fetch::locate_chromium;
use module_extraction::{ExtractionConfig, ExtractionReport, Orchestrator, Phase, ProgressEvent, UrlValidator};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Extract documentation modules from a list of URLs")]
struct Cli {
    /// File with one URL per line (stdin when omitted)
    input: Option<PathBuf>,

    /// Number of URLs processed concurrently
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Per-attempt timeout for HTTP strategies, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Leave headless rendering out of the fetch ladder
    #[arg(long)]
    no_render: bool,

    /// Chromium or Chrome binary for headless rendering (searched on PATH
    /// when omitted)
    #[arg(long, value_name = "PATH")]
    chromium: Option<PathBuf>,

    /// Host exempt from internal-address screening (repeatable)
    #[arg(long = "allow-host", value_name = "HOST")]
    allow_hosts: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Also print skip records to stderr
    #[arg(long)]
    skips: bool,
}

impl Cli {
    /// Browser for the rendering strategy; none when rendering is off.
    fn browser(&self) -> Option<PathBuf> {
        if self.no_render {
            None
        } else {
            locate_chromium(self.chromium.clone())
        }
    }

    fn url_validator(&self) -> UrlValidator {
        self.allow_hosts
            .iter()
            .fold(UrlValidator::new(), |validator, host| validator.allow_host(host.as_str()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warn,module_extraction={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let urls = read_urls(cli.input.as_ref())?;
    if urls.is_empty() {
        eprintln!("{}", "No URLs given".yellow());
        println!("[]");
        return Ok(());
    }
    let browser = cli.browser();
    if !cli.no_render && browser.is_none() {
        tracing::warn!("No Chromium binary found, rendered attempts will be skipped");
    }
    tracing::info!(
        urls = urls.len(),
        workers = cli.workers,
        browser = ?browser,
        "Starting extraction"
    );

    let run_config = config.apply(
        ExtractionConfig::default()
            .with_workers(cli.workers)
            .with_attempt_timeout(Duration::from_secs(cli.timeout_secs))
            .with_rendering(!cli.no_render),
    );
    let orchestrator = Orchestrator::standard(
        run_config,
        Some(config.credentials.clone()),
        config.firecrawl_api_key.clone(),
        browser,
    )
    .context("Failed to build extraction pipeline")?
    .with_url_validator(cli.url_validator());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Cancelling, finishing with completed URLs...".yellow());
            on_ctrl_c.cancel();
        }
    });

    let total = urls.len();
    let progress = move |event: &ProgressEvent| print_progress(event, total);

    let report = orchestrator.run(&urls, &cancel, &progress).await;

    let output = report.to_output_json();
    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);

    if cli.skips {
        for record in report.skip_records() {
            eprintln!("{}", record);
        }
    }
    print_summary(&report);

    Ok(())
}

/// URLs from the input, one per line, blank lines dropped.
fn read_urls(input: Option<&PathBuf>) -> Result<Vec<String>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read URLs from stdin")?;
            buf
        }
    };
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn print_progress(event: &ProgressEvent, total: usize) {
    let label = format!("[{}/{}]", event.url_index + 1, total);
    let phase = match event.phase {
        Phase::Complete => event.phase.as_str().green(),
        Phase::Skipped => event.phase.as_str().yellow(),
        _ => event.phase.as_str().cyan(),
    };
    let eta = event
        .estimated_remaining
        .map(|d| format!(" (~{}s left)", d.as_secs()))
        .unwrap_or_default();
    eprintln!("{} {} {}{}", label.dimmed(), phase, event.url, eta.dimmed());
}

fn print_summary(report: &ExtractionReport) {
    eprintln!();
    let title = if report.cancelled {
        "Run cancelled".yellow().bold()
    } else {
        "Run complete".green().bold()
    };
    eprintln!("{}", title);
    eprintln!("  processed: {}", report.len());
    eprintln!("  inferred:  {}", report.inferred());
    eprintln!("  fallback:  {}", report.fallback());
    eprintln!("  skipped:   {}", report.skipped());
    eprintln!("  modules:   {}", report.modules().len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_browser_passed_through() {
        let cli = Cli::parse_from(["pulse", "--chromium", "/opt/chrome/chrome", "urls.txt"]);
        assert_eq!(cli.browser(), Some(PathBuf::from("/opt/chrome/chrome")));
    }

    #[test]
    fn test_no_render_drops_browser() {
        let cli = Cli::parse_from(["pulse", "--no-render", "--chromium", "/opt/chrome/chrome"]);
        assert_eq!(cli.browser(), None);
    }

    #[test]
    fn test_browser_discovered_on_path() {
        let cli = Cli::parse_from(["pulse"]);
        assert_eq!(cli.browser(), module_extraction::fetch::find_chromium());
    }

    #[test]
    fn test_allow_host_reaches_screening() {
        let cli = Cli::parse_from(["pulse", "--allow-host", "127.0.0.1", "--allow-host", "docs.internal"]);
        let validator = cli.url_validator();
        assert!(validator.screen("http://127.0.0.1:3000/guide").is_ok());
        assert!(Cli::parse_from(["pulse"]).url_validator().screen("http://127.0.0.1:3000/guide").is_err());
    }
}
