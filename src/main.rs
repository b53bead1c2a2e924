use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use seoscore::report::{render_error, render_text};
use seoscore::{Report, SeoTracker, Strategy, TrackerConfig, DEFAULT_TIMEOUT_MS};

/// Score a web page for SEO, accessibility, performance and best practices.
#[derive(Debug, Parser)]
#[command(name = "seoscore", version, about)]
struct Args {
    /// Page to score
    url: Option<String>,

    /// Score a local HTML file instead of fetching (URL then only sets the origin)
    #[arg(long, conflicts_with = "watch")]
    file: Option<PathBuf>,

    /// PageSpeed Insights API key; without one only local analysis runs
    #[arg(long, env = "SEOSCORE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the PageSpeed Insights endpoint
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long, value_enum, default_value_t = Strategy::Mobile)]
    strategy: Strategy,

    /// Console error sampling window
    #[arg(long, default_value_t = 1000)]
    sample_ms: u64,

    /// Per-request HTTP timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Do not request sub-resources during the sampling window
    #[arg(long)]
    no_probe: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Keep running and refresh periodically
    #[arg(long)]
    watch: bool,

    /// Refresh interval for --watch
    #[arg(long, default_value_t = 300)]
    interval_secs: u64,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<TrackerConfig> {
        if self.watch && self.file.is_some() {
            bail!("--watch cannot be combined with --file");
        }
        let url = match (&self.url, &self.file) {
            (Some(url), _) => url.clone(),
            (None, Some(path)) => {
                let abs = std::fs::canonicalize(path)
                    .with_context(|| format!("cannot resolve {}", path.display()))?;
                url::Url::from_file_path(&abs)
                    .map_err(|_| anyhow::anyhow!("cannot build a file URL for {}", abs.display()))?
                    .to_string()
            }
            (None, None) => bail!("a URL or --file is required"),
        };

        let mut config = TrackerConfig {
            url,
            api_key: self.api_key.clone(),
            strategy: self.strategy,
            sample_window_ms: self.sample_ms,
            timeout_ms: self.timeout_ms,
            probe_resources: !self.no_probe,
            auto_refresh: self.watch,
            refresh_interval_ms: self.interval_secs.saturating_mul(1000),
            ..Default::default()
        };
        if let Some(endpoint) = &self.endpoint {
            config.api_endpoint = endpoint.clone();
        }
        Ok(config)
    }
}

fn print_report(report: &Report, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("failed to serialize report: {}", e),
        }
    } else {
        println!("{}", render_text(report));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let config = args.config()?;
    let tracker = SeoTracker::new(config).context("failed to start tracker")?;

    let first = match &args.file {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let url = tracker.config().url.clone();
            tracker.analyze_html(&html, &url).await
        }
        None => tracker.refresh().await,
    };

    match &first {
        Ok(report) => print_report(report, args.json),
        Err(e) if args.watch => eprint!("{}", render_error(&e.to_string())),
        Err(_) => {}
    }

    if !args.watch {
        first?;
        return Ok(());
    }

    let json = args.json;
    let refresher = tracker.spawn_auto_refresh(move |outcome| match outcome {
        Ok(report) => print_report(&report, json),
        Err(e) => eprint!("{}", render_error(&e.to_string())),
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    if let Some(handle) = refresher {
        handle.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_and_file_are_rejected_together() {
        assert!(Args::try_parse_from(["seoscore", "--file", "page.html", "--watch"]).is_err());

        let args = Args {
            watch: true,
            ..Args::parse_from(["seoscore", "--file", "page.html"])
        };
        assert!(args.config().is_err());
    }

    #[test]
    fn flags_map_onto_config() {
        let args = Args::parse_from([
            "seoscore",
            "https://example.com/",
            "--strategy",
            "desktop",
            "--no-probe",
            "--watch",
            "--interval-secs",
            "60",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.strategy, Strategy::Desktop);
        assert!(!config.probe_resources);
        assert!(config.auto_refresh);
        assert_eq!(config.refresh_interval_ms, 60_000);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
