use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use citename_core::config_file::load_config;
use citename_core::{BatchRunner, Config, ProgressEvent, Resolver};
use citename_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// Rename academic PDFs to "Author - Year - Title.pdf" using DOI, arXiv and
/// ISBN lookups
#[derive(Parser, Debug)]
#[command(name = "citename", version, about, long_about = None)]
struct Cli {
    /// Directory containing the PDFs to rename
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Show what would be renamed without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Write a log file
    #[arg(long)]
    log: bool,

    /// Path of the log file (implies --log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Replacement for ':' in filenames
    #[arg(long)]
    colon_replace: Option<String>,

    /// Disable CrossRef lookups
    #[arg(long)]
    no_crossref: bool,

    /// Disable arXiv lookups and arXiv ID detection
    #[arg(long)]
    no_arxiv: bool,

    /// Disable Open Library lookups
    #[arg(long)]
    no_open_library: bool,

    /// Disable Semantic Scholar lookups
    #[arg(long)]
    no_semantic_scholar: bool,

    /// Do not copy files to the backup folder before renaming
    #[arg(long)]
    no_backup: bool,

    /// Path to a TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Flags take precedence over every settings file.
    fn apply_to(&self, config: &mut Config) {
        if self.dry_run {
            config.dry_run = true;
        }
        if self.log {
            config.logging_enabled = true;
        }
        if let Some(ref path) = self.log_file {
            config.logging_enabled = true;
            config.log_file = path.clone();
        }
        if let Some(ref s) = self.colon_replace {
            config.colon_replacement = s.clone();
        }
        if self.no_crossref {
            config.use_crossref = false;
        }
        if self.no_arxiv {
            config.use_arxiv = false;
        }
        if self.no_open_library {
            config.use_open_library = false;
        }
        if self.no_semantic_scholar {
            config.use_semantic_scholar = false;
        }
        if self.no_backup {
            config.create_backup = false;
        }
    }
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let color = ColorMode(!cli.no_color);

    // Resolve configuration: flags > --config > ./.citename.toml > platform file > defaults
    let loaded = load_config(cli.config.as_deref());
    let mut config = loaded.config;
    cli.apply_to(&mut config);
    if config.s2_api_key.is_none() {
        config.s2_api_key = env_key("S2_API_KEY");
    }
    if config.crossref_mailto.is_none() {
        config.crossref_mailto = env_key("CROSSREF_MAILTO");
    }

    let _log_guard = init_tracing(&config)?;

    let mut stderr = std::io::stderr();
    for warning in &loaded.warnings {
        output::print_config_warning(&mut stderr, warning, color)?;
    }
    for path in &loaded.applied {
        tracing::info!(path = %path.display(), "applied settings file");
    }

    if !cli.dir.is_dir() {
        anyhow::bail!("Directory not found: {}", cli.dir.display());
    }

    let mut stdout = std::io::stdout();
    output::print_header(&mut stdout, &cli.dir, &config, color)?;

    let resolver = Resolver::from_config(&config);
    let runner = BatchRunner::new(config.clone(), Arc::new(MupdfBackend::new()), resolver);

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let bar = progress_bar()?;
    let progress = |event: ProgressEvent| match event {
        ProgressEvent::Started { total } => bar.set_length(total as u64),
        ProgressEvent::FileStarted { name, .. } => bar.set_message(name),
        // Per-file lines are listed once, in the summary
        ProgressEvent::FileFinished { .. } => bar.inc(1),
    };

    let report = runner
        .run(&cli.dir, progress, &cancel)
        .await
        .with_context(|| format!("Failed to read directory {}", cli.dir.display()))?;
    bar.finish_and_clear();

    output::print_summary(&mut stdout, &report, &cli.dir, &config, color)?;
    stdout.flush()?;

    Ok(())
}

fn progress_bar() -> anyhow::Result<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(bar)
}

/// Install the tracing subscriber.
///
/// With logging enabled, `info` and above go to the log file and warnings
/// also go to stderr. Otherwise only `RUST_LOG` produces output.
fn init_tracing(
    config: &Config,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    if !config.logging_enabled {
        if std::env::var_os("RUST_LOG").is_some() {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
        }
        return Ok(None);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "citename",
            "--dry-run",
            "--no-arxiv",
            "--no-backup",
            "--colon-replace",
            "_",
            "--log-file",
            "run.log",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert!(config.dry_run);
        assert!(!config.use_arxiv);
        assert!(config.use_crossref);
        assert!(!config.create_backup);
        assert_eq!(config.colon_replacement, "_");
        assert!(config.logging_enabled);
        assert_eq!(config.log_file, PathBuf::from("run.log"));
    }

    #[test]
    fn absent_flags_leave_config_alone() {
        let cli = Cli::parse_from(["citename", "-d", "papers"]);
        let mut config = Config {
            create_backup: false,
            colon_replacement: "_".into(),
            ..Default::default()
        };
        cli.apply_to(&mut config);
        assert_eq!(cli.dir, PathBuf::from("papers"));
        assert!(!config.create_backup);
        assert_eq!(config.colon_replacement, "_");
        assert!(!config.dry_run);
    }
}
