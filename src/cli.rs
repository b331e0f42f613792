//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use vimeo_mirror::{
    Browser, ConfigError, Credentials, ItemOrder, LinkKind, RunConfig, SettingsTargets,
};

/// Mirror a video site account, album, channel, group or single video.
///
/// Every run fetches what is missing or incomplete, leaves complete files
/// alone and rebuilds the folder views.
#[derive(Parser, Debug)]
#[command(name = "vimeo-mirror")]
#[command(author, version, about)]
pub struct Args {
    /// Starting pages: URLs or bare video ids
    #[arg(value_name = "LOCATOR")]
    pub locators: Vec<String>,

    /// Log in first, as email:password
    #[arg(short = 'l', long, value_name = "EMAIL:PASSWORD")]
    pub login: Option<String>,

    /// Mirror directory
    #[arg(short = 't', long = "target", value_name = "DIR", default_value = ".")]
    pub target: PathBuf,

    /// Take at most N items from each listing
    #[arg(short = 'm', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_items: Option<u64>,

    /// Attempts per transfer and per page load (1-100)
    #[arg(short = 'r', long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub retries: u32,

    /// Abort a transfer after this many seconds without progress
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub stall_timeout: u64,

    /// Wait this many seconds for page elements (0 probes immediately)
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub page_timeout: u64,

    /// Do not create folder directories
    #[arg(short = 'f', long)]
    pub no_folders: bool,

    /// Do not probe remote sizes before transferring
    #[arg(short = 's', long)]
    pub no_sizes: bool,

    /// Use hard links instead of symbolic links in folders
    #[arg(long)]
    pub hard_links: bool,

    /// Verify fetched files with ffprobe
    #[arg(long)]
    pub verify: bool,

    /// Also verify files that were already complete
    #[arg(long)]
    pub verify_existing: bool,

    /// ffprobe executable
    #[arg(long, value_name = "PATH", default_value = "ffprobe")]
    pub ffprobe: String,

    /// Report local files whose video was not found by the crawl
    #[arg(long)]
    pub detect_obsolete: bool,

    /// Resolve renditions and sizes but transfer nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Order in which videos are processed
    #[arg(long, value_enum, default_value_t = OrderArg::Discovery)]
    pub order: OrderArg,

    /// Preferred rendition label, best first (repeatable)
    #[arg(long = "prefer", value_name = "LABEL")]
    pub prefer: Vec<String>,

    /// WebDriver server URL
    #[arg(short = 'w', long, default_value = "http://localhost:4444")]
    pub webdriver: String,

    /// Browser driven by the WebDriver server
    #[arg(short = 'b', long, default_value_t = Browser::Firefox)]
    pub browser: Browser,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Spoken language to set on editable videos
    #[arg(long)]
    pub language: Option<String>,

    /// Embed preset to apply to editable videos
    #[arg(long)]
    pub embed_preset: Option<String>,

    /// Default quality tier to set on editable videos
    #[arg(long)]
    pub quality_tier: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// `--order` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    Discovery,
    Reverse,
    NewestFirst,
}

impl From<OrderArg> for ItemOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Discovery => Self::Discovery,
            OrderArg::Reverse => Self::Reverse,
            OrderArg::NewestFirst => Self::NewestFirst,
        }
    }
}

impl Args {
    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Builds the validated run configuration.
    pub fn into_run_config(self) -> Result<RunConfig, ConfigError> {
        let credentials = self
            .login
            .as_deref()
            .map(str::parse::<Credentials>)
            .transpose()?;
        let defaults = RunConfig::default();
        let rendition_preferences = if self.prefer.is_empty() {
            defaults.rendition_preferences
        } else {
            self.prefer
        };
        let config = RunConfig {
            roots: self.locators,
            credentials,
            target_dir: self.target,
            max_items: self
                .max_items
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            retry_count: self.retries,
            stall_timeout: Duration::from_secs(self.stall_timeout),
            page_timeout: Duration::from_secs(self.page_timeout),
            create_folders: !self.no_folders,
            probe_sizes: !self.no_sizes,
            link_kind: if self.hard_links {
                LinkKind::Hard
            } else {
                LinkKind::Symbolic
            },
            verify: self.verify,
            verify_existing: self.verify_existing,
            detect_obsolete: self.detect_obsolete,
            dry_run: self.dry_run,
            order: self.order.into(),
            rendition_preferences,
            settings: SettingsTargets {
                language: self.language,
                embed_preset: self.embed_preset,
                quality_tier: self.quality_tier,
            },
        };
        config.validate()?;
        Ok(config)
    }
}
