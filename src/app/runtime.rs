use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use vimeo_mirror::page::PageProvider;
use vimeo_mirror::{
    Collaborators, ContentVerifier, FfprobeVerifier, HttpTransfer, ProgressObserver,
    WebDriverSession,
};

use crate::ProcessExit;
use crate::app::{exit_handler, progress_manager::TransferProgress, terminal};
use crate::cli::Args;

pub(crate) async fn run_mirror() -> Result<ProcessExit> {
    // Parse before tracing so --help works without logs
    let args = Args::parse();

    let dumb_terminal = terminal::is_dumb_terminal();
    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        dumb_terminal,
    );
    let default_level = args.default_log_level();
    let use_progress_bar =
        terminal::should_use_progress_bar(io::stderr().is_terminal(), args.quiet, dumb_terminal);
    let webdriver = args.webdriver.clone();
    let browser = args.browser;
    let headless = !args.headed;
    let ffprobe = args.ffprobe.clone();

    let config = args.into_run_config()?;

    std::fs::create_dir_all(&config.target_dir).with_context(|| {
        format!(
            "cannot create target directory {}",
            config.target_dir.display()
        )
    })?;
    let _log_guard = terminal::init_tracing(default_level, no_color, Some(&config.target_dir));

    debug!(?config, "run configuration");
    info!(target_dir = %config.target_dir.display(), "vimeo-mirror starting");

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let session = WebDriverSession::start(&webdriver, browser, headless, config.page_timeout)
        .await
        .context("cannot start the browser session")?;
    let transfer = HttpTransfer::new().context("cannot build the HTTP client")?;
    let verifier = config
        .wants_verifier()
        .then(|| FfprobeVerifier::new(ffprobe));
    let observer: Option<Arc<dyn ProgressObserver>> = if use_progress_bar {
        Some(Arc::new(TransferProgress::default()))
    } else {
        None
    };

    let collaborators = Collaborators {
        page: &session,
        transfer: &transfer,
        verifier: verifier.as_ref().map(|v| v as &dyn ContentVerifier),
    };
    let outcome =
        vimeo_mirror::run(&config, collaborators, observer, Arc::clone(&interrupted)).await;

    if let Err(error) = session.close().await {
        warn!(error = %error, "could not close the browser session");
    }
    let summary = outcome?;

    if !summary.report.incidents().is_empty() {
        eprint!("{}", summary.report.render_incidents());
    }
    println!("{}", summary.report.summary_line());

    if summary.interrupted || interrupted.load(Ordering::SeqCst) {
        warn!("Interrupted. Run again to resume.");
    }
    Ok(exit_handler::exit_for_summary(&summary))
}
