//! Stall detection and interruption for in-flight transfers.
//!
//! [`fetch_guarded`] races a [`Transfer::fetch`] future against a ticker. The
//! fetch is dropped, which closes the connection, as soon as either no new
//! bytes arrived within the stall timeout or the shared interrupt flag is set.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

use super::{FetchOptions, Transfer, TransferError};

const MAX_TICK: Duration = Duration::from_secs(1);
const MIN_TICK: Duration = Duration::from_millis(10);

/// Last observed progress of a transfer.
#[derive(Debug)]
struct ProgressClock {
    state: Mutex<(u64, Instant)>,
}

impl ProgressClock {
    fn new(bytes: u64) -> Self {
        Self {
            state: Mutex::new((bytes, Instant::now())),
        }
    }

    /// Any change counts as progress: a server ignoring the range restarts
    /// the count from zero.
    fn record(&self, bytes: u64) {
        if let Ok(mut state) = self.state.lock()
            && bytes != state.0
        {
            *state = (bytes, Instant::now());
        }
    }

    fn snapshot(&self) -> (u64, Duration) {
        self.state
            .lock()
            .map(|state| (state.0, state.1.elapsed()))
            .unwrap_or((0, Duration::ZERO))
    }
}

fn tick_for(stall_timeout: Duration) -> Duration {
    (stall_timeout / 4).clamp(MIN_TICK, MAX_TICK)
}

/// Runs `transfer.fetch` under a stall watchdog and an interrupt flag.
///
/// # Errors
///
/// Returns the transfer's own error, [`TransferError::Stalled`] when no new
/// bytes arrived for `stall_timeout`, or [`TransferError::Interrupted`] when
/// `interrupted` becomes true.
pub async fn fetch_guarded(
    transfer: &dyn Transfer,
    url: &str,
    target: &Path,
    options: &FetchOptions,
    stall_timeout: Duration,
    interrupted: &AtomicBool,
) -> Result<(), TransferError> {
    if interrupted.load(Ordering::SeqCst) {
        return Err(TransferError::interrupted(url));
    }

    let clock = Arc::new(ProgressClock::new(options.resume_from));
    let recorder = Arc::clone(&clock);
    let forward = options.on_progress.clone();
    let guarded = FetchOptions {
        on_progress: Some(Arc::new(move |bytes| {
            recorder.record(bytes);
            if let Some(forward) = &forward {
                forward(bytes);
            }
        })),
        ..options.clone()
    };

    let fetch = transfer.fetch(url, target, &guarded);
    tokio::pin!(fetch);

    let mut ticker = tokio::time::interval(tick_for(stall_timeout));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            result = &mut fetch => return result,
            _ = ticker.tick() => {
                if interrupted.load(Ordering::SeqCst) {
                    warn!(url, "aborting transfer on interrupt");
                    return Err(TransferError::interrupted(url));
                }
                let (bytes, idle) = clock.snapshot();
                if idle >= stall_timeout {
                    warn!(url, bytes, idle_secs = idle.as_secs(), "transfer stalled");
                    return Err(TransferError::stalled(url, stall_timeout, bytes));
                }
            }
        }
    }
}
