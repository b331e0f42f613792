//! Progress bar for file transfers.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use vimeo_mirror::ProgressObserver;

const BAR_TEMPLATE: &str =
    "{msg} [{bar:30}] {bytes}/{total_bytes} {bytes_per_sec} eta {eta}";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} {bytes_per_sec}";

/// Shows one bar per transfer on stderr.
#[derive(Default)]
pub(crate) struct TransferProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl TransferProgress {
    fn replace(&self, next: Option<ProgressBar>) {
        if let Ok(mut current) = self.bar.lock() {
            if let Some(previous) = current.take() {
                previous.finish_and_clear();
            }
            *current = next;
        }
    }
}

impl ProgressObserver for TransferProgress {
    fn started(&self, file_name: &str, total: Option<u64>, already: u64) {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(file_name.to_string());
        bar.set_position(already);
        self.replace(Some(bar));
    }

    fn advanced(&self, bytes: u64) {
        if let Ok(current) = self.bar.lock()
            && let Some(bar) = current.as_ref()
        {
            bar.set_position(bytes);
        }
    }

    fn finished(&self) {
        self.replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_progress_lifecycle_without_terminal() {
        let progress = TransferProgress::default();
        progress.advanced(10);
        progress.started("Clip 1.mp4", Some(100), 40);
        progress.advanced(70);
        progress.started("Clip 2.mp4", None, 0);
        progress.finished();
        progress.finished();
        assert!(progress.bar.lock().is_ok_and(|bar| bar.is_none()));
    }
}
