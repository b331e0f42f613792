//! Shared fakes for integration tests.
//!
//! Each test binary uses a different subset.
#![allow(dead_code)]

pub mod fake_site;
pub mod fake_transfer;
pub mod socket_guard;

use std::path::Path;
use std::time::Duration;

use vimeo_mirror::RunConfig;

/// Configuration for a run into `target` with fast retries and timeouts.
pub fn quick_config(target: &Path, roots: &[&str]) -> RunConfig {
    RunConfig {
        roots: roots.iter().map(|r| (*r).to_string()).collect(),
        target_dir: target.to_path_buf(),
        retry_count: 3,
        stall_timeout: Duration::from_millis(200),
        page_timeout: Duration::ZERO,
        ..RunConfig::default()
    }
}
