//! CLI command implementations
//!
//! Commands validate everything they can before any network call:
//! - a malformed CID never reaches the commitment service
//! - an incomplete option set never builds a client

pub mod add_object;
pub mod config;
pub mod verify_object;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while waiting on the commitment service
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
