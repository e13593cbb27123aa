//! Per-item progress bar driven by the sync engine's observer

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use osn_core::{Outcome, ProgressObserver};

use super::Formatter;

/// Progress display for one sync run
///
/// Hidden in JSON and quiet mode. Draws to stderr.
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Bar with a known item count, or a counting spinner when the count is
    /// only known after listing
    pub fn new(formatter: &Formatter, total: Option<u64>, message: &str) -> Self {
        if !formatter.progress_enabled() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} {pos} item(s) {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// Observer that advances the bar once per finished item
    pub fn observer(&self) -> ProgressObserver {
        let bar = self.bar.clone();
        Arc::new(move |item: &str, outcome: &Outcome| {
            if outcome.is_failure() {
                bar.println(format!("✗ {item}: {outcome}"));
            }
            bar.inc(1);
        })
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
