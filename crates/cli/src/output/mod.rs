//! Output formatting
//!
//! Human-readable tables and strict JSON share one entry point so every
//! command honors `--json`, `--quiet` and `--no-color` the same way.

mod formatter;
mod progress;

pub use formatter::{Formatter, render_report};
pub use progress::Progress;

/// Output settings taken from the global flags
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit JSON instead of tables
    pub json: bool,
    /// Disable colors
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}
