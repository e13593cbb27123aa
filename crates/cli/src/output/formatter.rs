//! Output formatter for human-readable and JSON output
//!
//! Reports render as a table with a one-line summary; in JSON mode the full
//! report is printed with its summary counts attached.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::Style;
use osn_core::{Outcome, Report, Summary};
use serde::Serialize;

use super::OutputConfig;

/// Color theme for styled output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Bucket names - bold
    pub name: Style,
    /// Byte counts - green
    pub size: Style,
    /// URLs - cyan + underline
    pub url: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: Style::new().bold(),
            size: Style::new().green(),
            url: Style::new().cyan().underlined(),
            success: Style::new().green(),
            error: Style::new().red(),
            warning: Style::new().yellow(),
        }
    }
}

impl Theme {
    /// Returns a theme with no styling (for no-color mode)
    pub fn plain() -> Self {
        Self {
            name: Style::new(),
            size: Style::new(),
            url: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warning: Style::new(),
        }
    }
}

/// JSON shape of a printed report
#[derive(Serialize)]
struct ReportOutput<'a> {
    #[serde(flatten)]
    report: &'a Report,
    summary: Summary,
}

/// Formatter for CLI output
///
/// When JSON mode is enabled, all output is strict JSON without colors or progress.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
    theme: Theme,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        let theme = if config.no_color || config.json {
            Theme::plain()
        } else {
            Theme::default()
        };
        Self { config, theme }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Progress bars only make sense for a human at a terminal
    pub fn progress_enabled(&self) -> bool {
        !self.config.quiet && !self.config.json
    }

    pub fn style_name(&self, text: &str) -> String {
        self.theme.name.apply_to(text).to_string()
    }

    pub fn style_size(&self, text: &str) -> String {
        self.theme.size.apply_to(text).to_string()
    }

    pub fn style_url(&self, text: &str) -> String {
        self.theme.url.apply_to(text).to_string()
    }

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let checkmark = self.theme.success.apply_to("✓");
        println!("{checkmark} {message}");
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({
                "error": message
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            let cross = self.theme.error.apply_to("✗");
            eprintln!("{cross} {message}");
        }
    }

    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        let warn_icon = self.theme.warning.apply_to("⚠");
        eprintln!("{warn_icon} {message}");
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }

    /// Print a finished report
    ///
    /// JSON mode always prints, even with `--quiet`, so scripts get a result.
    pub fn report(&self, report: &Report) {
        if self.config.json {
            self.json(&ReportOutput {
                report,
                summary: report.summary(),
            });
            return;
        }
        if self.config.quiet {
            return;
        }

        let summary = report.summary();
        let target = match &report.destination {
            Some(dest) => format!(
                "{} -> {}",
                self.style_name(&report.bucket),
                self.style_name(dest)
            ),
            None => self.style_name(&report.bucket),
        };
        let size = humansize::format_size(report.bytes_transferred, humansize::BINARY);

        if !report.is_empty() {
            println!("{}", render_report(report, self.colors_enabled()));
        }
        println!(
            "{} {target}: {} item(s), {} succeeded, {} skipped, {} failed ({})",
            report.operation,
            summary.total,
            summary.success,
            summary.skipped,
            summary.failed(),
            self.style_size(&size),
        );
        if report.cancelled {
            self.warning("Interrupted; items after the stop point were not attempted");
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

/// Render report items as a table, one row per item in key order
pub fn render_report(report: &Report, colors: bool) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Item", "Outcome"]);
    if !colors {
        table.force_no_tty();
    }

    for (item, outcome) in report.iter() {
        let color = match outcome {
            Outcome::Success => Color::Green,
            Outcome::Skipped(_) => Color::DarkGrey,
            Outcome::Missing => Color::Yellow,
            Outcome::ClientError(_) | Outcome::Error(_) => Color::Red,
        };
        table.add_row(vec![
            Cell::new(item),
            Cell::new(outcome.to_string()).fg(color),
        ]);
    }

    table.to_string()
}
