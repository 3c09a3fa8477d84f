//! # Console Output
//!
//! Color and emoji decisions for everything ctt prints, plus the progress bar
//! shown while temporal trials run.
//!
//! `--color=always|never|auto` wins over the environment. In `auto` mode the
//! usual conventions are honoured: `NO_COLOR` (https://no-color.org/),
//! `CLICOLOR=0`, `CLICOLOR_FORCE=1` and `TERM=dumb`, falling back to whether
//! stdout is a color-capable terminal.

use std::env;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag value against the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence alone disables colors, even when empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// Progress bar over `total` trials.
    ///
    /// Hidden when colors are off, so piped or CI output stays line-oriented.
    pub fn trial_progress(&self, total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        if !self.use_color {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return bar;
        }
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
