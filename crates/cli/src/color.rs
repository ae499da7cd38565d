// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Color detection and terminal styling.
//!
//! Detection order:
//! 1. NO_COLOR env var → no color
//! 2. COLOR env var → use color
//! 3. default:
//!    - If not stdout.is_tty() → no color
//!    - If CI env var set → no color
//!    - Else → use color

use std::io::IsTerminal;

use termcolor::ColorChoice;

use crate::cli::ColorArg;
use crate::env::{is_set, names};

/// Resolve color choice from environment variables.
///
/// Priority: NO_COLOR > COLOR > auto-detect
///
/// Per [no-color.org](https://no-color.org/), `NO_COLOR` when set to any value
/// (including empty string) disables color.
pub fn resolve_color() -> ColorChoice {
    if is_set(names::NO_COLOR) {
        return ColorChoice::Never;
    }
    if is_set(names::COLOR) {
        return ColorChoice::Always;
    }
    if !std::io::stdout().is_terminal() {
        return ColorChoice::Never;
    }
    if is_set(names::CI) {
        return ColorChoice::Never;
    }
    ColorChoice::Auto
}

/// An explicit `--color` flag wins over the environment.
pub fn color_choice(arg: ColorArg) -> ColorChoice {
    match arg {
        ColorArg::Auto => resolve_color(),
        ColorArg::Always => ColorChoice::Always,
        ColorArg::Never => ColorChoice::Never,
    }
}

/// Color scheme for tree and run output.
pub mod scheme {
    use termcolor::{Color, ColorSpec};

    use crate::status::Status;

    /// Marker color for a node in `status`.
    pub fn status(status: Status) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match status {
            Status::Passed => spec.set_fg(Some(Color::Green)),
            Status::Failed => spec.set_fg(Some(Color::Red)).set_bold(true),
            Status::Skipped => spec.set_fg(Some(Color::Yellow)),
            Status::Aborted => spec.set_fg(Some(Color::Magenta)),
            Status::Running => spec.set_fg(Some(Color::Cyan)).set_bold(true),
            Status::Pending | Status::Unknown => spec.set_dimmed(true),
        };
        spec
    }

    /// Bold run label.
    pub fn label() -> ColorSpec {
        let mut spec = ColorSpec::new();
        spec.set_bold(true);
        spec
    }

    /// Cyan file path.
    pub fn path() -> ColorSpec {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Cyan));
        spec
    }

    /// Dimmed secondary text (durations, locations).
    pub fn context() -> ColorSpec {
        let mut spec = ColorSpec::new();
        spec.set_dimmed(true);
        spec
    }

    /// Red for expected values.
    pub fn diff_remove() -> ColorSpec {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Red));
        spec
    }

    /// Green for actual values.
    pub fn diff_add() -> ColorSpec {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Green));
        spec
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
