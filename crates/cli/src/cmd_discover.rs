// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Discover command implementation.

use termcolor::StandardStream;

use tally::cli::{Cli, DiscoverArgs, OutputFormat, resolve_root};
use tally::color::color_choice;
use tally::error::ExitCode;
use tally::index::TestIndex;
use tally::output::FormatOptions;
use tally::output::json::JsonFormatter;
use tally::output::text::TextFormatter;
use tally::status::StatusStore;

/// Run the discover command.
pub fn run(cli: &Cli, args: &DiscoverArgs) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    let root = resolve_root(args.root.as_deref(), &cwd);
    let config = crate::load_config(cli, &root)?;

    let mut index = TestIndex::new(&root, &config.discovery)?;
    let store = StatusStore::new();
    let report = index.discover(&store);

    for failure in &report.errors {
        eprintln!(
            "tally: warning: cannot read {}: {}",
            failure.path.display(),
            failure.message
        );
    }

    match args.output {
        OutputFormat::Text => {
            let options = FormatOptions::default()
                .with_locations(args.locations)
                .with_detail_limit(FormatOptions::DETAIL_LIMIT);
            let mut formatter =
                TextFormatter::new(StandardStream::stdout(color_choice(args.color)), options);
            formatter.write_tree(&report.tree, &store)?;
            formatter.write_discovery_summary(&report)?;
        }
        OutputFormat::Json => {
            JsonFormatter::new(std::io::stdout().lock()).write_discovery(&report, &store)?;
        }
    }

    Ok(ExitCode::Success)
}
