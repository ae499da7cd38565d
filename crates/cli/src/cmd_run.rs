// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run command implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use termcolor::{ColorChoice, StandardStream};

use tally::aggregate::forest_status;
use tally::cli::{Cli, OutputFormat, RunArgs, resolve_root};
use tally::color::color_choice;
use tally::config::Config;
use tally::error::{Error, ExitCode};
use tally::index::TestIndex;
use tally::node::TestTree;
use tally::output::FormatOptions;
use tally::output::json::JsonFormatter;
use tally::output::text::TextFormatter;
use tally::process::SystemLauncher;
use tally::refresh::Refresher;
use tally::session::{Orchestrator, RunReport, SessionOptions};
use tally::status::{Status, StatusStore};
use tally::target::{Invocation, RunScope, RunTarget};

/// One completed session plus the tree it is displayed under.
struct Pass {
    tree: TestTree,
    report: RunReport,
}

/// Everything a pass needs besides its target.
struct Runner<'a> {
    config: &'a Config,
    root: &'a Path,
    tree: &'a TestTree,
    store: &'a Arc<StatusStore>,
    orchestrator: &'a Orchestrator,
    options: SessionOptions,
    live: Option<ColorChoice>,
}

impl Runner<'_> {
    fn pass(&self, target: &RunTarget) -> tally::Result<Pass> {
        let scope = RunScope::resolve(target, self.tree, self.store)?;
        let tree = match target {
            RunTarget::Suite => self.tree.clone(),
            RunTarget::Node(path) => self
                .tree
                .find(path)
                .map(|id| self.tree.subtree(id))
                .unwrap_or_default(),
            RunTarget::Failed => scope.synthetic_tree(self.tree),
        };

        let invocation = Invocation::new(&self.config.runner, self.root, &scope, self.options.fail_fast);
        tracing::debug!("running `{}`", invocation.display());

        let printer = self
            .live
            .map(|choice| live_printer(self.store, self.config, choice));
        let started = self.orchestrator.start(&invocation, scope, self.options);
        let report = started.and_then(|session| session.wait());
        if let Some(printer) = printer {
            printer.stop()?;
        }
        Ok(Pass {
            tree,
            report: report?,
        })
    }
}

/// Print every terminal transition, coalesced to the refresh interval.
fn live_printer(store: &Arc<StatusStore>, config: &Config, choice: ColorChoice) -> Refresher {
    let reader = Arc::clone(store);
    let mut printed: HashMap<String, Status> = HashMap::new();
    let mut out = TextFormatter::new(StandardStream::stdout(choice), FormatOptions::default());

    Refresher::spawn(store.subscribe(), config.refresh.interval(), move |batch| {
        for path in &batch.paths {
            let Some(entry) = reader.entry(path) else {
                continue;
            };
            if !entry.status.is_terminal() || printed.get(path) == Some(&entry.status) {
                continue;
            }
            printed.insert(path.clone(), entry.status);
            if let Err(e) = out.write_transition(path, &entry) {
                tracing::warn!("cannot write progress: {}", e);
            }
        }
    })
}

/// Run the run command.
pub fn run(cli: &Cli, args: &RunArgs) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    let root = resolve_root(args.root.as_deref(), &cwd);
    let config = crate::load_config(cli, &root)?;

    let mut index = TestIndex::new(&root, &config.discovery)?;
    let store = Arc::new(StatusStore::new());
    let discovery = index.discover(&store);
    for failure in &discovery.errors {
        eprintln!(
            "tally: warning: cannot read {}: {}",
            failure.path.display(),
            failure.message
        );
    }

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(SystemLauncher),
        Arc::clone(&store),
    ));
    {
        let orchestrator = Arc::clone(&orchestrator);
        ctrlc::set_handler(move || {
            if orchestrator.cancel() {
                eprintln!("tally: run cancelled");
            }
        })?;
    }

    let choice = color_choice(args.color);
    let runner = Runner {
        config: &config,
        root: &root,
        tree: &discovery.tree,
        store: &store,
        orchestrator: &orchestrator,
        options: SessionOptions {
            fail_fast: args.failfast || config.runner.fail_fast,
            ..SessionOptions::default()
        },
        live: (args.output == OutputFormat::Text && !args.quiet).then_some(choice),
    };

    let mut pass = runner.pass(&args.target())?;
    if args.failed && !pass.report.cancelled {
        match runner.pass(&RunTarget::Failed) {
            Ok(rerun) => pass = rerun,
            Err(Error::NoTests) => tracing::debug!("nothing failed, no re-run"),
            Err(e) => return Err(e.into()),
        }
    }

    let status = forest_status(&pass.tree, &store);
    match args.output {
        OutputFormat::Text => {
            let options = FormatOptions::default().with_detail_limit(FormatOptions::DETAIL_LIMIT);
            let mut formatter = TextFormatter::new(StandardStream::stdout(choice), options);
            formatter.write_tree(&pass.tree, &store)?;
            formatter.write_run_summary(&pass.report)?;
        }
        OutputFormat::Json => {
            JsonFormatter::new(std::io::stdout().lock()).write_run(
                &pass.report,
                status,
                &pass.tree,
                &store,
            )?;
        }
    }

    if pass.report.cancelled || matches!(status, Status::Failed | Status::Aborted) {
        Ok(ExitCode::TestsFailed)
    } else {
        Ok(ExitCode::Success)
    }
}
