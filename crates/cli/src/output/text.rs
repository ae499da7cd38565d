//! Text output formatter.
//!
//! ```text
//! billing  failed
//!   tests  failed
//!     test_invoice  failed
//!       InvoiceTests  failed
//!         test_tax  failed  2ms
//!           - 100
//!           + 110
//!         test_total  passed  1ms
//! 1 passed, 1 failed in 0.31s
//! ```

use termcolor::WriteColor;

use super::FormatOptions;
use crate::aggregate::{StatusCounts, derive_all};
use crate::color::scheme;
use crate::index::DiscoveryReport;
use crate::node::{NodeId, NodeKind, TestTree};
use crate::session::RunReport;
use crate::status::{Status, StatusEntry, StatusStore};

/// Text output formatter with color support.
pub struct TextFormatter<W: WriteColor> {
    out: W,
    options: FormatOptions,
}

impl<W: WriteColor> TextFormatter<W> {
    pub fn new(out: W, options: FormatOptions) -> Self {
        Self { out, options }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write the forest with the derived status of every node.
    pub fn write_tree(&mut self, tree: &TestTree, store: &StatusStore) -> std::io::Result<()> {
        let statuses = derive_all(tree, store);
        for id in tree.walk() {
            self.write_node(tree, id, statuses[id.index()], store)?;
        }
        Ok(())
    }

    fn write_node(
        &mut self,
        tree: &TestTree,
        id: NodeId,
        status: Status,
        store: &StatusStore,
    ) -> std::io::Result<()> {
        let node = &tree[id];
        let depth = tree.depth(id);
        let indent = "  ".repeat(depth);

        write!(self.out, "{}", indent)?;
        if node.kind == NodeKind::Method {
            write!(self.out, "{}", node.name)?;
        } else {
            self.out.set_color(&scheme::label())?;
            write!(self.out, "{}", node.name)?;
            self.out.reset()?;
        }

        write!(self.out, "  ")?;
        self.out.set_color(&scheme::status(status))?;
        write!(self.out, "{}", status)?;
        self.out.reset()?;

        let entry = if node.dotted_path.is_empty() {
            None
        } else {
            store.entry(&node.dotted_path)
        };

        if node.is_leaf()
            && let Some(ms) = entry.as_ref().and_then(|e| e.duration_ms)
        {
            self.out.set_color(&scheme::context())?;
            write!(self.out, "  {}ms", ms)?;
            self.out.reset()?;
        }

        if self.options.locations
            && let Some(location) = &node.location
        {
            write!(self.out, "  ")?;
            self.out.set_color(&scheme::path())?;
            write!(
                self.out,
                "{}:{}",
                location.file.display(),
                location.start_line
            )?;
            self.out.reset()?;
        }
        writeln!(self.out)?;

        if status == Status::Failed
            && let Some(entry) = &entry
        {
            self.write_failure(entry, &format!("{}  ", indent))?;
        }
        Ok(())
    }

    fn write_failure(&mut self, entry: &StatusEntry, indent: &str) -> std::io::Result<()> {
        if let Some(diff) = &entry.diff {
            self.out.set_color(&scheme::diff_remove())?;
            writeln!(self.out, "{}- {}", indent, diff.expected)?;
            self.out.set_color(&scheme::diff_add())?;
            writeln!(self.out, "{}+ {}", indent, diff.actual)?;
            self.out.reset()?;
            return Ok(());
        }

        let Some(detail) = &entry.failure_detail else {
            return Ok(());
        };
        let total = detail.lines().count();
        let limit = self.options.detail_limit.unwrap_or(total);
        self.out.set_color(&scheme::context())?;
        for line in detail.lines().take(limit) {
            writeln!(self.out, "{}{}", indent, line)?;
        }
        if total > limit {
            writeln!(self.out, "{}... {} more lines", indent, total - limit)?;
        }
        self.out.reset()?;
        Ok(())
    }

    /// Write one live status transition.
    pub fn write_transition(&mut self, path: &str, entry: &StatusEntry) -> std::io::Result<()> {
        self.out.set_color(&scheme::status(entry.status))?;
        write!(self.out, "{:>7}", entry.status.as_str())?;
        self.out.reset()?;
        write!(self.out, "  {}", path)?;
        if let Some(ms) = entry.duration_ms {
            self.out.set_color(&scheme::context())?;
            write!(self.out, "  {}ms", ms)?;
            self.out.reset()?;
        }
        writeln!(self.out)
    }

    /// Write the discovery summary line.
    pub fn write_discovery_summary(&mut self, report: &DiscoveryReport) -> std::io::Result<()> {
        if report.is_empty() {
            return writeln!(self.out, "no tests found");
        }
        let tests = report
            .tree
            .iter()
            .filter(|(_, node)| node.kind == NodeKind::Method)
            .count();
        writeln!(
            self.out,
            "{} test{} in {} file{}",
            tests,
            plural(tests),
            report.files_with_tests,
            plural(report.files_with_tests)
        )?;
        if !report.errors.is_empty() {
            writeln!(
                self.out,
                "{} file{} could not be read",
                report.errors.len(),
                plural(report.errors.len())
            )?;
        }
        Ok(())
    }

    /// Write the run summary line.
    pub fn write_run_summary(&mut self, report: &RunReport) -> std::io::Result<()> {
        let parts = summary_parts(&report.counts);
        if parts.is_empty() {
            write!(self.out, "0 tests")?;
        }
        for (i, (count, status)) in parts.iter().enumerate() {
            if i > 0 {
                write!(self.out, ", ")?;
            }
            self.out.set_color(&scheme::status(*status))?;
            write!(self.out, "{} {}", count, status)?;
            self.out.reset()?;
        }
        write!(
            self.out,
            " in {:.2}s",
            report.elapsed_ms as f64 / 1000.0
        )?;
        if report.cancelled {
            self.out.set_color(&scheme::status(Status::Aborted))?;
            write!(self.out, " (cancelled)")?;
            self.out.reset()?;
        }
        writeln!(self.out)
    }
}

/// Non-zero counts in display order.
fn summary_parts(counts: &StatusCounts) -> Vec<(usize, Status)> {
    [
        (counts.passed, Status::Passed),
        (counts.failed, Status::Failed),
        (counts.skipped, Status::Skipped),
        (counts.aborted, Status::Aborted),
        (counts.pending, Status::Pending),
        (counts.running, Status::Running),
        (counts.unknown, Status::Unknown),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .collect()
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
