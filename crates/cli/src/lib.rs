pub mod aggregate;
pub mod cli;
pub mod color;
pub mod config;
pub mod env;
pub mod error;
pub mod index;
pub mod node;
pub mod output;
pub mod process;
pub mod refresh;
pub mod scan;
pub mod session;
pub mod status;
pub mod stream;
pub mod target;
pub mod walker;

pub use aggregate::{StatusCounts, derived_status, is_run_complete};
pub use cli::{Cli, Command, DiscoverArgs, OutputFormat, RunArgs};
pub use config::Config;
pub use error::{Error, ExitCode, Result};
pub use index::{DiscoveryReport, TestIndex};
pub use node::{NodeId, NodeKind, SourceLocation, TestNode, TestTree};
pub use process::{ExitOutcome, Launcher, ProcessHandle, SystemLauncher};
pub use refresh::{RefreshDecision, RefreshThrottle, Refresher};
pub use scan::{ParsedFile, Scanner};
pub use session::{Orchestrator, RunReport, RunSession, SessionOptions};
pub use status::{Status, StatusEntry, StatusStore};
pub use stream::StreamParser;
pub use target::{Invocation, RunScope, RunTarget};
pub use walker::{FileWalker, WalkStats, WalkedFile, WalkerConfig};

#[cfg(test)]
pub mod test_utils;
