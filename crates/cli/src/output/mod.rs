//! Output formatting for test trees and run reports.

pub mod json;
pub mod text;

/// Output formatting options.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// Print source locations next to nodes.
    pub locations: bool,
    /// Maximum failure detail lines shown per test (None = unlimited).
    pub detail_limit: Option<usize>,
}

impl FormatOptions {
    /// Default detail limit for terminal output.
    pub const DETAIL_LIMIT: usize = 15;

    pub fn with_locations(mut self, locations: bool) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_detail_limit(mut self, limit: usize) -> Self {
        self.detail_limit = Some(limit);
        self
    }
}
