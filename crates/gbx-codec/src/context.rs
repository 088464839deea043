//! Cross-reference context threaded through one decode or encode pass.

use rustc_hash::FxHashSet;

/// Lookback table version written before the first id of a body.
pub(crate) const LOOKBACK_VERSION: u32 = 3;

/// Shared side table for one decode or encode call graph.
///
/// Holds the lookback string table, the node slots filled by external
/// references, and (while encoding) the slots already written. Create a fresh
/// context per top-level call; reusing one across passes corrupts both the
/// string numbering and the node bookkeeping.
#[derive(Debug, Default)]
pub struct CrossRefContext {
    strings: Vec<String>,
    lookback_started: bool,
    external: FxHashSet<u32>,
    written: FxHashSet<u32>,
    in_progress: FxHashSet<u32>,
}

impl CrossRefContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strings interned so far, in table order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Reset per-body state and record the external node slots.
    pub(crate) fn begin_body(&mut self, external: impl IntoIterator<Item = u32>) {
        self.strings.clear();
        self.lookback_started = false;
        self.external = external.into_iter().collect();
        self.written.clear();
        self.in_progress.clear();
    }

    /// Returns `true` exactly once per body, when the version marker is due.
    pub(crate) fn start_lookback(&mut self) -> bool {
        !std::mem::replace(&mut self.lookback_started, true)
    }

    pub(crate) fn lookup_string(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub(crate) fn position_of(&self, value: &str) -> Option<usize> {
        self.strings.iter().position(|s| s == value)
    }

    pub(crate) fn intern(&mut self, value: String) {
        self.strings.push(value);
    }

    pub(crate) fn is_external(&self, index: u32) -> bool {
        self.external.contains(&index)
    }

    pub(crate) fn mark_written(&mut self, index: u32) {
        self.written.insert(index);
    }

    pub(crate) fn is_written(&self, index: u32) -> bool {
        self.written.contains(&index)
    }

    /// Track a node whose body is being decoded.
    pub(crate) fn enter_node(&mut self, index: u32) {
        self.in_progress.insert(index);
    }

    pub(crate) fn leave_node(&mut self, index: u32) {
        self.in_progress.remove(&index);
    }

    pub(crate) fn is_in_progress(&self, index: u32) -> bool {
        self.in_progress.contains(&index)
    }
}
