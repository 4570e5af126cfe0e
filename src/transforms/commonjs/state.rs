use rustc_hash::{FxHashMap, FxHashSet};

/// Per-file bookkeeping shared by every component of one conversion. Never reused across files.
#[derive(Debug, Default)]
pub(super) struct TransformState {
    // names claimed by synthesized imports and fresh identifiers
    globals: FxHashSet<String>,
    // original name -> collision-free replacement
    renamed: FxHashMap<String, String>,
    // named exports already emitted
    exported: FxHashSet<String>,
}

impl TransformState {
    pub(super) fn claim(&mut self, name: &str) -> bool {
        self.globals.insert(name.to_string())
    }

    pub(super) fn is_claimed(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    pub(super) fn record_rename(&mut self, from: &str, to: &str) {
        self.renamed.insert(from.to_string(), to.to_string());
    }

    pub(super) fn renamed_to(&self, name: &str) -> Option<&str> {
        self.renamed.get(name).map(String::as_str)
    }

    pub(super) fn mark_exported(&mut self, name: &str) -> bool {
        self.exported.insert(name.to_string())
    }

    pub(super) fn is_exported(&self, name: &str) -> bool {
        self.exported.contains(name)
    }
}
