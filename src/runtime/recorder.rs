use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::actions::ActionKind;

/// Per-action invocation counts for one run.
///
/// Cloning shares the counters. The team resets them when a run starts.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    calls: Arc<Mutex<BTreeMap<ActionKind, usize>>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: ActionKind) {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        *calls.entry(kind).or_default() += 1;
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(&kind).copied().unwrap_or(0)
    }

    /// Snapshot of all non-zero counts.
    pub fn counts(&self) -> BTreeMap<ActionKind, usize> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counts_until_reset() {
        let recorder = CallRecorder::new();
        let shared = recorder.clone();

        recorder.record(ActionKind::CompileCode);
        shared.record(ActionKind::CompileCode);
        shared.record(ActionKind::RunCode);

        assert_eq!(recorder.count(ActionKind::CompileCode), 2);
        assert_eq!(recorder.counts().len(), 2);

        shared.reset();
        assert_eq!(recorder.count(ActionKind::CompileCode), 0);
        assert!(recorder.counts().is_empty());
    }
}
