//! Player action history.

use crate::ActionCode;

/// Append-only record of the actions taken during one level attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecorder {
    history: Vec<ActionCode>,
}

impl InputRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one action; returns the step count including it.
    pub fn record(&mut self, action: ActionCode) -> usize {
        self.history.push(action);
        tracing::debug!(%action, code = action.code(), steps = self.history.len(), "recorded player action");
        self.history.len()
    }

    /// Number of actions recorded since the last clear.
    pub fn steps(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[ActionCode] {
        &self.history
    }

    /// The first `n` recorded actions, or all of them if fewer exist.
    pub fn prefix(&self, n: usize) -> &[ActionCode] {
        &self.history[..n.min(self.history.len())]
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
