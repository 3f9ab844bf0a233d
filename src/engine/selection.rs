//! Dense per-pack selection table.
//!
//! The engine stages every state-changing operation on a clone of this table
//! and only swaps it in once the whole pipeline has succeeded.

use crate::pack::PackId;
use crate::state::{BlockCause, SelectionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selection {
    states: Vec<SelectionState>,
    causes: Vec<Option<BlockCause>>,
}

impl Selection {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            states: vec![SelectionState::Unselected; len],
            causes: vec![None; len],
        }
    }

    #[inline]
    pub(crate) fn state(&self, id: PackId) -> SelectionState {
        self.states[id.index()]
    }

    #[inline]
    pub(crate) fn cause(&self, id: PackId) -> Option<BlockCause> {
        self.causes.get(id.index()).copied().flatten()
    }

    /// True if the pack is `Blocked` for the given reason
    #[inline]
    pub(crate) fn is_blocked_by(&self, id: PackId, cause: BlockCause) -> bool {
        self.state(id) == SelectionState::Blocked && self.cause(id) == Some(cause)
    }

    /// Set a non-blocked state. Use `block` for `Blocked`.
    pub(crate) fn set(&mut self, id: PackId, state: SelectionState) {
        debug_assert!(state != SelectionState::Blocked, "use Selection::block");
        self.states[id.index()] = state;
        self.causes[id.index()] = None;
    }

    pub(crate) fn block(&mut self, id: PackId, cause: BlockCause) {
        self.states[id.index()] = SelectionState::Blocked;
        self.causes[id.index()] = Some(cause);
    }

    pub(crate) fn states(&self) -> &[SelectionState] {
        &self.states
    }
}
