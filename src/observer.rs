//! Build trace points.
//!
//! Callers that want to watch the construction (interactive tools, debug
//! dumps) implement [`BuildObserver`] and pass it into the pipeline. All
//! methods default to no-ops, so an observer only overrides the events it
//! cares about.

use crate::{grammar::TerminalID, lr0::StateID, table::Conflict};

pub trait BuildObserver {
    /// A pending item set is about to be expanded into its closure.
    fn closure_started(&mut self, _state: StateID) {}

    /// A new automaton state has been created.
    fn state_discovered(&mut self, _state: StateID, _num_kernels: usize) {}

    /// A computed item set matched the kernel of an existing state and was
    /// merged into it instead of becoming a new state.
    fn states_merged(&mut self, _into: StateID) {}

    /// A conflicted action cell has been resolved.
    fn conflict_resolved(&mut self, _conflict: &Conflict) {}

    /// The look-ahead set of a reduction has been finalized.
    fn lookahead_computed(&mut self, _state: StateID, _num_terminals: usize) {}

    /// A terminal column has been filled in the action table.
    fn action_emitted(&mut self, _state: StateID, _lookahead: TerminalID) {}
}

/// The observer used when the caller does not supply one.
#[derive(Debug, Default)]
pub struct NullObserver;

impl BuildObserver for NullObserver {}
