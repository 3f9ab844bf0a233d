//! Error handling module for the pack selection engine
//!
//! Provides centralized error types using thiserror. Catalogue integrity
//! problems are fatal at initialization; toggle errors are recoverable and
//! leave the selection untouched.

use thiserror::Error;

use crate::state::SelectionState;

/// Failure reported by a rules collaborator while evaluating a predicate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rules evaluation failed for '{subject}': {message}")]
pub struct RulesError {
    /// Pack name or condition id being evaluated
    pub subject: String,
    pub message: String,
}

impl RulesError {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// Catalogue integrity errors, detected once at initialization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogueError {
    /// Two packs share the same name
    #[error("Pack '{name}' is declared more than once")]
    DuplicatePack { name: String },

    /// A declared dependency does not name a pack in the catalogue
    #[error("Pack '{pack}' depends on '{dependency}', which is not in the catalogue")]
    DanglingDependency { pack: String, dependency: String },

    /// The dependency graph contains a cycle
    #[error("Dependency cycle detected: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// A visible pack depends on a hidden one
    #[error("Pack '{pack}' depends on hidden pack '{dependency}'")]
    HiddenDependency { pack: String, dependency: String },

    /// A pre-selected or installed entry names an unknown pack
    #[error("Unknown pack '{name}'")]
    UnknownPack { name: String },
}

/// Errors returned by `SelectionEngine::toggle`. None of them mutate state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToggleError {
    #[error("Unknown pack '{name}'")]
    UnknownPack { name: String },

    /// Pack is already installed, required or hidden
    #[error("Pack '{pack}' cannot be changed (state: {state})")]
    ImmutableState { pack: String, state: SelectionState },

    /// Pack condition forbids installation and no optional exception applies
    #[error("Pack '{pack}' cannot be selected: its condition forbids installation")]
    ConditionForbidden { pack: String },

    /// Pack is blocked because some of its dependencies are not selected
    #[error("Pack '{pack}' cannot be selected until its dependencies are: {}", missing.join(", "))]
    DependencyBlocked { pack: String, missing: Vec<String> },

    #[error(transparent)]
    Rules(#[from] RulesError),

    /// The selection pipeline did not settle within the pass limit
    #[error("Pack selection did not stabilize after {passes} passes")]
    Unstable { passes: usize },
}

/// Errors returned by `SelectionEngine::initialize`
#[derive(Error, Debug)]
pub enum PackSelError {
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// The initial pipeline failed
    #[error("Toggle error: {0}")]
    Toggle(#[from] ToggleError),
}
