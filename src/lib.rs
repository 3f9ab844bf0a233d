//! Pack Selection Library
//!
//! This library keeps an installer's pack selection consistent: dependencies,
//! exclusion groups, required packs and install conditions are re-resolved
//! after every change.

pub mod cli;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod pack;
pub mod rules;
pub mod state;

// Re-export main types for convenience
pub use descriptor::InstallDescriptor;
pub use engine::graph::DependencyGraph;
pub use engine::{InstallSetSummary, MAX_PIPELINE_PASSES, SelectionEngine};
pub use error::{CatalogueError, PackSelError, RulesError, ToggleError};
pub use pack::{Pack, PackCatalogue, PackId};
pub use rules::{
    INITIAL_PACK_SELECTION, RulesCollaborator, VariableCondition, VariableRules, Variables,
};
pub use state::{BlockCause, SelectionState};
