//! Pack selection engine.
//!
//! `SelectionEngine` owns the catalogue, the dependency graph and every pack's
//! selection state. Front-ends drive it through `toggle` and read it back
//! through the query methods; they never mutate state directly.
//!
//! # Pipeline
//!
//! Every state-changing operation runs the same passes, in this order, on a
//! staged copy of the selection:
//!
//! ```text
//! exclusion groups → reachability → required closure → reachability → conditions
//! ```
//!
//! The passes repeat until one of them changes nothing (bounded by
//! `MAX_PIPELINE_PASSES`). Only then is the staged copy committed, so a
//! failing rules collaborator never leaves the selection half-updated.
//!
//! # Invariants (hold after every public operation)
//!
//! - A chosen pack never has an inactive direct dependency
//! - At most one chosen pack per exclusion group
//! - `AlreadyInstalled` packs never change
//! - A pack whose condition fails without an optional exception is `Blocked`

pub mod graph;

mod conditions;
mod exclude;
mod reachability;
mod required;
mod selection;

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::{PackSelError, ToggleError};
use crate::pack::{Pack, PackCatalogue, PackId};
use crate::rules::{INITIAL_PACK_SELECTION, RulesCollaborator, Variables};
use crate::state::{BlockCause, SelectionState};

use conditions::FixpointMode;
use graph::DependencyGraph;
use selection::Selection;

/// Upper bound on full pipeline passes per operation.
pub const MAX_PIPELINE_PASSES: usize = 64;

/// Resolved install set, returned after every toggle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InstallSetSummary {
    /// Packs to install, in catalogue order
    pub packs: Vec<PackId>,
    pub total_bytes: u64,
}

/// Owner of all selection state for one catalogue.
#[derive(Debug)]
pub struct SelectionEngine<R: RulesCollaborator> {
    catalogue: PackCatalogue,
    graph: DependencyGraph,
    rules: R,
    variables: Variables,
    selection: Selection,
    summary: InstallSetSummary,
}

impl<R: RulesCollaborator> SelectionEngine<R> {
    /// Build the engine and compute the initial selection.
    ///
    /// `preselected` is the descriptor's default selection; `installed` the
    /// packs present from a prior installation. Packs in both lists are
    /// treated as installed only.
    ///
    /// # Errors
    ///
    /// - `Catalogue` for unknown names, dangling or cyclic dependencies
    /// - `Toggle(Rules)` / `Toggle(Unstable)` if the initial pipeline fails
    pub fn initialize<S: AsRef<str>>(
        catalogue: PackCatalogue,
        preselected: &[S],
        installed: &[S],
        rules: R,
        variables: Variables,
    ) -> Result<Self, PackSelError> {
        let installed: HashSet<PackId> = catalogue.resolve_names(installed)?.into_iter().collect();
        let preselected: HashSet<PackId> = catalogue
            .resolve_names(preselected)?
            .into_iter()
            .filter(|id| !installed.contains(id))
            .collect();

        let graph = DependencyGraph::build(&catalogue)?;

        let mut engine = Self {
            selection: Selection::new(catalogue.len()),
            catalogue,
            graph,
            rules,
            variables,
            summary: InstallSetSummary::default(),
        };
        engine.variables.set(INITIAL_PACK_SELECTION, "true");

        let mut staged = engine.seed(&preselected, &installed);
        exclude::resolve_all_exclusions(&engine.catalogue, &mut staged);
        for id in engine.catalogue.visible() {
            let pack = engine.catalogue.get(id);
            if pack.required {
                required::propagate_required(&engine.graph, &mut staged, id);
            }
        }
        conditions::apply_conditions(
            &engine.catalogue,
            &mut staged,
            &engine.rules,
            &engine.variables,
            FixpointMode::Initial,
        )?;
        engine.settle(&mut staged)?;
        let summary = engine.recompute(&mut staged)?;

        engine.selection = staged;
        engine.summary = summary;
        engine.variables.set(INITIAL_PACK_SELECTION, "false");
        engine.report_conflicts();

        info!(
            packs = engine.catalogue.len(),
            selected = engine.summary.packs.len(),
            installed = installed.len(),
            total_bytes = engine.summary.total_bytes,
            "pack selection initialized"
        );
        Ok(engine)
    }

    /// Initial states: installed, pre-selected, and direct dependants of
    /// unselected packs blocked (single pass, no cascade).
    fn seed(&self, preselected: &HashSet<PackId>, installed: &HashSet<PackId>) -> Selection {
        let mut staged = Selection::new(self.catalogue.len());
        for id in self.catalogue.visible() {
            if installed.contains(&id) {
                staged.set(id, SelectionState::AlreadyInstalled);
            } else if preselected.contains(&id) && !self.catalogue.get(id).required {
                staged.set(id, SelectionState::Selected);
            }
        }
        for id in self.catalogue.hidden() {
            if installed.contains(&id) {
                staged.set(id, SelectionState::AlreadyInstalled);
            }
        }

        for id in self.catalogue.visible() {
            if staged.state(id) != SelectionState::Unselected {
                continue;
            }
            for &dependant in self.graph.dependants(id) {
                if staged.state(dependant) != SelectionState::AlreadyInstalled {
                    staged.block(dependant, BlockCause::Dependency);
                }
            }
        }
        staged
    }

    /// Log catalogue configurations the pipeline cannot satisfy.
    fn report_conflicts(&self) {
        let required: Vec<PackId> = self
            .catalogue
            .visible()
            .filter(|&id| self.catalogue.get(id).required)
            .collect();

        for (i, &a) in required.iter().enumerate() {
            for &b in &required[i + 1..] {
                let (pa, pb) = (self.catalogue.get(a), self.catalogue.get(b));
                if pa.excludes(pb) {
                    warn!(
                        first = %pa.name,
                        second = %pb.name,
                        "required packs share an exclusion group"
                    );
                }
            }
        }
        for &id in &required {
            let state = self.selection.state(id);
            if !matches!(state, SelectionState::Required | SelectionState::AlreadyInstalled) {
                warn!(pack = %self.catalogue.get(id).name, %state, "required pack is not enforced");
            }
        }
    }

    /// Run full pipeline passes until nothing changes.
    fn settle(&self, staged: &mut Selection) -> Result<(), ToggleError> {
        for pass in 1..=MAX_PIPELINE_PASSES {
            let before = staged.clone();

            exclude::resolve_all_exclusions(&self.catalogue, staged);
            reachability::update_blocks(&self.catalogue, &self.graph, staged);
            required::enforce_required(
                &self.catalogue,
                &self.graph,
                staged,
                &self.rules,
                &self.variables,
            )?;
            reachability::update_blocks(&self.catalogue, &self.graph, staged);
            conditions::apply_conditions(
                &self.catalogue,
                staged,
                &self.rules,
                &self.variables,
                FixpointMode::Regular,
            )?;

            if *staged == before {
                debug!(passes = pass, "selection settled");
                return Ok(());
            }
        }
        Err(ToggleError::Unstable {
            passes: MAX_PIPELINE_PASSES,
        })
    }

    /// Refresh hidden packs and derive the install set.
    fn recompute(&self, staged: &mut Selection) -> Result<InstallSetSummary, ToggleError> {
        for id in self.catalogue.hidden() {
            if staged.state(id) == SelectionState::AlreadyInstalled {
                continue;
            }
            let included = self
                .rules
                .can_install_pack(self.catalogue.get(id), &self.variables)?;
            let state = if included {
                SelectionState::Selected
            } else {
                SelectionState::Unselected
            };
            staged.set(id, state);
        }

        let packs: Vec<PackId> = self
            .catalogue
            .ids()
            .filter(|&id| staged.state(id).is_chosen())
            .collect();
        let total_bytes = packs.iter().map(|&id| self.catalogue.get(id).size).sum();
        Ok(InstallSetSummary { packs, total_bytes })
    }

    /// Select or deselect a pack and re-resolve the whole selection.
    ///
    /// # Errors
    ///
    /// - `ImmutableState` for installed and hidden packs, or when
    ///   deselecting a required pack
    /// - `ConditionForbidden` when selecting a pack whose condition fails
    ///   without an optional exception
    /// - `DependencyBlocked` when selecting a pack with inactive dependencies
    /// - `Rules` / `Unstable` from the pipeline
    ///
    /// - `UnknownPack` for an id outside this engine's catalogue
    ///
    /// On error the selection is unchanged.
    pub fn toggle(&mut self, id: PackId, desired: bool) -> Result<InstallSetSummary, ToggleError> {
        let pack = self
            .catalogue
            .try_get(id)
            .ok_or_else(|| ToggleError::UnknownPack {
                name: id.to_string(),
            })?;
        let state = self.selection.state(id);

        let immutable = pack.hidden
            || state == SelectionState::AlreadyInstalled
            || (state == SelectionState::Required && !desired);
        if immutable {
            return Err(ToggleError::ImmutableState {
                pack: pack.name.clone(),
                state,
            });
        }

        let mut staged = self.selection.clone();
        if desired {
            let permitted = self.rules.can_install_pack(pack, &self.variables)?
                || self.rules.can_install_pack_optional(pack, &self.variables)?;
            if !permitted {
                return Err(ToggleError::ConditionForbidden {
                    pack: pack.name.clone(),
                });
            }
            let missing = self.blocking_dependencies(id);
            if !missing.is_empty() {
                return Err(ToggleError::DependencyBlocked {
                    pack: pack.name.clone(),
                    missing,
                });
            }
            let target = if pack.required {
                SelectionState::Required
            } else {
                SelectionState::Selected
            };
            staged.set(id, target);
        } else if state == SelectionState::Selected {
            staged.set(id, SelectionState::Unselected);
        }

        exclude::resolve_exclusions(&self.catalogue, &mut staged, id);
        self.settle(&mut staged)?;
        let summary = self.recompute(&mut staged)?;

        debug!(
            pack = %pack.name,
            desired,
            from = %state,
            to = %staged.state(id),
            total_bytes = summary.total_bytes,
            "pack toggled"
        );
        self.selection = staged;
        self.summary = summary.clone();
        Ok(summary)
    }

    /// `toggle` by pack name
    pub fn toggle_by_name(
        &mut self,
        name: &str,
        desired: bool,
    ) -> Result<InstallSetSummary, ToggleError> {
        let id = self.pack_id(name).ok_or_else(|| ToggleError::UnknownPack {
            name: name.to_string(),
        })?;
        self.toggle(id, desired)
    }

    /// Dependencies that keep `id` from being selected.
    ///
    /// The direct inactive dependencies if there are any. Otherwise, when the
    /// reachability search would still block `id` (an inactive pack further
    /// down the chain, behind an installed one), every inactive transitive
    /// dependency.
    fn blocking_dependencies(&self, id: PackId) -> Vec<String> {
        let missing = self.missing_dependencies(id);
        if !missing.is_empty() {
            return missing;
        }
        if !reachability::must_be_blocked(&self.graph, &self.selection)[id.index()] {
            return Vec::new();
        }
        self.graph
            .transitive_dependencies(id)
            .into_iter()
            .filter(|&dep| !self.selection.state(dep).is_active())
            .map(|dep| self.catalogue.get(dep).name.clone())
            .collect()
    }

    /// Names of the direct dependencies of `id` that are not active
    pub fn missing_dependencies(&self, id: PackId) -> Vec<String> {
        self.graph
            .dependencies(id)
            .iter()
            .filter(|&&dep| !self.selection.state(dep).is_active())
            .map(|&dep| self.catalogue.get(dep).name.clone())
            .collect()
    }

    /// # Panics
    ///
    /// If `id` does not belong to this engine's catalogue; use
    /// `state_by_name` for untrusted input.
    #[inline]
    pub fn state(&self, id: PackId) -> SelectionState {
        self.selection.state(id)
    }

    pub fn state_by_name(&self, name: &str) -> Option<SelectionState> {
        self.pack_id(name).map(|id| self.state(id))
    }

    /// Why a pack is blocked, if it is
    #[inline]
    pub fn block_cause(&self, id: PackId) -> Option<BlockCause> {
        self.selection.cause(id)
    }

    /// Whether a front-end should offer the pack as a checkbox
    pub fn is_togglable(&self, id: PackId) -> bool {
        !self.catalogue.get(id).hidden && self.state(id).is_togglable()
    }

    /// Packs to install, in catalogue order
    #[inline]
    pub fn install_set(&self) -> &[PackId] {
        &self.summary.packs
    }

    pub fn install_set_names(&self) -> Vec<&str> {
        self.summary
            .packs
            .iter()
            .map(|&id| self.catalogue.get(id).name.as_str())
            .collect()
    }

    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.summary.total_bytes
    }

    pub fn summary(&self) -> &InstallSetSummary {
        &self.summary
    }

    /// Packs present from a prior installation
    pub fn installed(&self) -> Vec<PackId> {
        self.catalogue
            .ids()
            .filter(|&id| self.state(id) == SelectionState::AlreadyInstalled)
            .collect()
    }

    pub fn installed_bytes(&self) -> u64 {
        self.installed()
            .into_iter()
            .map(|id| self.catalogue.get(id).size)
            .sum()
    }

    /// `(id, pack, state)` for every pack in catalogue order
    pub fn states(&self) -> impl Iterator<Item = (PackId, &Pack, SelectionState)> + '_ {
        self.catalogue
            .iter()
            .map(|(id, pack)| (id, pack, self.selection.state(id)))
    }

    #[inline]
    pub fn pack_id(&self, name: &str) -> Option<PackId> {
        self.catalogue.id_of(name)
    }

    #[inline]
    pub fn pack(&self, id: PackId) -> &Pack {
        self.catalogue.get(id)
    }

    pub fn catalogue(&self) -> &PackCatalogue {
        &self.catalogue
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Raw states in catalogue order
    pub fn snapshot(&self) -> Vec<SelectionState> {
        self.selection.states().to_vec()
    }
}
