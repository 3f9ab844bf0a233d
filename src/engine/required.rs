//! Required propagation.
//!
//! A required pack forces itself and, recursively, every declared dependency
//! into `Required`. `AlreadyInstalled` packs stop the recursion: they are
//! never altered and their own dependencies were settled by the earlier
//! installation.

use tracing::{debug, trace};

use super::graph::DependencyGraph;
use super::selection::Selection;
use crate::error::RulesError;
use crate::pack::{PackCatalogue, PackId};
use crate::rules::{RulesCollaborator, Variables};
use crate::state::{BlockCause, SelectionState};

/// Mark `id` and all of its transitive dependencies `Required`.
///
/// The graph is a DAG (checked when it is built), so the recursion terminates.
pub(crate) fn propagate_required(graph: &DependencyGraph, selection: &mut Selection, id: PackId) {
    if selection.state(id) == SelectionState::AlreadyInstalled {
        return;
    }
    selection.set(id, SelectionState::Required);
    for &dep in graph.dependencies(id) {
        propagate_required(graph, selection, dep);
    }
}

/// Recompute the `Required` closure from scratch.
///
/// A catalogue-required pack is enforced only while its condition permits
/// installation and none of the packs it would pull in is blocked by a
/// condition. Packs left `Required` by an earlier propagation that are
/// outside the new closure drop back to `Unselected`.
///
/// Returns true if any state changed.
pub(crate) fn enforce_required<R: RulesCollaborator + ?Sized>(
    catalogue: &PackCatalogue,
    graph: &DependencyGraph,
    selection: &mut Selection,
    rules: &R,
    vars: &Variables,
) -> Result<bool, RulesError> {
    let before = selection.clone();

    let mut roots = Vec::new();
    for id in catalogue.visible() {
        let pack = catalogue.get(id);
        if !pack.required || selection.state(id) == SelectionState::AlreadyInstalled {
            continue;
        }
        if !rules.can_install_pack(pack, vars)? {
            trace!(pack = %pack.name, "required pack not enforced: condition");
            continue;
        }
        let forbidden = std::iter::once(id)
            .chain(graph.transitive_dependencies(id))
            .find(|&d| selection.is_blocked_by(d, BlockCause::Condition));
        if let Some(dep) = forbidden {
            debug!(
                pack = %pack.name,
                dependency = %catalogue.get(dep).name,
                "required pack not enforced: dependency forbidden by condition"
            );
            continue;
        }
        roots.push(id);
    }

    let mut closure = Selection::new(catalogue.len());
    for id in catalogue.ids() {
        if selection.state(id) == SelectionState::AlreadyInstalled {
            closure.set(id, SelectionState::AlreadyInstalled);
        }
    }
    for &root in &roots {
        propagate_required(graph, &mut closure, root);
    }
    for id in catalogue.visible() {
        let in_closure = closure.state(id) == SelectionState::Required;
        match selection.state(id) {
            SelectionState::AlreadyInstalled => {}
            SelectionState::Required if !in_closure => {
                selection.set(id, SelectionState::Unselected)
            }
            _ if in_closure => selection.set(id, SelectionState::Required),
            _ => {}
        }
    }

    Ok(*selection != before)
}
