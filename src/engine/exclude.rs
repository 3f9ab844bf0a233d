//! Exclusion-group resolver.
//!
//! When a pack becomes `Selected` or `Required` and carries an exclusion
//! group, every other `Selected` pack in that group is dropped back to
//! `Unselected`. `Required` packs are never touched here.

use tracing::trace;

use super::selection::Selection;
use crate::pack::{PackCatalogue, PackId};
use crate::state::SelectionState;

/// Unselect the rivals of `winner`. Returns true if anything changed.
pub(crate) fn resolve_exclusions(
    catalogue: &PackCatalogue,
    selection: &mut Selection,
    winner: PackId,
) -> bool {
    let pack = catalogue.get(winner);
    if pack.exclude_group.is_none() || !selection.state(winner).is_chosen() {
        return false;
    }

    let mut changed = false;
    for other in catalogue.visible() {
        if other == winner || selection.state(other) != SelectionState::Selected {
            continue;
        }
        if pack.excludes(catalogue.get(other)) {
            trace!(
                winner = %pack.name,
                loser = %catalogue.get(other).name,
                "exclusion group conflict"
            );
            selection.set(other, SelectionState::Unselected);
            changed = true;
        }
    }
    changed
}

/// Resolve every group at once.
///
/// Required members claim their group first; among user selections the
/// first one in catalogue order wins.
pub(crate) fn resolve_all_exclusions(catalogue: &PackCatalogue, selection: &mut Selection) -> bool {
    let mut changed = false;
    for wanted in [SelectionState::Required, SelectionState::Selected] {
        for id in catalogue.visible() {
            if selection.state(id) == wanted {
                changed |= resolve_exclusions(catalogue, selection, id);
            }
        }
    }
    changed
}
