//! Dependency reachability check.
//!
//! We use a modified depth-first search over the dependants graph (Cormen et
//! al., *Introduction to Algorithms*, 2nd ed., pp. 540-549). A traversal is
//! started from every pack. Once a traversal passes through a pack that is
//! not active, every dependant reached from there on is "must-be-blocked".
//! The result is the union over all starting roots.
//!
//! The search is a pure function of the graph and the current states; the
//! caller applies its result in a separate step.

use tracing::trace;

use super::graph::DependencyGraph;
use super::selection::Selection;
use crate::pack::{PackCatalogue, PackId};
use crate::state::{BlockCause, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Compute the must-be-blocked map, indexed by `PackId`.
pub(crate) fn must_be_blocked(graph: &DependencyGraph, selection: &Selection) -> Vec<bool> {
    let mut marked = vec![false; graph.len()];
    let mut color = vec![Color::White; graph.len()];

    for index in 0..graph.len() {
        color.fill(Color::White);
        visit(
            PackId::from_index(index),
            false,
            graph,
            selection,
            &mut color,
            &mut marked,
        );
    }
    marked
}

fn visit(
    u: PackId,
    broken: bool,
    graph: &DependencyGraph,
    selection: &Selection,
    color: &mut [Color],
    marked: &mut [bool],
) {
    color[u.index()] = Color::Grey;
    let broken = broken || !selection.state(u).is_active();

    for &v in graph.dependants(u) {
        if broken {
            marked[v.index()] = true;
        }
        if color[v.index()] == Color::White {
            visit(v, broken, graph, selection, color, marked);
        }
    }
    color[u.index()] = Color::Black;
}

/// Apply a must-be-blocked map to the visible packs.
///
/// Marked packs that are `Selected` or `Unselected` become blocked. Packs
/// blocked by this mechanism that are no longer marked are released to
/// `Unselected`; they are never re-selected. Returns true if anything changed.
pub(crate) fn apply_blocks(
    catalogue: &PackCatalogue,
    selection: &mut Selection,
    marked: &[bool],
) -> bool {
    let mut changed = false;
    for id in catalogue.visible() {
        let state = selection.state(id);
        if marked[id.index()] {
            if matches!(state, SelectionState::Selected | SelectionState::Unselected) {
                trace!(pack = %catalogue.get(id).name, "blocked by dependency");
                selection.block(id, BlockCause::Dependency);
                changed = true;
            }
        } else if selection.is_blocked_by(id, BlockCause::Dependency) {
            trace!(pack = %catalogue.get(id).name, "dependency block released");
            selection.set(id, SelectionState::Unselected);
            changed = true;
        }
    }
    changed
}

/// Run the search and apply it. Returns true if anything changed.
pub(crate) fn update_blocks(
    catalogue: &PackCatalogue,
    graph: &DependencyGraph,
    selection: &mut Selection,
) -> bool {
    let marked = must_be_blocked(graph, selection);
    apply_blocks(catalogue, selection, &marked)
}
