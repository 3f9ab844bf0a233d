//! Condition fixpoint.
//!
//! Scans the visible packs and asks the rules collaborator about each one.
//! Any change restarts the scan from the first pack, because conditions may
//! depend on variables that reflect earlier decisions. The loop ends when a
//! full scan changes nothing.
//!
//! | `can_install` | `optional` | Initial mode              | Regular mode |
//! |---------------|------------|---------------------------|--------------|
//! | true          | -          | release condition block   | same         |
//! | false         | true       | downgrade to `Unselected` | release condition block |
//! | false         | false      | block (condition)         | same         |

use tracing::{debug, trace};

use super::selection::Selection;
use crate::error::ToggleError;
use crate::pack::PackCatalogue;
use crate::rules::{RulesCollaborator, Variables};
use crate::state::{BlockCause, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FixpointMode {
    /// First pass of initialization: optional packs are downgraded as well
    Initial,
    Regular,
}

/// Run the fixpoint. Returns true if any state changed.
///
/// # Errors
///
/// - `Rules` if the collaborator fails
/// - `Unstable` if the scan restarts more often than the catalogue can justify
pub(crate) fn apply_conditions<R: RulesCollaborator + ?Sized>(
    catalogue: &PackCatalogue,
    selection: &mut Selection,
    rules: &R,
    vars: &Variables,
    mode: FixpointMode,
) -> Result<bool, ToggleError> {
    // Each visible pack can change at most a few times per run
    let max_scans = 3 * catalogue.len() + 1;
    let mut changed = false;
    let mut scans = 0;

    'scan: loop {
        scans += 1;
        if scans > max_scans {
            return Err(ToggleError::Unstable { passes: scans - 1 });
        }

        for id in catalogue.visible() {
            let state = selection.state(id);
            if state == SelectionState::AlreadyInstalled {
                continue;
            }
            let pack = catalogue.get(id);
            let condition_blocked = selection.is_blocked_by(id, BlockCause::Condition);

            if rules.can_install_pack(pack, vars)? {
                if condition_blocked {
                    trace!(pack = %pack.name, "condition block released");
                    selection.set(id, SelectionState::Unselected);
                    changed = true;
                    continue 'scan;
                }
                continue;
            }

            if rules.can_install_pack_optional(pack, vars)? {
                let downgrade = match mode {
                    FixpointMode::Initial => state != SelectionState::Unselected,
                    FixpointMode::Regular => condition_blocked,
                };
                if downgrade {
                    trace!(pack = %pack.name, "optional pack reset to unselected");
                    selection.set(id, SelectionState::Unselected);
                    changed = true;
                    continue 'scan;
                }
                continue;
            }

            if !condition_blocked {
                trace!(pack = %pack.name, "blocked by condition");
                selection.block(id, BlockCause::Condition);
                changed = true;
                continue 'scan;
            }
        }
        break;
    }

    debug!(scans, changed, ?mode, "condition fixpoint settled");
    Ok(changed)
}
