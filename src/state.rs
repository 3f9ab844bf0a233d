//! Per-pack selection states.
//!
//! Every pack in the catalogue is in exactly one `SelectionState` at any time.
//! The engine owns these states; front-ends only read them.
//!
//! # State Overview
//!
//! | State              | Active | Togglable | Counted in install set |
//! |--------------------|--------|-----------|------------------------|
//! | `Required`         | yes    | no        | yes                    |
//! | `Selected`         | yes    | yes       | yes                    |
//! | `Unselected`       | no     | yes       | no                     |
//! | `Blocked`          | no     | no        | no                     |
//! | `AlreadyInstalled` | yes    | no        | no (installed ledger)  |

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Selection state of a single pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SelectionState {
    /// Forced selected; propagates to dependencies
    Required,
    /// Chosen by the user
    Selected,
    #[default]
    Unselected,
    /// Selection forbidden by an unsatisfied dependency or a condition
    Blocked,
    /// Present from a prior installation; never altered
    AlreadyInstalled,
}

impl SelectionState {
    /// Returns true if dependants of a pack in this state are satisfied
    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Required | Self::Selected | Self::AlreadyInstalled)
    }

    /// Returns true if the pack will be written by this installation
    #[inline]
    pub const fn is_chosen(self) -> bool {
        matches!(self, Self::Required | Self::Selected)
    }

    /// States the user can flip directly
    #[inline]
    pub const fn is_togglable(self) -> bool {
        matches!(self, Self::Selected | Self::Unselected)
    }
}

/// Why a pack is `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BlockCause {
    /// A transitive dependency is not active
    Dependency,
    /// The pack's condition forbids installation
    Condition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_active_states() {
        let active: Vec<_> = SelectionState::iter().filter(|s| s.is_active()).collect();
        assert_eq!(
            active,
            vec![
                SelectionState::Required,
                SelectionState::Selected,
                SelectionState::AlreadyInstalled
            ]
        );
    }

    #[test]
    fn test_installed_is_not_chosen() {
        assert!(!SelectionState::AlreadyInstalled.is_chosen());
        assert!(SelectionState::Required.is_chosen());
        assert!(!SelectionState::Blocked.is_chosen());
    }

    #[test]
    fn test_only_user_states_are_togglable() {
        for state in SelectionState::iter() {
            let expected = matches!(state, SelectionState::Selected | SelectionState::Unselected);
            assert_eq!(state.is_togglable(), expected, "{:?}", state);
        }
    }

    #[test]
    fn test_display_roundtrip() {
        for state in SelectionState::iter() {
            let parsed: SelectionState = state.to_string().parse().expect("Should parse");
            assert_eq!(parsed, state);
        }
        assert_eq!(SelectionState::AlreadyInstalled.to_string(), "already-installed");
        assert_eq!(BlockCause::Condition.to_string(), "condition");
    }
}
