//! Property-Based Tests for packsel
//!
//! Uses proptest to drive random catalogues through random toggle sequences.
//!
//! These tests verify, after every operation:
//! - Chosen packs never have an inactive dependency
//! - Exclusion groups hold at most one chosen pack
//! - Required packs and their dependencies stay `Required`
//! - The install set and its byte total match the states
//! - Selecting the same pack twice changes nothing
//! - Packs whose condition fails without an optional exception stay blocked

use std::collections::HashMap;

use proptest::prelude::*;

use packsel::{
    BlockCause, Pack, PackCatalogue, PackId, SelectionEngine, SelectionState, VariableCondition,
    VariableRules, Variables,
};

const MAX_PACKS: usize = 10;

fn name(index: usize) -> String {
    format!("p{}", index)
}

// =============================================================================
// Strategies
// =============================================================================

/// Build packs from raw random draws.
///
/// Dependencies only point at lower indices, so the graph is acyclic.
/// Exclusion groups are only given to optional packs nobody depends on,
/// which keeps every generated catalogue free of unsatisfiable conflicts.
fn build_packs(
    edges: Vec<Vec<bool>>,
    groups: Vec<u8>,
    required: Vec<bool>,
    preselected: Vec<bool>,
    sizes: Vec<u64>,
) -> Vec<Pack> {
    let n = sizes.len();
    let has_dependants: Vec<bool> = (0..n)
        .map(|j| (j + 1..n).any(|i| edges[i][j]))
        .collect();

    (0..n)
        .map(|i| {
            let mut pack = Pack::new(name(i), sizes[i]);
            pack.dependencies = (0..i).filter(|&j| edges[i][j]).map(name).collect();
            pack.required = required[i];
            pack.preselected = preselected[i];
            if groups[i] > 0 && !has_dependants[i] && !required[i] {
                pack.exclude_group = Some(format!("g{}", groups[i]));
            }
            pack
        })
        .collect()
}

fn packs_strategy() -> impl Strategy<Value = Vec<Pack>> {
    (1usize..=MAX_PACKS)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(prop::collection::vec(prop::bool::weighted(0.25), n), n),
                prop::collection::vec(0u8..4, n),
                prop::collection::vec(prop::bool::weighted(0.2), n),
                prop::collection::vec(prop::bool::weighted(0.5), n),
                prop::collection::vec(0u64..10_000, n),
            )
        })
        .prop_map(|(edges, groups, required, preselected, sizes)| {
            build_packs(edges, groups, required, preselected, sizes)
        })
}

/// Toggle operations: (pack index, desired). Indices wrap around the catalogue.
fn ops_strategy() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0..MAX_PACKS, any::<bool>()), 0..24)
}

/// Number of generated conditions; condition `cK` holds when variable `vK` is "on"
const CONDITIONS: usize = 3;

/// A catalogue together with a rules environment
#[derive(Debug, Clone)]
struct Gated {
    packs: Vec<Pack>,
    optional: Vec<bool>,
    switches: Vec<bool>,
}

impl Gated {
    fn rules(&self) -> VariableRules {
        let rules = (1..=CONDITIONS).fold(VariableRules::new(), |rules, k| {
            rules.with_condition(VariableCondition::new(
                format!("c{}", k),
                format!("v{}", k),
                "on",
            ))
        });
        (0..self.packs.len())
            .filter(|&i| self.optional[i])
            .fold(rules, |rules, i| rules.with_optional(name(i)))
    }

    fn variables(&self) -> Variables {
        self.switches
            .iter()
            .enumerate()
            .map(|(k, &on)| (format!("v{}", k + 1), if on { "on" } else { "off" }.to_string()))
            .collect()
    }

    /// Whether the pack's own condition holds
    fn holds(&self, index: usize) -> bool {
        match self.packs[index].condition.as_deref() {
            None => true,
            Some(id) => {
                let k: usize = id[1..].parse().unwrap();
                self.switches[k - 1]
            }
        }
    }
}

fn gated_strategy() -> impl Strategy<Value = Gated> {
    packs_strategy().prop_flat_map(|packs| {
        let n = packs.len();
        (
            Just(packs),
            prop::collection::vec(0..=CONDITIONS, n),
            prop::collection::vec(prop::bool::weighted(0.3), n),
            prop::collection::vec(any::<bool>(), CONDITIONS),
        )
            .prop_map(|(mut packs, codes, optional, switches)| {
                for (pack, code) in packs.iter_mut().zip(codes) {
                    if code > 0 {
                        pack.condition = Some(format!("c{}", code));
                    }
                }
                Gated {
                    packs,
                    optional,
                    switches,
                }
            })
    })
}

fn start_with(
    packs: Vec<Pack>,
    installed: &[String],
    rules: VariableRules,
    variables: Variables,
) -> SelectionEngine<VariableRules> {
    let preselected: Vec<String> = packs
        .iter()
        .filter(|p| p.preselected)
        .map(|p| p.name.clone())
        .collect();
    SelectionEngine::initialize(
        PackCatalogue::new(packs).expect("unique names"),
        &preselected,
        installed,
        rules,
        variables,
    )
    .expect("generated catalogues always initialize")
}

fn start(packs: Vec<Pack>, installed: &[String]) -> SelectionEngine<VariableRules> {
    start_with(packs, installed, VariableRules::new(), Variables::new())
}

fn installed_names(count: usize, mask: &[bool]) -> Vec<String> {
    (0..count).filter(|&i| mask[i]).map(name).collect()
}

// =============================================================================
// Invariant checks
// =============================================================================

fn assert_consistent(engine: &SelectionEngine<VariableRules>) -> Result<(), TestCaseError> {
    // Dependency soundness
    for (id, pack, state) in engine.states() {
        if !state.is_chosen() {
            continue;
        }
        for &dep in engine.graph().dependencies(id) {
            prop_assert!(
                engine.state(dep).is_active(),
                "{} is {} but its dependency {} is {}",
                pack.name,
                state,
                engine.pack(dep).name,
                engine.state(dep)
            );
        }
    }

    // Exclusion soundness
    let mut per_group: HashMap<&str, usize> = HashMap::new();
    for (_, pack, state) in engine.states() {
        if let (true, Some(group)) = (state.is_chosen(), pack.exclude_group.as_deref()) {
            *per_group.entry(group).or_default() += 1;
        }
    }
    for (group, count) in per_group {
        prop_assert!(count <= 1, "group {} has {} chosen packs", group, count);
    }

    // Install set and byte additivity
    let chosen: Vec<PackId> = engine
        .states()
        .filter(|(_, _, state)| state.is_chosen())
        .map(|(id, _, _)| id)
        .collect();
    prop_assert_eq!(engine.install_set(), chosen.as_slice());
    let bytes: u64 = chosen.iter().map(|&id| engine.pack(id).size).sum();
    prop_assert_eq!(engine.total_bytes(), bytes);
    Ok(())
}

fn assert_required_closure(engine: &SelectionEngine<VariableRules>) -> Result<(), TestCaseError> {
    for (id, pack, state) in engine.states() {
        if !pack.required {
            continue;
        }
        prop_assert_eq!(state, SelectionState::Required, "{} lost its required state", pack.name);
        for dep in engine.graph().transitive_dependencies(id) {
            prop_assert_eq!(
                engine.state(dep),
                SelectionState::Required,
                "{} is needed by required {}",
                engine.pack(dep).name,
                pack.name
            );
        }
    }
    Ok(())
}

/// Apply one toggle; a rejected toggle must leave the selection untouched.
fn apply(
    engine: &mut SelectionEngine<VariableRules>,
    index: usize,
    desired: bool,
) -> Result<(), TestCaseError> {
    let target = name(index % engine.catalogue().len());
    let before = engine.snapshot();
    let bytes = engine.total_bytes();
    if engine.toggle_by_name(&target, desired).is_err() {
        prop_assert_eq!(engine.snapshot(), before);
        prop_assert_eq!(engine.total_bytes(), bytes);
    }
    Ok(())
}

// =============================================================================
// Fresh installation
// =============================================================================

proptest! {
    /// Every state reached from a fresh install is consistent
    #[test]
    fn invariants_hold_after_every_toggle(packs in packs_strategy(), ops in ops_strategy()) {
        let mut engine = start(packs, &[]);
        assert_consistent(&engine)?;
        assert_required_closure(&engine)?;

        for (index, desired) in ops {
            apply(&mut engine, index, desired)?;
            assert_consistent(&engine)?;
            assert_required_closure(&engine)?;
        }
    }

    /// Selecting an already-selected pack is a no-op
    #[test]
    fn selecting_twice_is_idempotent(
        packs in packs_strategy(),
        ops in ops_strategy(),
        pick in 0..MAX_PACKS,
    ) {
        let mut engine = start(packs, &[]);
        for (index, desired) in ops {
            apply(&mut engine, index, desired)?;
        }

        let target = name(pick % engine.catalogue().len());
        let first = engine.toggle_by_name(&target, true);
        let snapshot = engine.snapshot();
        let second = engine.toggle_by_name(&target, true);

        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            (a, b) => prop_assert!(false, "diverging results: {:?} then {:?}", a, b),
        }
        prop_assert_eq!(engine.snapshot(), snapshot);
    }

    /// A successful selection always ends with the pack chosen, also when
    /// some packs are already installed
    #[test]
    fn successful_selection_chooses_the_pack(
        packs in packs_strategy(),
        installed_mask in prop::collection::vec(prop::bool::weighted(0.3), MAX_PACKS),
        ops in ops_strategy(),
        pick in 0..MAX_PACKS,
    ) {
        let installed = installed_names(packs.len(), &installed_mask);
        let mut engine = start(packs, &installed);
        for (index, desired) in ops {
            apply(&mut engine, index, desired)?;
        }

        let target = name(pick % engine.catalogue().len());
        if engine.toggle_by_name(&target, true).is_ok() {
            let state = engine.state_by_name(&target).unwrap();
            prop_assert!(state.is_chosen(), "{} ended as {}", target, state);
        }
    }
}

// =============================================================================
// Modify-install mode
// =============================================================================

proptest! {
    /// Installed packs never change and never enter the install set
    #[test]
    fn installed_packs_are_frozen(
        packs in packs_strategy(),
        installed_mask in prop::collection::vec(prop::bool::weighted(0.3), MAX_PACKS),
        ops in ops_strategy(),
    ) {
        let installed = installed_names(packs.len(), &installed_mask);
        let mut engine = start(packs, &installed);

        let frozen: Vec<PackId> = installed
            .iter()
            .map(|n| engine.pack_id(n).unwrap())
            .collect();
        prop_assert_eq!(engine.installed(), frozen.clone());

        for (index, desired) in ops {
            apply(&mut engine, index, desired)?;
            assert_consistent(&engine)?;
            for &id in &frozen {
                prop_assert_eq!(engine.state(id), SelectionState::AlreadyInstalled);
                prop_assert!(!engine.install_set().contains(&id));
            }
        }
    }
}

// =============================================================================
// Conditions and optional packs
// =============================================================================

/// Failing conditions block; required packs whose whole closure may be
/// installed are enforced.
fn assert_conditions(
    engine: &SelectionEngine<VariableRules>,
    gated: &Gated,
) -> Result<(), TestCaseError> {
    for (id, pack, state) in engine.states() {
        let i = id.index();
        if state == SelectionState::AlreadyInstalled {
            continue;
        }
        if !gated.holds(i) && !gated.optional[i] {
            prop_assert_eq!(state, SelectionState::Blocked, "{} should be blocked", pack.name);
            prop_assert_eq!(engine.block_cause(id), Some(BlockCause::Condition));
        }

        let closure = engine.graph().transitive_dependencies(id);
        let enforceable = pack.required
            && gated.holds(i)
            && closure
                .iter()
                .all(|d| gated.holds(d.index()) || gated.optional[d.index()]);
        if enforceable {
            prop_assert_eq!(state, SelectionState::Required, "{} is enforceable", pack.name);
            for dep in closure {
                prop_assert_eq!(
                    engine.state(dep),
                    SelectionState::Required,
                    "{} is needed by required {}",
                    engine.pack(dep).name,
                    pack.name
                );
            }
        }
    }
    Ok(())
}

proptest! {
    /// Invariants hold when packs carry conditions and optional exceptions
    #[test]
    fn invariants_hold_with_conditions(gated in gated_strategy(), ops in ops_strategy()) {
        let mut engine = start_with(gated.packs.clone(), &[], gated.rules(), gated.variables());
        assert_consistent(&engine)?;
        assert_conditions(&engine, &gated)?;

        for (index, desired) in ops {
            apply(&mut engine, index, desired)?;
            assert_consistent(&engine)?;
            assert_conditions(&engine, &gated)?;
        }
    }

    /// Selecting a pack whose condition fails is refused unless it is optional
    #[test]
    fn forbidden_packs_cannot_be_selected(gated in gated_strategy(), pick in 0..MAX_PACKS) {
        let mut engine = start_with(gated.packs.clone(), &[], gated.rules(), gated.variables());
        let index = pick % gated.packs.len();
        let result = engine.toggle_by_name(&name(index), true);
        if !gated.holds(index) && !gated.optional[index] {
            let refused = matches!(
                result,
                Err(packsel::ToggleError::ConditionForbidden { .. })
                    | Err(packsel::ToggleError::ImmutableState { .. })
            );
            prop_assert!(refused, "{} was not refused: {:?}", name(index), result);
        }
    }
}
