//! Condition evaluation seam.
//!
//! The engine never interprets conditions itself. It asks a
//! `RulesCollaborator` whether a pack may be installed, passing the current
//! `Variables`. `VariableRules` is the reference collaborator used by the
//! descriptor loader: a condition holds when one variable has an expected value.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::RulesError;
use crate::pack::Pack;

/// Variable set while the engine performs its initial selection pass.
pub const INITIAL_PACK_SELECTION: &str = "initial.pack.selection";

/// Read-only key/value environment handed to the rules collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(BTreeMap<String, String>);

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// External predicate evaluator consulted by the engine.
///
/// # Contract
///
/// - Answers must be a pure function of the pack and the variables. An
///   evaluator whose answers oscillate can keep the condition fixpoint from
///   settling; the engine bounds its passes and reports `Unstable`.
/// - Errors abort the current engine operation without changing any state.
pub trait RulesCollaborator {
    /// Mandatory check: may this pack be installed?
    fn can_install_pack(&self, pack: &Pack, vars: &Variables) -> Result<bool, RulesError>;

    /// May this pack still be installed on explicit request when the
    /// mandatory check fails?
    fn can_install_pack_optional(&self, pack: &Pack, vars: &Variables)
    -> Result<bool, RulesError>;

    fn is_condition_true(&self, condition: &str, vars: &Variables) -> Result<bool, RulesError>;
}

/// A condition that compares one variable against an expected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableCondition {
    pub id: String,
    pub variable: String,
    pub equals: String,
    /// Invert the comparison
    #[serde(default)]
    pub negate: bool,
}

impl VariableCondition {
    pub fn new(
        id: impl Into<String>,
        variable: impl Into<String>,
        equals: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            variable: variable.into(),
            equals: equals.into(),
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    fn evaluate(&self, vars: &Variables) -> bool {
        let matches = vars.get(&self.variable) == Some(self.equals.as_str());
        matches != self.negate
    }
}

/// Reference rules collaborator backed by `VariableCondition`s.
#[derive(Debug, Clone, Default)]
pub struct VariableRules {
    conditions: HashMap<String, VariableCondition>,
    optional: HashSet<String>,
}

impl VariableRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: VariableCondition) -> Self {
        self.conditions.insert(condition.id.clone(), condition);
        self
    }

    /// Allow `pack` to be installed optionally when its condition fails
    pub fn with_optional(mut self, pack: impl Into<String>) -> Self {
        self.optional.insert(pack.into());
        self
    }

    pub fn has_condition(&self, id: &str) -> bool {
        self.conditions.contains_key(id)
    }
}

impl RulesCollaborator for VariableRules {
    fn can_install_pack(&self, pack: &Pack, vars: &Variables) -> Result<bool, RulesError> {
        match &pack.condition {
            None => Ok(true),
            Some(id) => self.is_condition_true(id, vars),
        }
    }

    fn can_install_pack_optional(
        &self,
        pack: &Pack,
        _vars: &Variables,
    ) -> Result<bool, RulesError> {
        Ok(self.optional.contains(&pack.name))
    }

    fn is_condition_true(&self, condition: &str, vars: &Variables) -> Result<bool, RulesError> {
        self.conditions
            .get(condition)
            .map(|c| c.evaluate(vars))
            .ok_or_else(|| RulesError::new(condition, "condition is not defined"))
    }
}
