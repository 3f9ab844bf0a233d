//! Installation descriptor handling for saving and loading pack catalogues.
//!
//! A descriptor is a JSON file holding the pack catalogue, the packs already
//! installed by a previous run, the variable environment and the variable
//! conditions used by `VariableRules`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::engine::SelectionEngine;
use crate::engine::graph::DependencyGraph;
use crate::error::CatalogueError;
use crate::pack::{Pack, PackCatalogue};
use crate::rules::{VariableCondition, VariableRules, Variables};

/// Installation descriptor that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallDescriptor {
    pub packs: Vec<Pack>,
    /// Pack names present from a prior installation
    #[serde(default)]
    pub installed: Vec<String>,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub conditions: Vec<VariableCondition>,
    /// Packs that may be installed on request when their condition fails
    #[serde(default)]
    pub optional: Vec<String>,
}

impl InstallDescriptor {
    pub fn new(packs: Vec<Pack>) -> Self {
        Self {
            packs,
            ..Self::default()
        }
    }

    /// Save descriptor to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize descriptor to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write descriptor to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load descriptor from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read descriptor from {:?}", path.as_ref()))?;

        let descriptor: Self =
            serde_json::from_str(&content).context("Failed to parse descriptor JSON")?;

        Ok(descriptor)
    }

    /// Validate the descriptor
    pub fn validate(&self) -> Result<()> {
        if self.packs.is_empty() {
            anyhow::bail!("Descriptor must declare at least one pack");
        }
        for pack in &self.packs {
            if pack.name.trim().is_empty() {
                anyhow::bail!("Pack names must not be empty");
            }
            if pack.exclude_group.as_deref().is_some_and(|g| g.trim().is_empty()) {
                anyhow::bail!("Pack '{}' has an empty exclusion group", pack.name);
            }
        }

        let catalogue = self.catalogue()?;
        DependencyGraph::build(&catalogue)?;
        catalogue.resolve_names(&self.installed)?;
        catalogue.resolve_names(&self.optional)?;

        let mut ids = HashSet::new();
        for condition in &self.conditions {
            if !ids.insert(condition.id.as_str()) {
                anyhow::bail!("Condition '{}' is defined more than once", condition.id);
            }
        }
        for pack in &self.packs {
            if let Some(id) = &pack.condition {
                if !ids.contains(id.as_str()) {
                    anyhow::bail!(
                        "Pack '{}' references undefined condition '{}'",
                        pack.name,
                        id
                    );
                }
            }
        }

        Ok(())
    }

    pub fn catalogue(&self) -> Result<PackCatalogue, CatalogueError> {
        PackCatalogue::new(self.packs.clone())
    }

    /// Names of the packs flagged `preselected`
    pub fn preselected(&self) -> Vec<String> {
        self.packs
            .iter()
            .filter(|p| p.preselected)
            .map(|p| p.name.clone())
            .collect()
    }

    pub fn rules(&self) -> VariableRules {
        let rules = self
            .conditions
            .iter()
            .cloned()
            .fold(VariableRules::new(), VariableRules::with_condition);
        self.optional
            .iter()
            .fold(rules, |rules, name| rules.with_optional(name.clone()))
    }

    /// Build and initialize a selection engine from this descriptor
    pub fn build_engine(&self) -> Result<SelectionEngine<VariableRules>> {
        let engine = SelectionEngine::initialize(
            self.catalogue()?,
            &self.preselected(),
            &self.installed,
            self.rules(),
            self.variables.clone(),
        )
        .context("Failed to initialize pack selection")?;
        Ok(engine)
    }
}
