//! Pack catalogue types.
//!
//! A `Pack` is an immutable catalogue entry loaded from the installation
//! descriptor. The `PackCatalogue` assigns every pack a dense `PackId` at
//! build time so the engine can keep its per-pack state in plain vectors
//! instead of name-keyed maps.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::CatalogueError;

/// Dense, catalogue-stable pack index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackId(usize);

impl PackId {
    /// Position of the pack in catalogue order
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An installable unit of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    /// Unique identifier
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub required: bool,
    /// Never shown to the user; installed whenever its condition holds
    #[serde(default)]
    pub hidden: bool,
    /// Part of the descriptor's default selection
    #[serde(default)]
    pub preselected: bool,
    /// Packs sharing a group are mutually exclusive
    #[serde(default)]
    pub exclude_group: Option<String>,
    /// Names of the packs this pack needs, in declaration order
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Opaque condition id evaluated by the rules collaborator
    #[serde(default)]
    pub condition: Option<String>,
}

impl Pack {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            size,
            required: false,
            hidden: false,
            preselected: false,
            exclude_group: None,
            dependencies: Vec::new(),
            condition: None,
        }
    }

    pub fn mark_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn mark_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn mark_preselected(mut self) -> Self {
        self.preselected = true;
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.exclude_group = Some(group.into());
        self
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.dependencies.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// True if both packs carry the same exclusion group
    pub fn excludes(&self, other: &Pack) -> bool {
        match (&self.exclude_group, &other.exclude_group) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Pack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.description)
        }
    }
}

/// Immutable, indexed list of packs.
#[derive(Debug, Clone, Default)]
pub struct PackCatalogue {
    packs: Vec<Pack>,
    by_name: HashMap<String, PackId>,
}

impl PackCatalogue {
    /// Build a catalogue, assigning ids in the given order.
    ///
    /// # Errors
    ///
    /// - `DuplicatePack` if two packs share a name
    pub fn new(packs: Vec<Pack>) -> Result<Self, CatalogueError> {
        let mut by_name = HashMap::with_capacity(packs.len());
        for (index, pack) in packs.iter().enumerate() {
            if by_name.insert(pack.name.clone(), PackId(index)).is_some() {
                return Err(CatalogueError::DuplicatePack {
                    name: pack.name.clone(),
                });
            }
        }
        Ok(Self { packs, by_name })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.packs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    /// Look up a pack by id.
    ///
    /// # Panics
    ///
    /// If `id` is out of range, i.e. it came from a larger catalogue.
    #[inline]
    pub fn get(&self, id: PackId) -> &Pack {
        &self.packs[id.0]
    }

    /// Look up a pack by an id that may come from another catalogue
    #[inline]
    pub fn try_get(&self, id: PackId) -> Option<&Pack> {
        self.packs.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<PackId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a list of names, failing on the first unknown one
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PackId>, CatalogueError> {
        names
            .iter()
            .map(|name| {
                self.id_of(name.as_ref())
                    .ok_or_else(|| CatalogueError::UnknownPack {
                        name: name.as_ref().to_string(),
                    })
            })
            .collect()
    }

    /// All ids in catalogue order
    pub fn ids(&self) -> impl Iterator<Item = PackId> + '_ {
        (0..self.packs.len()).map(PackId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PackId, &Pack)> + '_ {
        self.packs.iter().enumerate().map(|(i, p)| (PackId(i), p))
    }

    /// Ids of packs shown to the user
    pub fn visible(&self) -> impl Iterator<Item = PackId> + '_ {
        self.iter().filter(|(_, p)| !p.hidden).map(|(id, _)| id)
    }

    /// Ids of packs auto-included by condition
    pub fn hidden(&self) -> impl Iterator<Item = PackId> + '_ {
        self.iter().filter(|(_, p)| p.hidden).map(|(id, _)| id)
    }

    /// Packs flagged as part of the descriptor's default selection
    pub fn preselected(&self) -> Vec<PackId> {
        self.iter()
            .filter(|(_, p)| p.preselected)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }
}
