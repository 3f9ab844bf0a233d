//! Dependency graph construction.
//!
//! Built once at initialization from the catalogue's declared dependencies.
//! Forward edges (`dependencies`) drive required propagation; reverse edges
//! (`dependants`) drive the reachability check.
//!
//! Hidden packs are not part of the selection pipeline: their declared
//! dependencies are checked for dangling names but contribute no edges.

use crate::error::CatalogueError;
use crate::pack::{PackCatalogue, PackId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Forward and reverse dependency edges, indexed by `PackId`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: Vec<Vec<PackId>>,
    dependants: Vec<Vec<PackId>>,
}

impl DependencyGraph {
    /// Build the graph and check it is a DAG.
    ///
    /// # Errors
    ///
    /// - `DanglingDependency` if a dependency names an unknown pack
    /// - `HiddenDependency` if a visible pack depends on a hidden one
    /// - `CyclicDependency` if the dependency edges contain a cycle
    pub fn build(catalogue: &PackCatalogue) -> Result<Self, CatalogueError> {
        let len = catalogue.len();
        let mut dependencies = vec![Vec::new(); len];
        let mut dependants = vec![Vec::new(); len];

        for (id, pack) in catalogue.iter() {
            for name in &pack.dependencies {
                let dep = catalogue
                    .id_of(name)
                    .ok_or_else(|| CatalogueError::DanglingDependency {
                        pack: pack.name.clone(),
                        dependency: name.clone(),
                    })?;
                if pack.hidden {
                    continue;
                }
                if catalogue.get(dep).hidden {
                    return Err(CatalogueError::HiddenDependency {
                        pack: pack.name.clone(),
                        dependency: name.clone(),
                    });
                }
                dependencies[id.index()].push(dep);
                dependants[dep.index()].push(id);
            }
        }

        let graph = Self {
            dependencies,
            dependants,
        };
        if let Some(cycle) = graph.find_cycle() {
            return Err(CatalogueError::CyclicDependency {
                cycle: cycle
                    .into_iter()
                    .map(|id| catalogue.get(id).name.clone())
                    .collect(),
            });
        }
        Ok(graph)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Packs that `id` declares as dependencies
    #[inline]
    pub fn dependencies(&self, id: PackId) -> &[PackId] {
        &self.dependencies[id.index()]
    }

    /// Packs that declare `id` as a dependency
    #[inline]
    pub fn dependants(&self, id: PackId) -> &[PackId] {
        &self.dependants[id.index()]
    }

    /// All transitive dependencies of `id`, excluding `id` itself, in
    /// depth-first discovery order.
    pub fn transitive_dependencies(&self, id: PackId) -> Vec<PackId> {
        let mut seen = vec![false; self.len()];
        let mut order = Vec::new();
        let mut stack: Vec<PackId> = self.dependencies(id).iter().rev().copied().collect();
        seen[id.index()] = true;

        while let Some(next) = stack.pop() {
            if seen[next.index()] {
                continue;
            }
            seen[next.index()] = true;
            order.push(next);
            stack.extend(self.dependencies(next).iter().rev().copied());
        }
        order
    }

    /// Returns the first cycle found as a closed path (`a -> b -> a`).
    fn find_cycle(&self) -> Option<Vec<PackId>> {
        let mut color = vec![Color::White; self.len()];
        let mut path = Vec::new();
        for index in 0..self.len() {
            if color[index] == Color::White {
                let start = PackId::from_index(index);
                if let Some(cycle) = self.cycle_from(start, &mut color, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn cycle_from(
        &self,
        u: PackId,
        color: &mut [Color],
        path: &mut Vec<PackId>,
    ) -> Option<Vec<PackId>> {
        color[u.index()] = Color::Grey;
        path.push(u);
        for &v in self.dependencies(u) {
            match color[v.index()] {
                Color::Grey => {
                    // Back edge: the cycle is the path suffix starting at v
                    let start = path.iter().position(|&p| p == v).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(v);
                    return Some(cycle);
                }
                Color::White => {
                    if let Some(cycle) = self.cycle_from(v, color, path) {
                        return Some(cycle);
                    }
                }
                Color::Black => {}
            }
        }
        path.pop();
        color[u.index()] = Color::Black;
        None
    }
}
