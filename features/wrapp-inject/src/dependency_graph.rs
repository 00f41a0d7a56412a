use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{
    dependency::DependencyInfo, errors::format_chain, producer::Producer, registry::Registry,
    types::Key,
};

/// Graph of every binding of a registry and the implicit constructors they reach
///
/// Used to report missing dependencies and cycles before anything is resolved.
pub struct DependencyGraph {
    map: HashMap<Key, DependencyGraphEntry>,
}
impl DependencyGraph {
    pub fn new(registry: &Registry) -> Self {
        let mut graph = Self {
            map: Default::default(),
        };

        let mut pending: Vec<(Key, Producer, bool)> = registry
            .keys()
            .filter_map(|key| {
                registry
                    .get(key)
                    .map(|binding| (key.clone(), binding.producer.clone(), false))
            })
            .collect();

        while let Some((key, producer, implicit)) = pending.pop() {
            if graph.map.contains_key(&key) {
                continue;
            }

            let dependencies = producer.dependencies();
            for dependency in &dependencies {
                if registry.contains(&dependency.name_key()) {
                    continue;
                }
                let Some(type_key) = dependency.type_key() else {
                    continue;
                };
                if registry.contains(&type_key) {
                    continue;
                }
                if let Some(fallback) = dependency.fallback() {
                    pending.push((type_key, fallback, true));
                }
            }

            graph.map.insert(
                key.clone(),
                DependencyGraphEntry {
                    key,
                    dependencies,
                    implicit,
                },
            );
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.map.contains_key(key)
    }

    /// The entry a dependency resolves to, name bindings first
    fn edge(&self, dependency: &DependencyInfo) -> Option<&DependencyGraphEntry> {
        if let Some(entry) = self.map.get(&dependency.name_key()) {
            return Some(entry);
        }

        let entry = self.map.get(&dependency.type_key()?)?;
        // An implicit constructor only applies to dependencies that declare one
        if entry.implicit && dependency.fallback().is_none() {
            return None;
        }
        Some(entry)
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();

        let mut roots: Vec<&DependencyGraphEntry> = self.map.values().collect();
        roots.sort_by_cached_key(|entry| entry.key.to_string());

        for entry in roots {
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse<'g>(
            graph: &'g DependencyGraph,
            checked: &mut HashSet<&'g Key>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'g Key>,
            entry: &'g DependencyGraphEntry,
        ) {
            // Circular Dependency Check
            if let Some(position) = dependency_chain.iter().position(|key| **key == entry.key) {
                let mut chain: Vec<Key> = dependency_chain[position..]
                    .iter()
                    .map(|key| (*key).clone())
                    .collect();
                chain.push(entry.key.clone()); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from: entry.key.clone(),
                    to: dependency_chain[dependency_chain.len() - 1].clone(),
                    chain,
                });
                return;
            }

            // Skip other checks if already checked
            if !checked.insert(&entry.key) {
                return;
            };

            dependency_chain.push(&entry.key);

            for dependency in &entry.dependencies {
                if dependency.lazy {
                    // Lazy slots are filled after construction, they can close cycles
                    continue;
                }

                let Some(next_entry) = graph.edge(dependency) else {
                    if !dependency.optional {
                        errors.push(DependencyGraphError::MissingDependency {
                            dependency: dependency.reported_key(),
                            required_by: entry.key.clone(),
                        });
                    }
                    continue;
                };

                check_recurse(graph, checked, errors, dependency_chain, next_entry);
            }

            dependency_chain.pop();
        }
    }
}

struct DependencyGraphEntry {
    key: Key,
    dependencies: Vec<DependencyInfo>,
    /// Not bound, reached through a declared type's constructor
    implicit: bool,
}

#[derive(Error, Debug, Clone)]
pub enum DependencyGraphError {
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency { dependency: Key, required_by: Key },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {} - Consider using `Lazy`", format_chain(.chain))]
    CircularDependency { from: Key, to: Key, chain: Vec<Key> },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
