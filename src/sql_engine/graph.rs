//! File-level dependency graph assembled from per-file records
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::dependency::Dependency;
use super::error::{DuplicateTarget, GraphError};

/// Filtered dependencies plus the owner of every internally produced source
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: Vec<Dependency>,
    owners: BTreeMap<String, String>,
}

impl DependencyGraph {
    /// Validate target uniqueness, drop external sources and resolve owners
    pub fn build(dependencies: Vec<Dependency>) -> Result<Self, GraphError> {
        check_unique_targets(&dependencies)?;

        let producers: HashMap<&str, &str> = dependencies
            .iter()
            .flat_map(|dep| dep.targets.iter().map(|t| (t.as_str(), dep.file.as_str())))
            .collect();

        let filtered: Vec<Dependency> = dependencies
            .iter()
            .map(|dep| filter_sources(dep, &producers))
            .collect();

        let mut owners = BTreeMap::new();
        for dep in &filtered {
            for source in &dep.sources {
                if let Some(file) = producers.get(source.as_str()) {
                    owners.insert(source.clone(), file.to_string());
                }
            }
        }

        Ok(Self {
            dependencies: filtered,
            owners,
        })
    }

    /// Filtered dependencies in input order
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Table name to the file that produces it, for every filtered source
    pub fn owner_map(&self) -> &BTreeMap<String, String> {
        &self.owners
    }

    pub fn owner_of(&self, table: &str) -> Option<&str> {
        self.owners.get(table).map(String::as_str)
    }

    /// Sorted, deduplicated files `dep` must wait on, never including itself
    pub fn prerequisites<'a>(&'a self, dep: &'a Dependency) -> Vec<&'a str> {
        dep.sources
            .iter()
            .filter_map(|source| self.owner_of(source))
            .filter(|owner| *owner != dep.file)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn file_graph(&self) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::new();
        for dep in &self.dependencies {
            graph.add_node(dep.file.as_str());
        }
        for dep in &self.dependencies {
            for owner in self.prerequisites(dep) {
                graph.add_edge(owner, dep.file.as_str(), ());
            }
        }
        graph
    }

    /// Groups of files that wait on each other, each sorted, largest first
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let graph = self.file_graph();
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut files: Vec<String> = component.into_iter().map(str::to_string).collect();
                files.sort();
                files
            })
            .collect();
        cycles.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        cycles
    }

    /// Fail when any files depend on each other in a loop
    pub fn ensure_acyclic(&self) -> Result<(), GraphError> {
        let cycles = self.detect_cycles();
        if cycles.is_empty() {
            Ok(())
        } else {
            Err(GraphError::CircularDependency(cycles))
        }
    }

    /// Topological order of files; among ready files, input order wins
    pub fn execution_order(&self) -> Result<Vec<&Dependency>, GraphError> {
        let index: HashMap<&str, usize> = self
            .dependencies
            .iter()
            .enumerate()
            .map(|(i, dep)| (dep.file.as_str(), i))
            .collect();

        let mut pending: Vec<usize> = self
            .dependencies
            .iter()
            .map(|dep| self.prerequisites(dep).len())
            .collect();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.dependencies.len()];
        for (i, dep) in self.dependencies.iter().enumerate() {
            for owner in self.prerequisites(dep) {
                if let Some(&parent) = index.get(owner) {
                    children[parent].push(i);
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..pending.len()).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(self.dependencies.len());

        while let Some(i) = ready.pop_first() {
            order.push(&self.dependencies[i]);
            for &child in &children[i] {
                pending[child] -= 1;
                if pending[child] == 0 {
                    ready.insert(child);
                }
            }
        }

        if order.len() < self.dependencies.len() {
            return Err(GraphError::CircularDependency(self.detect_cycles()));
        }
        Ok(order)
    }

    /// Graphviz rendering with edges from producer to consumer
    pub fn to_dot_graph(&self) -> String {
        let mut result = String::from("digraph files {\n");
        result.push_str("  rankdir=LR;\n");
        result.push_str("  node [shape=box];\n");

        let mut files: Vec<&str> = self.dependencies.iter().map(|d| d.file.as_str()).collect();
        files.sort();
        for file in &files {
            result.push_str(&format!("  \"{}\";\n", file));
        }

        let mut edges: Vec<(&str, &str)> = self
            .dependencies
            .iter()
            .flat_map(|dep| {
                self.prerequisites(dep)
                    .into_iter()
                    .map(move |owner| (owner, dep.file.as_str()))
            })
            .collect();
        edges.sort();
        for (from, to) in edges {
            result.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
        }

        result.push_str("}\n");
        result
    }
}

/// Every target must be defined exactly once across the corpus
fn check_unique_targets(dependencies: &[Dependency]) -> Result<(), GraphError> {
    let mut definitions: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for dep in dependencies {
        for target in &dep.targets {
            definitions
                .entry(target.as_str())
                .or_default()
                .push(dep.file.clone());
        }
    }

    let duplicates: Vec<DuplicateTarget> = definitions
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(table, files)| DuplicateTarget {
            table: table.to_string(),
            files,
        })
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(GraphError::DuplicateTarget(duplicates))
    }
}

/// Keep only sources some file in the corpus produces
fn filter_sources(dep: &Dependency, producers: &HashMap<&str, &str>) -> Dependency {
    Dependency {
        targets: dep.targets.clone(),
        sources: dep
            .sources
            .iter()
            .filter(|source| producers.contains_key(source.as_str()))
            .cloned()
            .collect(),
        file: dep.file.clone(),
    }
}
