//! Import graph: dedup across the script graph and cycle rejection

use std::collections::{HashMap, HashSet, VecDeque};

use crate::descriptor::UnitKey;
use crate::error::GraphError;

/// Node in the import graph, one per deduplicated (file, rule-set) pair.
#[derive(Debug, Clone)]
pub struct ImportNode {
    pub key: UnitKey,
    /// Keys of the units this node imports.
    pub imports: Vec<UnitKey>,
}

/// Directed graph of script units keyed by their dedup identity.
///
/// The same file imported twice with identical rename rules collapses to one
/// node; differing rules keep the imports distinct. Self-referential or
/// mutually-importing scripts are rejected by [`ImportGraph::detect_cycles`].
pub struct ImportGraph {
    nodes: HashMap<UnitKey, ImportNode>,
    /// Keys in insertion order, for deterministic traversal and output.
    insertion: Vec<UnitKey>,
    entry: Option<UnitKey>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            insertion: Vec::new(),
            entry: None,
        }
    }

    /// Set the entry-point unit.
    pub fn set_entry(&mut self, key: UnitKey) {
        self.entry = Some(key);
    }

    pub fn entry(&self) -> Option<&UnitKey> {
        self.entry.as_ref()
    }

    /// Insert a node. Re-inserting an existing key leaves the graph
    /// unchanged and reports `false`.
    pub fn add_unit(&mut self, key: UnitKey, imports: Vec<UnitKey>) -> bool {
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.insertion.push(key.clone());
        self.nodes.insert(
            key.clone(),
            ImportNode {
                key,
                imports,
            },
        );
        true
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, key: &UnitKey) -> Option<&ImportNode> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Detect cycles in the import graph.
    pub fn detect_cycles(&self) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for key in &self.insertion {
            if !visited.contains(key) {
                if let Some(cycle) = self.detect_cycle_util(key, &mut visited, &mut rec_stack) {
                    return Err(GraphError::Cycle(
                        cycle
                            .iter()
                            .map(|k| k.to_string())
                            .collect::<Vec<_>>()
                            .join(" -> "),
                    ));
                }
            }
        }

        Ok(())
    }

    /// DFS utility for cycle detection.
    fn detect_cycle_util(
        &self,
        current: &UnitKey,
        visited: &mut HashSet<UnitKey>,
        rec_stack: &mut HashSet<UnitKey>,
    ) -> Option<Vec<UnitKey>> {
        visited.insert(current.clone());
        rec_stack.insert(current.clone());

        if let Some(node) = self.nodes.get(current) {
            for import in &node.imports {
                if !visited.contains(import) {
                    if let Some(mut cycle) = self.detect_cycle_util(import, visited, rec_stack) {
                        cycle.insert(0, current.clone());
                        return Some(cycle);
                    }
                } else if rec_stack.contains(import) {
                    return Some(vec![current.clone(), import.clone()]);
                }
            }
        }

        rec_stack.remove(current);
        None
    }

    /// Dependency-first ordering of all units (Kahn's algorithm),
    /// deterministic for a given insertion order.
    pub fn ordered(&self) -> Result<Vec<UnitKey>, GraphError> {
        self.detect_cycles()?;

        let mut in_degree: HashMap<&UnitKey, usize> = HashMap::new();
        let mut dependents: HashMap<&UnitKey, Vec<&UnitKey>> = HashMap::new();

        for key in &self.insertion {
            in_degree.insert(key, 0);
            dependents.insert(key, Vec::new());
        }

        for key in &self.insertion {
            let node = &self.nodes[key];
            let count = node
                .imports
                .iter()
                .filter(|i| self.nodes.contains_key(*i))
                .count();
            in_degree.insert(key, count);

            for import in &node.imports {
                if let Some(list) = dependents.get_mut(import) {
                    list.push(key);
                }
            }
        }

        let mut queue: VecDeque<&UnitKey> = self
            .insertion
            .iter()
            .filter(|k| in_degree[*k] == 0)
            .collect();
        let mut result = Vec::with_capacity(self.insertion.len());

        while let Some(current) = queue.pop_front() {
            result.push(current.clone());

            if let Some(deps) = dependents.get(current) {
                for dependent in deps.clone() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        // Unreachable after the cycle check, kept as a guard.
        if result.len() != self.nodes.len() {
            return Err(GraphError::Cycle("import ordering did not converge".into()));
        }

        Ok(result)
    }
}

impl Default for ImportGraph {
    fn default() -> Self {
        Self::new()
    }
}
