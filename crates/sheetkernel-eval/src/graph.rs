//! Dependency graph & cache (component D): per-node records, transitive
//! closure, and topological ordering for the evaluate_cell loop.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::result::SingleEvaluationResult;

/// Everything cached for one dependency node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub deps: FxHashSet<String>,
    pub frontier_deps: FxHashSet<String>,
    pub discarded_frontier_deps: FxHashSet<String>,
    pub result: SingleEvaluationResult,
}

impl NodeRecord {
    pub fn new(result: SingleEvaluationResult) -> Self {
        NodeRecord {
            deps: FxHashSet::default(),
            frontier_deps: FxHashSet::default(),
            discarded_frontier_deps: FxHashSet::default(),
            result,
        }
    }

    /// `deps ∪ (frontier_deps \ discarded_frontier_deps)` (spec §4.D).
    pub fn effective_deps(&self) -> impl Iterator<Item = &String> {
        self.deps.iter().chain(
            self.frontier_deps
                .iter()
                .filter(|k| !self.discarded_frontier_deps.contains(*k)),
        )
    }
}

/// The node-key -> record cache plus the two closure operations the
/// evaluator drives off of it.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    records: FxHashMap<String, NodeRecord>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    pub fn get(&self, key: &str) -> Option<&NodeRecord> {
        self.records.get(key)
    }

    pub fn insert(&mut self, key: String, record: NodeRecord) {
        self.records.insert(key, record);
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeRecord> {
        self.records.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// BFS over effective deps, excluding `root` itself.
    pub fn transitive_deps(&self, root: &str) -> FxHashSet<String> {
        let mut closed = FxHashSet::default();
        let mut queue = vec![root.to_string()];
        while let Some(k) = queue.pop() {
            let Some(record) = self.records.get(&k) else {
                continue;
            };
            for dep in record.effective_deps() {
                if closed.insert(dep.clone()) {
                    queue.push(dep.clone());
                }
            }
        }
        closed
    }

    /// Keys of cached nodes whose effective deps intersect `targets` — the
    /// direct dependents of a set of invalidated nodes (spec §4.F.3 spill
    /// re-check: "every other cached entry whose deps... intersect the new
    /// spill area").
    pub fn dependents_of(&self, targets: &FxHashSet<String>) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, record)| record.effective_deps().any(|d| targets.contains(d)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Kahn's algorithm over the subgraph induced by `nodes` (plus `root`).
    /// Returns `None` if a cycle remains among them. The returned order has
    /// dependencies before dependents; the evaluator consumes it reversed.
    pub fn topological_sort(&self, nodes: &FxHashSet<String>) -> Option<Vec<String>> {
        let mut in_degree: FxHashMap<&str, usize> = FxHashMap::default();
        let mut edges: FxHashMap<&str, Vec<&str>> = FxHashMap::default();

        for key in nodes {
            in_degree.entry(key.as_str()).or_insert(0);
            edges.entry(key.as_str()).or_default();
        }
        for key in nodes {
            let Some(record) = self.records.get(key) else {
                continue;
            };
            for dep in record.effective_deps() {
                if !nodes.contains(dep) {
                    continue;
                }
                edges.entry(dep.as_str()).or_default().push(key.as_str());
                *in_degree.entry(key.as_str()).or_insert(0) += 1;
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(k, _)| *k)
            .collect();
        ready.sort_unstable();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(n) = ready.pop() {
            order.push(n.to_string());
            if let Some(dependents) = edges.get(n) {
                for dependent in dependents {
                    let deg = in_degree.get_mut(dependent).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(dependent);
                    }
                }
            }
            ready.sort_unstable();
        }

        if order.len() == nodes.len() {
            Some(order)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetkernel_common::LiteralValue;

    fn rec(deps: &[&str]) -> NodeRecord {
        let mut r = NodeRecord::new(SingleEvaluationResult::Value(LiteralValue::Int(0)));
        r.deps = deps.iter().map(|s| s.to_string()).collect();
        r
    }

    #[test]
    fn transitive_deps_follows_chain() {
        let mut g = DependencyGraph::new();
        g.insert("a".into(), rec(&["b"]));
        g.insert("b".into(), rec(&["c"]));
        g.insert("c".into(), rec(&[]));
        let closure = g.transitive_deps("a");
        assert_eq!(closure.len(), 2);
        assert!(closure.contains("b"));
        assert!(closure.contains("c"));
    }

    #[test]
    fn topological_sort_orders_deps_before_dependents() {
        let mut g = DependencyGraph::new();
        g.insert("a".into(), rec(&["b"]));
        g.insert("b".into(), rec(&["c"]));
        g.insert("c".into(), rec(&[]));
        let nodes: FxHashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let order = g.topological_sort(&nodes).unwrap();
        let pos = |k: &str| order.iter().position(|x| x == k).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn topological_sort_detects_cycle() {
        let mut g = DependencyGraph::new();
        g.insert("a".into(), rec(&["b"]));
        g.insert("b".into(), rec(&["a"]));
        let nodes: FxHashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert!(g.topological_sort(&nodes).is_none());
    }

    #[test]
    fn dependents_of_finds_direct_and_transitive_callers() {
        let mut g = DependencyGraph::new();
        g.insert("a".into(), rec(&["b"]));
        g.insert("b".into(), rec(&["c"]));
        g.insert("c".into(), rec(&[]));
        let targets: FxHashSet<String> = ["c".to_string()].into_iter().collect();
        let direct = g.dependents_of(&targets);
        assert_eq!(direct, vec!["b".to_string()]);
    }

    #[test]
    fn frontier_deps_respect_discard() {
        let mut g = DependencyGraph::new();
        let mut a = rec(&[]);
        a.frontier_deps.insert("b".into());
        a.discarded_frontier_deps.insert("b".into());
        g.insert("a".into(), a);
        g.insert("b".into(), rec(&[]));
        assert!(g.transitive_deps("a").is_empty());
    }
}
