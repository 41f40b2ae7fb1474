//! The variable dependency graph and its topological order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::CyclicDependencyError;
use crate::graph::FlowGraph;
use crate::ids::{NaturalKey, natural_cmp, sort_natural};

use super::references::extract_references;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    expression: String,
    references: BTreeSet<String>,
}

/// Which evaluatable blocks reference which.
///
/// Nodes are the ids of enabled evaluatable blocks; an edge runs from an id
/// to every node its value expression references. Self-references are kept
/// so they surface as one-element cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, Node>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Builds the graph from a flow graph's enabled evaluatable blocks.
    pub fn build(graph: &FlowGraph) -> Self {
        Self::from_expressions(
            graph
                .blocks()
                .iter()
                .filter(|b| b.is_enabled() && b.definition().evaluatable)
                .map(|b| (b.id().to_string(), b.value_expression().to_string())),
        )
    }

    /// Builds the graph from `(id, expression)` pairs.
    pub fn from_expressions<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries: Vec<(String, String)> = entries.into_iter().collect();
        let known: BTreeSet<String> = entries.iter().map(|(id, _)| id.clone()).collect();

        let mut nodes = BTreeMap::new();
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (id, expression) in entries {
            let references = extract_references(&expression, &known);
            for target in &references {
                dependents.entry(target.clone()).or_default().insert(id.clone());
            }
            nodes.insert(
                id,
                Node {
                    expression,
                    references,
                },
            );
        }
        Self { nodes, dependents }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when there are no evaluatable blocks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is a node.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node ids in natural order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        sort_natural(&mut ids);
        ids
    }

    /// The value expression of `id`.
    pub fn expression(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.expression.as_str())
    }

    /// Ids that `id`'s expression references.
    pub fn references(&self, id: &str) -> impl Iterator<Item = &str> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.references.iter().map(String::as_str))
    }

    /// Ids whose expressions reference `id`, in natural order.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .dependents
            .get(id)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
            .collect();
        sort_natural(&mut out);
        out
    }

    /// Whether `to` can be reached from `from` by following dependent edges.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(id) = stack.pop() {
            for next in self.dependents.get(id).into_iter().flatten() {
                if next == to {
                    return true;
                }
                if seen.insert(next.as_str()) {
                    stack.push(next);
                }
            }
        }
        false
    }

    // --- Kahn's topological sort ---

    /// Orders as many nodes as possible. Returns the ordered prefix and the
    /// nodes left over because they sit on or behind a cycle.
    pub(crate) fn partial_order(&self) -> (Vec<String>, BTreeSet<String>) {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(id, node)| (id.as_str(), node.references.len()))
            .collect();

        let mut ready: BTreeSet<NaturalKey> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(id, _)| NaturalKey((*id).to_string()))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(NaturalKey(id)) = ready.pop_first() {
            for dependent in self.dependents.get(&id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(NaturalKey(dependent.clone()));
                    }
                }
            }
            order.push(id);
        }

        let done: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let remaining = self
            .nodes
            .keys()
            .filter(|id| !done.contains(id.as_str()))
            .cloned()
            .collect();
        (order, remaining)
    }

    /// Finds a shortest cycle among `remaining`, rotated to start at its
    /// naturally smallest id.
    pub(crate) fn shortest_cycle(&self, remaining: &BTreeSet<String>) -> CyclicDependencyError {
        let mut starts: Vec<&str> = remaining.iter().map(String::as_str).collect();
        sort_natural(&mut starts);

        let mut best: Option<Vec<String>> = None;
        for start in starts {
            if let Some(cycle) = self.cycle_through(start, remaining)
                && best.as_ref().is_none_or(|b| cycle.len() < b.len())
            {
                best = Some(cycle);
            }
        }

        let mut cycle = best.unwrap_or_else(|| {
            let mut ids: Vec<String> = remaining.iter().cloned().collect();
            sort_natural(&mut ids);
            ids
        });
        if let Some(pos) = cycle
            .iter()
            .enumerate()
            .min_by(|a, b| natural_cmp(a.1, b.1))
            .map(|(i, _)| i)
        {
            cycle.rotate_left(pos);
        }
        CyclicDependencyError { cycle }
    }

    /// Breadth-first search for the shortest reference path from `start`
    /// back to itself, staying inside `within`.
    fn cycle_through(&self, start: &str, within: &BTreeSet<String>) -> Option<Vec<String>> {
        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            let mut next: Vec<&str> = self
                .references(id)
                .filter(|r| within.contains(*r))
                .collect();
            sort_natural(&mut next);

            for target in next {
                if target == start {
                    let mut path = vec![id.to_string()];
                    let mut cursor = id;
                    while cursor != start {
                        cursor = *parent.get(cursor)?;
                        path.push(cursor.to_string());
                    }
                    path.reverse();
                    return Some(path);
                }
                if !parent.contains_key(target) {
                    parent.insert(target, id);
                    queue.push_back(target);
                }
            }
        }
        None
    }
}

/// Orders the nodes so every id comes after the ids it references.
///
/// Ties are broken by natural id order, so the result does not depend on the
/// order blocks were added in.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<String>, CyclicDependencyError> {
    let (order, remaining) = graph.partial_order();
    if remaining.is_empty() {
        Ok(order)
    } else {
        Err(graph.shortest_cycle(&remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(entries: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::from_expressions(
            entries
                .iter()
                .map(|(id, e)| ((*id).to_string(), (*e).to_string())),
        )
    }

    #[test]
    fn test_order_respects_references() {
        let g = graph(&[("v3", "v1 + v2"), ("v2", "v1 * 2"), ("v1", "1")]);
        assert_eq!(topological_order(&g).unwrap(), vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_ties_break_naturally() {
        let g = graph(&[("b10", "1"), ("b2", "1"), ("b1", "1")]);
        assert_eq!(topological_order(&g).unwrap(), vec!["b1", "b2", "b10"]);
    }

    #[test]
    fn test_two_cycle() {
        let g = graph(&[("v2", "v1"), ("v1", "v2 + 1")]);
        let err = topological_order(&g).unwrap_err();
        assert_eq!(err.cycle, vec!["v1", "v2"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let g = graph(&[("v1", "v1 + 1"), ("v2", "3")]);
        assert_eq!(topological_order(&g).unwrap_err().cycle, vec!["v1"]);
    }

    #[test]
    fn test_shortest_cycle_wins() {
        // a -> b -> c -> a and c -> d -> c; the two-cycle is reported.
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "a + d"), ("d", "c")]);
        assert_eq!(topological_order(&g).unwrap_err().cycle, vec!["c", "d"]);
    }

    #[test]
    fn test_cycle_in_reference_order() {
        let g = graph(&[("x", "z"), ("y", "x"), ("z", "y")]);
        assert_eq!(topological_order(&g).unwrap_err().cycle, vec!["x", "z", "y"]);
    }

    #[test]
    fn test_nodes_behind_cycle_are_left_over() {
        let g = graph(&[("v1", "v2"), ("v2", "v1"), ("v3", "v1"), ("v0", "2")]);
        let (order, remaining) = g.partial_order();
        assert_eq!(order, vec!["v0"]);
        assert_eq!(remaining.len(), 3);
    }

    #[test]
    fn test_dependents_and_reach() {
        let g = graph(&[("a", "1"), ("b", "a"), ("c", "b + a")]);
        assert_eq!(g.dependents("a"), vec!["b", "c"]);
        assert!(g.reaches("b", "c"));
        assert!(!g.reaches("c", "a"));
    }
}
