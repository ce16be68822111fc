//! Content validation module.
//!
//! Owned feats, classes, traits, talents, traditions and force techniques
//! carry prerequisite trees that name other items. The evaluator breaks
//! loops between them at run time, but a loop in authored content is still
//! a content bug. [`PrerequisiteGraph`] builds the "requires" relation over
//! a compendium of items so such loops can be reported at load time, and
//! gives a dependency-first ordering for everything else.

use crate::error::RulesError;
use crate::model::{Item, ItemKind};
use crate::prerequisite::{ForceTechniqueRequirement, Prerequisite, PrerequisiteKind};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// An item in the compendium, identified by type and display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef {
    pub kind: ItemKind,
    pub name: String,
}

impl ContentRef {
    pub fn new(kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    fn of(item: &Item) -> Self {
        Self::new(item.kind, item.name.clone())
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The "requires" relation between compendium items.
///
/// An edge `A -> B` means A's prerequisites name B.
///
/// # Examples
///
/// ```rust
/// use swse_rules::content::PrerequisiteGraph;
/// use swse_rules::model::{Item, ItemKind};
/// use swse_rules::Prerequisite;
///
/// let requires = |name: &str| {
///     Prerequisite::from_json(&format!(
///         r#"{{"type": "FEAT", "text": "{name}", "requirement": "{name}"}}"#
///     ))
///     .unwrap()
/// };
///
/// let items = vec![
///     Item::new("Force Training", ItemKind::Feat).with_prerequisites(requires("Force Sensitivity")),
///     Item::new("Force Sensitivity", ItemKind::Feat),
/// ];
///
/// let graph = PrerequisiteGraph::from_items(&items);
/// assert!(graph.detect_cycles().is_ok());
///
/// let order = graph.topological_order().unwrap();
/// assert_eq!(order[0].name, "Force Sensitivity");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteGraph {
    graph: DiGraph<ContentRef, ()>,
    node_map: HashMap<ContentRef, NodeIndex>,
}

impl PrerequisiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a compendium.
    ///
    /// Every item becomes a node. References to names outside the
    /// compendium (talent tree names, content from other packs) add no
    /// edge.
    pub fn from_items(items: &[Item]) -> Self {
        let mut graph = Self::new();
        for item in items {
            graph.add_node(ContentRef::of(item));
        }
        for item in items {
            let from = ContentRef::of(item);
            let mut references = Vec::new();
            collect_references(&item.prerequisites, &mut references);
            for reference in references {
                if graph.contains(&reference) {
                    graph.add_edge(from.clone(), reference);
                }
            }
        }
        graph
    }

    /// Add a node if it does not exist yet and return its index.
    pub fn add_node(&mut self, node: ContentRef) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&node) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.node_map.insert(node, idx);
        idx
    }

    /// Record that `dependent` requires `dependency`.
    pub fn add_edge(&mut self, dependent: ContentRef, dependency: ContentRef) {
        let from = self.add_node(dependent);
        let to = self.add_node(dependency);
        self.graph.update_edge(from, to, ());
    }

    /// Find a requirement loop.
    ///
    /// Returns [`RulesError::Cycle`] with the closed path of item names, so
    /// A requiring B requiring A reports `[A, B, A]`.
    pub fn detect_cycles(&self) -> Result<(), RulesError> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for node in self.graph.node_indices() {
            if !visited.contains(&node) {
                if let Some(cycle) = self.find_cycle(node, &mut visited, &mut on_stack, &mut path) {
                    return Err(RulesError::Cycle { path: cycle });
                }
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        on_stack.insert(node);
        path.push(node);

        for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if !visited.contains(&next) {
                if let Some(cycle) = self.find_cycle(next, visited, on_stack, path) {
                    return Some(cycle);
                }
            } else if on_stack.contains(&next) {
                let start = path.iter().position(|idx| *idx == next).unwrap_or(0);
                return Some(
                    path[start..]
                        .iter()
                        .chain(std::iter::once(&next))
                        .map(|idx| self.graph[*idx].name.clone())
                        .collect(),
                );
            }
        }

        on_stack.remove(&node);
        path.pop();
        None
    }

    /// Every item, dependencies before the items that require them.
    pub fn topological_order(&self) -> Result<Vec<ContentRef>, RulesError> {
        self.detect_cycles()?;
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().rev().map(|idx| self.graph[idx].clone()).collect()),
            Err(cycle) => Err(RulesError::Cycle {
                path: vec![self.graph[cycle.node_id()].name.clone()],
            }),
        }
    }

    /// Items directly required by `node`.
    pub fn dependencies(&self, node: &ContentRef) -> Vec<ContentRef> {
        let Some(&idx) = self.node_map.get(node) else {
            return Vec::new();
        };
        let mut dependencies: Vec<ContentRef> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|dep| self.graph[dep].clone())
            .collect();
        dependencies.reverse();
        dependencies
    }

    pub fn nodes(&self) -> Vec<ContentRef> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    pub fn contains(&self, node: &ContentRef) -> bool {
        self.node_map.contains_key(node)
    }
}

/// Items named by `nodes`, through AND/OR children.
fn collect_references(nodes: &[Prerequisite], out: &mut Vec<ContentRef>) {
    for node in nodes {
        match &node.kind {
            PrerequisiteKind::Feat(name) => out.push(ContentRef::new(ItemKind::Feat, name.clone())),
            PrerequisiteKind::Class(name) => out.push(ContentRef::new(ItemKind::Class, name.clone())),
            PrerequisiteKind::Trait(name) => out.push(ContentRef::new(ItemKind::Trait, name.clone())),
            PrerequisiteKind::Talent(name) => out.push(ContentRef::new(ItemKind::Talent, name.clone())),
            PrerequisiteKind::Tradition(name) => out.push(ContentRef::new(ItemKind::ForceTradition, name.clone())),
            PrerequisiteKind::ForceTechnique(ForceTechniqueRequirement::Named(name)) => {
                out.push(ContentRef::new(ItemKind::ForceTechnique, name.clone()))
            }
            PrerequisiteKind::And(children) | PrerequisiteKind::Or { children, .. } => {
                collect_references(children, out)
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requires(kind: &str, name: &str) -> Vec<Prerequisite> {
        Prerequisite::from_json(&json!({"type": kind, "text": name, "requirement": name}).to_string()).unwrap()
    }

    fn feat(name: &str) -> ContentRef {
        ContentRef::new(ItemKind::Feat, name)
    }

    #[test]
    fn test_from_items_links_named_items() {
        let items = vec![
            Item::new("Block", ItemKind::Talent).with_prerequisites(requires("FEAT", "Weapon Proficiency")),
            Item::new("Weapon Proficiency", ItemKind::Feat),
            Item::new("Deflect", ItemKind::Talent).with_prerequisites(requires("TALENT", "Lightsaber Combat")),
        ];
        let graph = PrerequisiteGraph::from_items(&items);
        assert_eq!(graph.nodes().len(), 3);
        assert_eq!(
            graph.dependencies(&ContentRef::new(ItemKind::Talent, "Block")),
            vec![feat("Weapon Proficiency")]
        );
        // Tree names are not compendium items.
        assert!(graph
            .dependencies(&ContentRef::new(ItemKind::Talent, "Deflect"))
            .is_empty());
    }

    #[test]
    fn test_references_through_combinators() {
        let tree = Prerequisite::from_json(
            &json!({"type": "OR", "text": "either", "children": [
                {"type": "FEAT", "text": "Dodge", "requirement": "Dodge"},
                {"type": "AND", "text": "both", "children": [
                    {"type": "CLASS", "text": "Jedi", "requirement": "Jedi"},
                    {"type": "CHARACTER LEVEL", "text": "Level 2", "requirement": "2"}
                ]}
            ]})
            .to_string(),
        )
        .unwrap();
        let mut references = Vec::new();
        collect_references(&tree, &mut references);
        assert_eq!(
            references,
            vec![feat("Dodge"), ContentRef::new(ItemKind::Class, "Jedi")]
        );
    }

    #[test]
    fn test_detect_cycle_path() {
        let items = vec![
            Item::new("A", ItemKind::Feat).with_prerequisites(requires("FEAT", "B")),
            Item::new("B", ItemKind::Feat).with_prerequisites(requires("FEAT", "C")),
            Item::new("C", ItemKind::Feat).with_prerequisites(requires("FEAT", "A")),
        ];
        let graph = PrerequisiteGraph::from_items(&items);
        match graph.detect_cycles() {
            Err(RulesError::Cycle { path }) => assert_eq!(path, vec!["A", "B", "C", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn test_cycle_path_excludes_lead_in() {
        let mut graph = PrerequisiteGraph::new();
        graph.add_edge(feat("X"), feat("A"));
        graph.add_edge(feat("A"), feat("B"));
        graph.add_edge(feat("B"), feat("A"));
        match graph.detect_cycles() {
            Err(RulesError::Cycle { path }) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_requirement() {
        let mut graph = PrerequisiteGraph::new();
        graph.add_edge(feat("A"), feat("A"));
        match graph.detect_cycles() {
            Err(RulesError::Cycle { path }) => assert_eq!(path, vec!["A", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_same_name_different_kind_is_distinct() {
        let mut graph = PrerequisiteGraph::new();
        graph.add_edge(feat("Jedi"), ContentRef::new(ItemKind::Class, "Jedi"));
        assert!(graph.detect_cycles().is_ok());
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn test_topological_order_dependencies_first() {
        let mut graph = PrerequisiteGraph::new();
        graph.add_edge(feat("Force Training"), feat("Force Sensitivity"));
        graph.add_edge(feat("Telekinetic Savant"), feat("Force Training"));
        graph.add_node(feat("Toughness"));

        let order = graph.topological_order().unwrap();
        let position = |name: &str| order.iter().position(|node| node.name == name).unwrap();
        assert!(position("Force Sensitivity") < position("Force Training"));
        assert!(position("Force Training") < position("Telekinetic Savant"));
        assert_eq!(order.len(), 4);
    }
}
