use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::definition::LoadDefinition;
use super::error::DefinitionError;

/// Orders definitions so every declared dependency precedes its dependents.
///
/// Among definitions with no ordering constraint between them, input order
/// is kept. The loader never calls this itself; callers may feed the result
/// to [`PluginLoader::load_all`](super::PluginLoader::load_all). Note that
/// batch groups still run their members concurrently.
pub fn dependency_order(
    definitions: &[LoadDefinition],
) -> Result<Vec<LoadDefinition>, DefinitionError> {
    let mut graph = DiGraph::<usize, ()>::with_capacity(definitions.len(), 0);
    let mut node_index_map: HashMap<&str, NodeIndex> = HashMap::new();

    for (position, definition) in definitions.iter().enumerate() {
        if node_index_map.contains_key(definition.name()) {
            return Err(DefinitionError::Duplicate(definition.name().to_string()));
        }
        let idx = graph.add_node(position);
        node_index_map.insert(definition.name(), idx);
    }

    for definition in definitions {
        let target = node_index_map[definition.name()];
        for dependency in definition.dependencies() {
            let source = node_index_map.get(dependency.as_str()).ok_or_else(|| {
                DefinitionError::UnknownDependency {
                    plugin: definition.name().to_string(),
                    dependency: dependency.clone(),
                }
            })?;
            graph.update_edge(*source, target, ());
        }
    }

    if let Err(cycle) = petgraph::algo::toposort(&graph, None) {
        let position = graph[cycle.node_id()];
        return Err(DefinitionError::Cycle(definitions[position].name().to_string()));
    }

    // Kahn's algorithm, always taking the earliest ready definition.
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .map(|idx| Reverse(graph[idx]))
        .collect();

    let mut ordered = Vec::with_capacity(definitions.len());
    while let Some(Reverse(position)) = ready.pop() {
        ordered.push(definitions[position].clone());
        let idx = NodeIndex::new(position);
        for next in graph.neighbors_directed(idx, Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.push(Reverse(graph[next]));
            }
        }
    }

    Ok(ordered)
}
