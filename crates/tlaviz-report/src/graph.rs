//! State-graph view of a run.

use serde::Serialize;
use tlaviz_core::model::{RunResults, StateId, Transition};
use tracing::debug;

use crate::layout::{CircularLayout, Position};

/// A laid-out state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// State id.
    pub id: StateId,
    /// The state's one-line description.
    pub description: String,
    /// Variable assignments, in stored order.
    pub variables: Vec<(String, String)>,
    /// Where the layout placed the node.
    pub position: Position,
}

/// Nodes and edges of a run, ready for presentation.
///
/// Nodes are ordered by ascending state id; edges keep the order in which
/// they were recovered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StateGraph {
    nodes: Vec<GraphNode>,
    transitions: Vec<Transition>,
}

impl StateGraph {
    /// Builds the graph of `results`, placing nodes with `layout`.
    pub fn from_results(results: &RunResults, layout: &CircularLayout) -> Self {
        let positions = layout.positions(results.states.len());
        let nodes: Vec<GraphNode> = results
            .states
            .values()
            .zip(positions)
            .map(|(state, position)| GraphNode {
                id: state.id,
                description: state.description.clone(),
                variables: state.variables.clone(),
                position,
            })
            .collect();

        debug!(
            nodes = nodes.len(),
            edges = results.transitions.len(),
            "Built state graph"
        );

        StateGraph {
            nodes,
            transitions: results.transitions.clone(),
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by state id.
    pub fn state_details(&self, id: StateId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Drops all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.transitions.clear();
    }
}
