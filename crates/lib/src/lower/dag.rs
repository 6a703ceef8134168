//! Step dependency graph.
//!
//! A step must be lowered after every step its inputs name. Names are weak
//! references, so edges to steps that do not exist are simply left out, and a
//! step naming itself resolves to scratch rather than depending on itself.
//! Steps that reference each other in a cycle are lowered in plan order, so a
//! reference to a later member of the cycle resolves to scratch.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::plan::BuildPlan;

/// Dependency graph between the steps of a plan.
///
/// Nodes are steps in plan order; an edge runs from a dependency to the step
/// that consumes it. Only the first step with a given name gets a node.
pub struct StepDag {
  graph: DiGraph<String, ()>,
}

impl StepDag {
  pub fn from_plan(plan: &BuildPlan) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for step in &plan.steps {
      if !nodes.contains_key(&step.name) {
        let idx = graph.add_node(step.name.clone());
        nodes.insert(step.name.clone(), idx);
      }
    }

    let mut seen = HashSet::new();
    for step in &plan.steps {
      // Later steps with a taken name are never lowered
      if !seen.insert(step.name.as_str()) {
        continue;
      }
      let dependent_idx = nodes[&step.name];

      for dep in step.step_references() {
        if dep == step.name {
          continue;
        }
        if let Some(&dep_idx) = nodes.get(dep) {
          graph.update_edge(dep_idx, dependent_idx, ());
        }
      }
    }

    Self { graph }
  }

  /// Step names with every dependency before its dependents.
  ///
  /// Independent steps keep their plan order. Steps that reference each other
  /// in a cycle are emitted together, in plan order.
  pub fn topological_steps(&self) -> Vec<String> {
    let components = self.components();
    let mut component_of: HashMap<NodeIndex, usize> = HashMap::with_capacity(self.graph.node_count());
    for (id, members) in components.iter().enumerate() {
      for idx in members {
        component_of.insert(*idx, id);
      }
    }

    let mut in_degree = vec![0usize; components.len()];
    for edge in self.graph.raw_edges() {
      let (from, to) = (component_of[&edge.source()], component_of[&edge.target()]);
      if from != to {
        in_degree[to] += 1;
      }
    }

    // Components are keyed by their earliest member to keep plan order stable
    let mut ready: BinaryHeap<Reverse<(NodeIndex, usize)>> = in_degree
      .iter()
      .enumerate()
      .filter(|(_, degree)| **degree == 0)
      .map(|(id, _)| Reverse((components[id][0], id)))
      .collect();

    let mut order = Vec::with_capacity(self.graph.node_count());
    while let Some(Reverse((_, id))) = ready.pop() {
      for &idx in &components[id] {
        order.push(self.graph[idx].clone());
        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          let next = component_of[&neighbor];
          if next == id {
            continue;
          }
          in_degree[next] -= 1;
          if in_degree[next] == 0 {
            ready.push(Reverse((components[next][0], next)));
          }
        }
      }
    }

    order
  }

  /// Groups of steps that reference each other in a cycle, each in plan order.
  pub fn cycles(&self) -> Vec<Vec<String>> {
    self
      .components()
      .into_iter()
      .filter(|members| members.len() > 1)
      .map(|members| members.into_iter().map(|idx| self.graph[idx].clone()).collect())
      .collect()
  }

  /// Strongly connected components with members sorted, ordered by their
  /// earliest member.
  fn components(&self) -> Vec<Vec<NodeIndex>> {
    let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
      .into_iter()
      .map(|mut members| {
        members.sort();
        members
      })
      .collect();
    components.sort();
    components
  }
}
