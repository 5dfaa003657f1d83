//! Cycle detection over the full edge set.
//!
//! Kahn's algorithm: count in-degrees, seed a queue with every zero in-degree
//! node, then peel nodes off and decrement their successors. If the queue runs
//! dry before every node was emitted, the remainder sits on a cycle.
//!
//! Collapse state is ignored; a cycle hidden behind a collapsed parent is
//! still a cycle.

use std::collections::{HashMap, HashSet, VecDeque};

use super::types::{Edge, Node};
use super::walk::Adjacency;

/// Whether the graph contains at least one cycle.
pub fn detect_cycles(nodes: &[Node], edges: &[Edge]) -> bool {
	detect_cycles_in(nodes, edges, &Adjacency::new(edges))
}

/// [`detect_cycles`] with a prebuilt adjacency index over `edges`.
pub fn detect_cycles_in(nodes: &[Node], edges: &[Edge], adjacency: &Adjacency) -> bool {
	if nodes.is_empty() {
		return false;
	}

	let mut in_degree: HashMap<&str, usize> = HashMap::new();
	let mut visited: HashSet<&str> = HashSet::new();
	let mut queue: VecDeque<&str> = VecDeque::new();

	// BFS from the first node, then from each component not reached yet,
	// counting every edge exactly once.
	for seed in nodes {
		if !visited.insert(seed.id.as_str()) {
			continue;
		}
		queue.push_back(seed.id.as_str());
		while let Some(id) = queue.pop_front() {
			for &i in adjacency.outgoing(id) {
				let target = edges[i].to.as_str();
				*in_degree.entry(target).or_insert(0) += 1;
				if visited.insert(target) {
					queue.push_back(target);
				}
			}
		}
	}

	queue.extend(
		nodes
			.iter()
			.map(|n| n.id.as_str())
			.filter(|id| in_degree.get(id).copied().unwrap_or(0) == 0),
	);
	if queue.is_empty() {
		return true;
	}

	let mut emitted = 0;
	while let Some(id) = queue.pop_front() {
		emitted += 1;
		for &i in adjacency.outgoing(id) {
			let target = edges[i].to.as_str();
			if let Some(degree) = in_degree.get_mut(target) {
				*degree = degree.saturating_sub(1);
				if *degree == 0 {
					queue.push_back(target);
				}
			}
		}
	}

	emitted < nodes.len()
}
