//! The outgoer walk: one reachability primitive shared by collapse, expand and
//! highlight.
//!
//! The walk is iterative (explicit stack plus visited set) so deep or wide
//! documents cannot overflow the call stack, and re-converging paths
//! (diamonds) are expanded once.
//!
//! Collapse and expand mode read and update fan-in through a [`FanInDraft`],
//! a copy-on-write overlay over the engine's map. Nothing the walk does is
//! visible until the engine commits the draft.

use std::collections::{HashMap, HashSet};

use super::fan_in::{FanIn, FrequencyMap};
use super::state::CollapseState;
use super::types::{Edge, EdgeId, NodeId};

/// Outgoing and incoming edge indices per node id.
#[derive(Clone, Debug, Default)]
pub struct Adjacency {
	outgoing: HashMap<NodeId, Vec<usize>>,
	incoming: HashMap<NodeId, Vec<usize>>,
}

impl Adjacency {
	/// Index `edges` by endpoint. Indices point into the same slice.
	pub fn new(edges: &[Edge]) -> Self {
		let mut adjacency = Self::default();
		for (i, edge) in edges.iter().enumerate() {
			adjacency.outgoing.entry(edge.from.clone()).or_default().push(i);
			adjacency.incoming.entry(edge.to.clone()).or_default().push(i);
		}
		adjacency
	}

	/// Indices of edges leaving `id`.
	pub fn outgoing(&self, id: &str) -> &[usize] {
		self.outgoing.get(id).map(Vec::as_slice).unwrap_or_default()
	}

	/// Indices of edges entering `id`.
	pub fn incoming(&self, id: &str) -> &[usize] {
		self.incoming.get(id).map(Vec::as_slice).unwrap_or_default()
	}
}

/// What the walk is computing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkMode {
	/// Reveal what a collapsed parent hid. Sees through collapsed edges.
	Expand,
	/// Fold a subtree, stopping at nodes that keep another live parent.
	Collapse,
	/// Everything downstream over live edges, ignoring fan-in.
	Highlight,
}

/// Result of one walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Walk {
	/// Nodes absorbed by the walk, in discovery order. Never includes the start node.
	pub nodes: Vec<NodeId>,
	/// Edges traversed (collapse, highlight) or restored (expand).
	pub edges: Vec<EdgeId>,
	/// Nodes reached but not walked past: shared nodes in collapse mode,
	/// nested collapsed parents in expand mode.
	pub boundary: Vec<NodeId>,
}

/// Copy-on-write fan-in overlay. Records are cloned from the base on first touch.
#[derive(Debug)]
pub struct FanInDraft<'a> {
	base: &'a FrequencyMap,
	changed: HashMap<NodeId, FanIn>,
}

impl<'a> FanInDraft<'a> {
	/// An overlay with no changes yet.
	pub fn new(base: &'a FrequencyMap) -> Self {
		Self {
			base,
			changed: HashMap::new(),
		}
	}

	fn record_mut(&mut self, id: &str) -> &mut FanIn {
		let base = self.base;
		self.changed
			.entry(id.to_string())
			.or_insert_with(|| base.get(id).cloned().unwrap_or_default())
	}

	/// Current record for `id`, changed or not.
	pub fn get(&self, id: &str) -> Option<&FanIn> {
		self.changed.get(id).or_else(|| self.base.get(id))
	}

	/// Record a live edge `parent -> id`.
	pub fn add(&mut self, id: &str, parent: &str) {
		self.record_mut(id).add(parent);
	}

	/// Returns the remaining live count.
	pub fn remove(&mut self, id: &str, parent: &str) -> usize {
		self.record_mut(id).remove(parent)
	}

	/// The records touched by the walk, ready to be written back.
	pub fn into_changes(self) -> HashMap<NodeId, FanIn> {
		self.changed
	}
}

/// Read-only view of the graph a walk runs over.
#[derive(Clone, Copy, Debug)]
pub struct WalkContext<'a> {
	/// All edges of the graph.
	pub edges: &'a [Edge],
	/// Index over `edges`.
	pub adjacency: &'a Adjacency,
	/// Current collapse sets.
	pub collapse: &'a CollapseState,
}

/// Walk from `start` in `mode`.
///
/// - Collapse: each live outgoing edge is folded and its target's fan-in
///   decremented. A target whose live fan-in reaches zero is absorbed and
///   walked; one that keeps another live parent is a boundary node.
/// - Expand: each collapsed outgoing edge is restored and its target's fan-in
///   incremented. Hidden targets are revealed; they are walked further unless
///   they are collapsed parents themselves.
/// - Highlight: every node and edge reachable over live edges.
pub fn outgoers(ctx: WalkContext<'_>, start: &str, mode: WalkMode, fan_in: &mut FanInDraft<'_>) -> Walk {
	let mut walk = Walk::default();
	let mut visited: HashSet<&str> = HashSet::from([start]);
	let mut boundary: Vec<&str> = Vec::new();
	let mut stack: Vec<&str> = vec![start];

	while let Some(current) = stack.pop() {
		for &i in ctx.adjacency.outgoing(current) {
			let edge = &ctx.edges[i];
			let collapsed = ctx.collapse.edges.contains(&edge.id);
			let target = edge.to.as_str();

			match mode {
				WalkMode::Collapse => {
					if collapsed {
						continue;
					}
					walk.edges.push(edge.id.clone());
					let remaining = fan_in.remove(target, current);
					if target == start {
						continue;
					}
					if remaining == 0 {
						if visited.insert(target) {
							walk.nodes.push(target.to_string());
							stack.push(target);
						}
					} else {
						boundary.push(target);
					}
				}
				WalkMode::Expand => {
					if !collapsed {
						continue;
					}
					walk.edges.push(edge.id.clone());
					fan_in.add(target, current);
					if target == start || !ctx.collapse.nodes.contains(target) {
						continue;
					}
					if visited.insert(target) {
						walk.nodes.push(target.to_string());
						if ctx.collapse.parents.contains(target) {
							walk.boundary.push(target.to_string());
						} else {
							stack.push(target);
						}
					}
				}
				WalkMode::Highlight => {
					if collapsed {
						continue;
					}
					walk.edges.push(edge.id.clone());
					if visited.insert(target) {
						walk.nodes.push(target.to_string());
						stack.push(target);
					}
				}
			}
		}
	}

	if mode == WalkMode::Collapse {
		// a shared node can still be absorbed later in the same walk
		let mut seen = HashSet::new();
		walk.boundary = boundary
			.into_iter()
			.filter(|id| fan_in.get(id).is_some_and(|f| f.value > 0) && seen.insert(*id))
			.map(str::to_string)
			.collect();
	}

	walk
}
