//! Per-node fan-in: how many live edges point at a node, and from where.
//!
//! The engine keeps one record per node that has at least one incoming edge.
//! "Live" means not hidden by a collapse, so the counts move as subtrees fold
//! and unfold. A node whose count reaches zero has no visible way in.

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::Serialize;

use super::types::{Edge, NodeId};

/// Incoming-edge record for one node. `value` always equals `parents.len()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FanIn {
	/// Live incoming edge count.
	pub value: usize,
	/// Sources of those edges.
	pub parents: HashSet<NodeId>,
}

impl FanIn {
	/// Record a live edge from `parent`.
	pub fn add(&mut self, parent: &str) {
		self.parents.insert(parent.to_string());
		self.value = self.parents.len();
	}

	/// Drop the live edge from `parent`. Returns the remaining count.
	pub fn remove(&mut self, parent: &str) -> usize {
		if !self.parents.remove(parent) && self.value == 0 {
			// Would go negative: upstream bookkeeping drifted. Floor at zero.
			warn!("fan-in: removing unknown parent {parent} from an empty record");
		}
		self.value = self.parents.len();
		self.value
	}

	/// More than one live parent.
	pub fn is_shared(&self) -> bool {
		self.value > 1
	}
}

/// Fan-in records keyed by target node id.
pub type FrequencyMap = HashMap<NodeId, FanIn>;

/// Build the fan-in map in a single pass over `edges`.
pub fn count_incoming<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> FrequencyMap {
	let mut freq = FrequencyMap::new();
	for edge in edges {
		freq.entry(edge.to.clone()).or_default().add(&edge.from);
	}
	freq
}
