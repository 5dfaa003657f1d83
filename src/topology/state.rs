//! The topology engine: the single owner of graph, collapse, highlight and
//! filter state.
//!
//! Every mutation runs to completion before anything is published. Collapse
//! and expand are computed as a delta against the current state, applied, and
//! checked against the collapse invariants; a delta that breaks them is undone
//! and the operation logged as failed. Listeners only ever see settled state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::builder;
use super::cycles::detect_cycles_in;
use super::fan_in::{FanIn, FrequencyMap, count_incoming};
use super::filter::{ActiveFilter, FilterKind, clears_filter, matching_nodes};
use super::items::{Facets, FeedContext, build_from_feed};
use super::size::SizeConfig;
use super::theme::{CategoryMap, NodePalette, assign_category_colors};
use super::types::{Edge, EdgeId, Graph, Node, NodeId};
use super::validate::{AcceptAll, NodeValidator};
use super::walk::{Adjacency, FanInDraft, WalkContext, WalkMode, outgoers};
use crate::error::{BuildError, GraphError};

/// Folded subtrees: which parents are collapsed, and what that hides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollapseState {
	/// Nodes whose subtree is folded.
	pub parents: HashSet<NodeId>,
	/// Nodes currently hidden.
	pub nodes: HashSet<NodeId>,
	/// Edges currently hidden.
	pub edges: HashSet<EdgeId>,
}

impl CollapseState {
	/// Nothing folded.
	pub fn is_empty(&self) -> bool {
		self.parents.is_empty() && self.nodes.is_empty() && self.edges.is_empty()
	}
}

/// Click highlight: the clicked node and everything downstream of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HighlightState {
	/// The clicked node.
	pub current_node: Option<NodeId>,
	/// Highlighted edges.
	pub paths: HashSet<EdgeId>,
	/// Highlighted nodes, the clicked one included.
	pub nodes: HashSet<NodeId>,
}

impl HighlightState {
	fn clear(&mut self) {
		self.current_node = None;
		self.paths.clear();
		self.nodes.clear();
	}
}

/// Engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
	/// Collapse everything after each rebuild.
	pub start_collapsed: bool,
	/// Node dimensions.
	pub sizing: SizeConfig,
	/// Category colors.
	pub palette: NodePalette,
}

/// Snapshot handed to listeners after every settled operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyView<'a> {
	/// Publication counter.
	pub revision: u64,
	/// All nodes, hidden ones included.
	pub nodes: &'a [Node],
	/// All edges, hidden ones included.
	pub edges: &'a [Edge],
	/// The full graph has a cycle.
	pub detect_cycles: bool,
	/// Edges to emphasize.
	pub highlighted_paths: &'a HashSet<EdgeId>,
	/// Nodes to emphasize.
	pub highlighted_nodes: &'a HashSet<NodeId>,
	/// Node of the click highlight.
	pub current_node: Option<&'a str>,
	/// Folded parents.
	pub collapsed_parents: &'a HashSet<NodeId>,
	/// Nodes the renderer must not draw.
	pub collapsed_nodes: &'a HashSet<NodeId>,
	/// Edges the renderer must not draw.
	pub collapsed_edges: &'a HashSet<EdgeId>,
	/// Anything is hidden.
	pub graph_collapsed: bool,
	/// Active field filter.
	pub filter: Option<&'a ActiveFilter>,
	/// Node shown in the detail panel.
	pub selected_node: Option<&'a str>,
}

/// Observer notified with each published view.
pub type Listener = Box<dyn FnMut(&TopologyView<'_>)>;

/// What the current graph was built from, kept so a locale change can rebuild.
#[derive(Clone, Debug)]
enum Source {
	Document { text: String, categories: CategoryMap },
	Feed { lines: Vec<String>, context: FeedContext },
}

/// Inserts and removes against one id set.
#[derive(Clone, Debug, Default)]
struct SetChange {
	insert: Vec<String>,
	remove: Vec<String>,
}

impl SetChange {
	fn insert(ids: impl IntoIterator<Item = String>) -> Self {
		Self {
			insert: ids.into_iter().collect(),
			remove: Vec::new(),
		}
	}

	fn remove(ids: impl IntoIterator<Item = String>) -> Self {
		Self {
			insert: Vec::new(),
			remove: ids.into_iter().collect(),
		}
	}

	/// Apply to `set`, returning the change that undoes what actually happened.
	fn apply(self, set: &mut HashSet<String>) -> SetChange {
		let mut undo = SetChange::default();
		for id in self.remove {
			if set.remove(&id) {
				undo.insert.push(id);
			}
		}
		for id in self.insert {
			if set.insert(id.clone()) {
				undo.remove.push(id);
			}
		}
		undo
	}
}

/// One collapse or expand, ready to apply.
#[derive(Clone, Debug, Default)]
struct CollapseDelta {
	parents: SetChange,
	nodes: SetChange,
	edges: SetChange,
	/// New fan-in record per touched node; `None` drops the record.
	fan_in: HashMap<NodeId, Option<FanIn>>,
}

impl CollapseDelta {
	fn apply(self, collapse: &mut CollapseState, freq: &mut FrequencyMap) -> CollapseDelta {
		let mut fan_in = HashMap::with_capacity(self.fan_in.len());
		for (id, record) in self.fan_in {
			let previous = match record {
				Some(record) => freq.insert(id.clone(), record),
				None => freq.remove(&id),
			};
			fan_in.insert(id, previous);
		}
		CollapseDelta {
			parents: self.parents.apply(&mut collapse.parents),
			nodes: self.nodes.apply(&mut collapse.nodes),
			edges: self.edges.apply(&mut collapse.edges),
			fan_in,
		}
	}
}

/// Graph-level collapse logic over a fixed edge set, independent of the engine
/// so whole-graph operations can fold into a scratch state.
struct Folding<'a> {
	edges: &'a [Edge],
	adjacency: &'a Adjacency,
}

impl Folding<'_> {
	fn context<'c>(&'c self, collapse: &'c CollapseState) -> WalkContext<'c> {
		WalkContext {
			edges: self.edges,
			adjacency: self.adjacency,
			collapse,
		}
	}

	/// `None` when `id` is already a collapsed parent.
	fn collapse(&self, collapse: &CollapseState, freq: &FrequencyMap, id: &str) -> Option<CollapseDelta> {
		if collapse.parents.contains(id) {
			return None;
		}
		let parents = SetChange::insert([id.to_string()]);
		if collapse.nodes.contains(id) {
			// hidden already; folds for real once an ancestor expands
			return Some(CollapseDelta {
				parents,
				..Default::default()
			});
		}
		let mut draft = FanInDraft::new(freq);
		let walk = outgoers(self.context(collapse), id, WalkMode::Collapse, &mut draft);
		if !walk.boundary.is_empty() {
			debug!("topology: collapse {id} keeps shared nodes {:?}", walk.boundary);
		}
		Some(CollapseDelta {
			parents,
			nodes: SetChange::insert(walk.nodes),
			edges: SetChange::insert(walk.edges),
			fan_in: draft.into_changes().into_iter().map(|(k, v)| (k, Some(v))).collect(),
		})
	}

	/// `None` when `id` is not a collapsed parent.
	fn expand(&self, collapse: &CollapseState, freq: &FrequencyMap, id: &str) -> Option<CollapseDelta> {
		if !collapse.parents.contains(id) {
			return None;
		}
		let parents = SetChange::remove([id.to_string()]);
		if collapse.nodes.contains(id) {
			return Some(CollapseDelta {
				parents,
				..Default::default()
			});
		}
		let mut draft = FanInDraft::new(freq);
		let walk = outgoers(self.context(collapse), id, WalkMode::Expand, &mut draft);
		Some(CollapseDelta {
			parents,
			nodes: SetChange::remove(walk.nodes),
			edges: SetChange::remove(walk.edges),
			fan_in: draft.into_changes().into_iter().map(|(k, v)| (k, Some(v))).collect(),
		})
	}

	/// Check the collapse sets and fan-in against each other and the graph.
	fn verify(&self, nodes: &[Node], collapse: &CollapseState, freq: &FrequencyMap) -> Result<(), GraphError> {
		let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
		let violation = |msg: String| Err(GraphError::Invariant(msg));

		let mut live: HashMap<&str, HashSet<&str>> = HashMap::new();
		let mut collapsed_seen = 0;
		for edge in self.edges {
			if collapse.edges.contains(&edge.id) {
				collapsed_seen += 1;
				let from = edge.from.as_str();
				if !collapse.parents.contains(from) && !collapse.nodes.contains(from) {
					return violation(format!("edge {} is hidden but {from} is visible and not collapsed", edge.id));
				}
			} else {
				live.entry(edge.to.as_str()).or_default().insert(edge.from.as_str());
			}
		}
		if collapsed_seen != collapse.edges.len() {
			return violation("hidden edge set names edges outside the graph".into());
		}

		for node in nodes {
			let id = node.id.as_str();
			let expected = live.get(id);
			let expected_len = expected.map_or(0, HashSet::len);
			let record = freq.get(id);
			let actual_len = record.map_or(0, |r| r.parents.len());
			if let Some(record) = record {
				if record.value != record.parents.len() {
					return violation(format!("fan-in of {id} counts {} for {} parents", record.value, record.parents.len()));
				}
			}
			let same = expected_len == actual_len
				&& expected.is_none_or(|e| {
					record.is_some_and(|r| e.iter().all(|p| r.parents.contains(*p)))
				});
			if !same {
				return violation(format!("fan-in of {id} does not match its live edges"));
			}
		}

		for id in &collapse.parents {
			if !known.contains(id.as_str()) {
				return violation(format!("collapsed parent {id} is not in the graph"));
			}
		}
		for id in &collapse.nodes {
			if !known.contains(id.as_str()) {
				return violation(format!("hidden node {id} is not in the graph"));
			}
			let incoming = self.adjacency.incoming(id);
			if incoming.is_empty() {
				return violation(format!("hidden node {id} has no way in"));
			}
			if let Some(&i) = incoming.iter().find(|&&i| !collapse.edges.contains(&self.edges[i].id)) {
				return violation(format!("hidden node {id} is still reachable over {}", self.edges[i].id));
			}
		}

		// every hidden node hangs below some collapsed parent
		let mut reached: HashSet<&str> = HashSet::new();
		let mut queue: VecDeque<&str> = collapse.parents.iter().map(String::as_str).collect();
		while let Some(id) = queue.pop_front() {
			for &i in self.adjacency.outgoing(id) {
				let edge = &self.edges[i];
				if collapse.edges.contains(&edge.id) && reached.insert(edge.to.as_str()) {
					queue.push_back(edge.to.as_str());
				}
			}
		}
		if let Some(orphan) = collapse.nodes.iter().find(|id| !reached.contains(id.as_str())) {
			return violation(format!("hidden node {orphan} is not below any collapsed parent"));
		}

		Ok(())
	}
}

/// Owns the graph and all derived interaction state.
pub struct TopologyEngine {
	options: EngineOptions,
	graph: Graph,
	/// Position of each node in `graph.nodes`.
	index: HashMap<NodeId, usize>,
	adjacency: Adjacency,
	fan_in: FrequencyMap,
	collapse: CollapseState,
	highlight: HighlightState,
	filter: Option<ActiveFilter>,
	detect_cycles: bool,
	selected: Option<NodeId>,
	locale: Option<String>,
	facets: Facets,
	source: Option<Source>,
	validator: Box<dyn NodeValidator>,
	listeners: Vec<Listener>,
	revision: u64,
}

impl fmt::Debug for TopologyEngine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TopologyEngine")
			.field("nodes", &self.graph.nodes.len())
			.field("edges", &self.graph.edges.len())
			.field("collapse", &self.collapse)
			.field("highlight", &self.highlight)
			.field("filter", &self.filter)
			.field("detect_cycles", &self.detect_cycles)
			.field("revision", &self.revision)
			.finish_non_exhaustive()
	}
}

impl Default for TopologyEngine {
	fn default() -> Self {
		Self::new(EngineOptions::default())
	}
}

impl TopologyEngine {
	/// An engine with an empty graph.
	pub fn new(options: EngineOptions) -> Self {
		Self {
			options,
			graph: Graph::new(),
			index: HashMap::new(),
			adjacency: Adjacency::default(),
			fan_in: FrequencyMap::new(),
			collapse: CollapseState::default(),
			highlight: HighlightState::default(),
			filter: None,
			detect_cycles: false,
			selected: None,
			locale: None,
			facets: Facets::default(),
			source: None,
			validator: Box::new(AcceptAll),
			listeners: Vec::new(),
			revision: 0,
		}
	}

	/// Replace the node validator. Takes effect on the next `set_graph`.
	pub fn with_validator(mut self, validator: impl NodeValidator + 'static) -> Self {
		self.validator = Box::new(validator);
		self
	}

	/// Register a listener for every published view.
	pub fn subscribe(&mut self, listener: impl FnMut(&TopologyView<'_>) + 'static) {
		self.listeners.push(Box::new(listener));
	}

	/// Replace the graph. Rejects duplicate node ids and dangling edges,
	/// keeping the previous graph. Duplicate edges collapse to one.
	pub fn set_graph(&mut self, mut graph: Graph) -> Result<(), GraphError> {
		if let Err(e) = validate_structure(&mut graph) {
			error!("topology: rejected graph: {e}");
			return Err(e);
		}
		for node in &mut graph.nodes {
			node.is_error = self.validator.is_error(node);
		}

		self.index = graph.nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();
		self.adjacency = Adjacency::new(&graph.edges);
		self.fan_in = count_incoming(&graph.edges);
		self.detect_cycles = detect_cycles_in(&graph.nodes, &graph.edges, &self.adjacency);
		self.graph = graph;
		self.collapse = CollapseState::default();
		self.highlight.clear();
		self.filter = None;
		self.selected = None;
		info!(
			"topology: loaded {} nodes, {} edges{}",
			self.graph.nodes.len(),
			self.graph.edges.len(),
			if self.detect_cycles { " (cyclic)" } else { "" }
		);

		if self.options.start_collapsed {
			self.fold_all();
		}
		self.publish();
		Ok(())
	}

	/// Parse and build a JSON document, coloring nodes by `categories`.
	///
	/// A malformed document publishes an empty graph and returns the error.
	pub fn load_document(
		&mut self,
		text: impl Into<String>,
		categories: CategoryMap,
		locale: Option<&str>,
	) -> Result<(), BuildError> {
		self.source = Some(Source::Document {
			text: text.into(),
			categories,
		});
		self.locale = locale.map(str::to_string);
		self.rebuild()
	}

	/// Build from item feed lines.
	pub fn load_feed<I, S>(&mut self, lines: I, context: FeedContext) -> Result<(), BuildError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.source = Some(Source::Feed {
			lines: lines.into_iter().map(Into::into).collect(),
			context,
		});
		self.rebuild()
	}

	/// Change the active locale and rebuild from the stored source.
	pub fn set_locale(&mut self, locale: Option<&str>) {
		self.locale = locale.map(str::to_string);
		if self.source.is_none() {
			debug!("topology: locale set with nothing to rebuild");
			return;
		}
		if let Err(e) = self.rebuild() {
			warn!("topology: rebuild for locale {locale:?} failed: {e}");
		}
	}

	fn rebuild(&mut self) -> Result<(), BuildError> {
		let Some(source) = self.source.clone() else {
			return Err(BuildError::NoSource);
		};
		let locale = self.locale.as_deref();
		let built = match &source {
			Source::Document { text, categories } => {
				builder::parse(text, categories, locale, &self.options.sizing).map(|mut graph| {
					assign_category_colors(&mut graph, categories, &self.options.palette);
					(graph, Facets::default())
				})
			}
			Source::Feed { lines, context } => {
				build_from_feed(lines, context, locale, &self.options.sizing, &self.options.palette)
					.map(|feed| (feed.graph, feed.facets))
			}
		};

		match built {
			Ok((graph, facets)) => {
				self.set_graph(graph)?;
				self.facets = facets;
				Ok(())
			}
			Err(e) => {
				warn!("topology: build failed: {e}");
				self.facets = Facets::default();
				// an empty graph cannot be structurally invalid
				let _ = self.set_graph(Graph::new());
				Err(e)
			}
		}
	}

	/// Fold the subtree below `id`. Nodes that keep another live parent stay visible.
	pub fn collapse(&mut self, id: &str) {
		match self.try_collapse(id) {
			Ok(true) => self.publish(),
			Ok(false) => debug!("topology: {id} is already collapsed"),
			Err(e) => warn!("topology: collapse {id} failed: {e}"),
		}
	}

	/// Reveal what collapsing `id` hid.
	pub fn expand(&mut self, id: &str) {
		match self.try_expand(id) {
			Ok(true) => self.publish(),
			Ok(false) => debug!("topology: {id} is not collapsed"),
			Err(e) => warn!("topology: expand {id} failed: {e}"),
		}
	}

	fn try_collapse(&mut self, id: &str) -> Result<bool, GraphError> {
		self.require_node(id)?;
		let folding = Folding {
			edges: &self.graph.edges,
			adjacency: &self.adjacency,
		};
		match folding.collapse(&self.collapse, &self.fan_in, id) {
			Some(delta) => self.commit(delta).map(|()| true),
			None => Ok(false),
		}
	}

	fn try_expand(&mut self, id: &str) -> Result<bool, GraphError> {
		self.require_node(id)?;
		let folding = Folding {
			edges: &self.graph.edges,
			adjacency: &self.adjacency,
		};
		match folding.expand(&self.collapse, &self.fan_in, id) {
			Some(delta) => self.commit(delta).map(|()| true),
			None => Ok(false),
		}
	}

	/// Apply `delta`, rolling it back if the result breaks an invariant.
	fn commit(&mut self, delta: CollapseDelta) -> Result<(), GraphError> {
		let undo = delta.apply(&mut self.collapse, &mut self.fan_in);
		if let Err(e) = self.check_invariants() {
			error!("topology: {e}; rolling back");
			undo.apply(&mut self.collapse, &mut self.fan_in);
			return Err(e);
		}
		Ok(())
	}

	/// Collapse every non-root node that has children. Roots and their
	/// immediate children stay visible.
	pub fn collapse_all(&mut self) {
		if self.fold_all() {
			self.publish();
		}
	}

	fn fold_all(&mut self) -> bool {
		let folding = Folding {
			edges: &self.graph.edges,
			adjacency: &self.adjacency,
		};
		let mut collapse = CollapseState::default();
		let mut fan_in = count_incoming(&self.graph.edges);
		for node in &self.graph.nodes {
			let id = node.id.as_str();
			let is_root = self.adjacency.incoming(id).is_empty();
			if is_root || self.adjacency.outgoing(id).is_empty() {
				continue;
			}
			if let Some(delta) = folding.collapse(&collapse, &fan_in, id) {
				delta.apply(&mut collapse, &mut fan_in);
			}
		}
		if let Err(e) = folding.verify(&self.graph.nodes, &collapse, &fan_in) {
			error!("topology: collapse all produced {e}; keeping current state");
			return false;
		}
		if collapse == self.collapse {
			return false;
		}
		debug!(
			"topology: collapsed {} parents, hiding {} nodes",
			collapse.parents.len(),
			collapse.nodes.len()
		);
		self.collapse = collapse;
		self.fan_in = fan_in;
		true
	}

	/// Clear every collapse.
	pub fn expand_all(&mut self) {
		if self.collapse.is_empty() {
			return;
		}
		self.collapse = CollapseState::default();
		self.fan_in = count_incoming(&self.graph.edges);
		self.publish();
	}

	/// Run the collapse and fan-in invariant check against current state.
	pub fn check_invariants(&self) -> Result<(), GraphError> {
		Folding {
			edges: &self.graph.edges,
			adjacency: &self.adjacency,
		}
		.verify(&self.graph.nodes, &self.collapse, &self.fan_in)
	}

	/// Highlight `id` and everything downstream over visible edges, replacing any
	/// active filter. Highlighting the same node again clears the highlight.
	pub fn set_highlight(&mut self, id: &str) {
		if let Err(e) = self.require_node(id) {
			warn!("topology: highlight failed: {e}");
			return;
		}
		if self.highlight.current_node.as_deref() == Some(id) {
			self.highlight.clear();
			self.publish();
			return;
		}

		let mut draft = FanInDraft::new(&self.fan_in);
		let ctx = WalkContext {
			edges: &self.graph.edges,
			adjacency: &self.adjacency,
			collapse: &self.collapse,
		};
		let walk = outgoers(ctx, id, WalkMode::Highlight, &mut draft);
		let mut nodes: HashSet<NodeId> = walk.nodes.into_iter().collect();
		nodes.insert(id.to_string());
		self.highlight = HighlightState {
			current_node: Some(id.to_string()),
			paths: walk.edges.into_iter().collect(),
			nodes,
		};
		self.filter = None;
		self.publish();
	}

	/// Highlight the nodes whose `kind` field equals `value`. `None`, `""` and
	/// `"all"` clear the filter; a value nothing matches highlights every node.
	pub fn set_filter_visibility(&mut self, value: Option<&str>, kind: FilterKind) {
		self.highlight.clear();
		match value {
			Some(value) if !clears_filter(Some(value)) => {
				let mut matches = matching_nodes(&self.graph.nodes, kind, value);
				if matches.is_empty() {
					debug!("topology: no node has {} = {value}, highlighting all", kind.field_key());
					matches = self.graph.nodes.iter().map(|n| n.id.clone()).collect();
				}
				self.highlight.nodes = matches.into_iter().collect();
				self.filter = Some(ActiveFilter {
					kind,
					value: value.to_string(),
				});
			}
			_ => self.filter = None,
		}
		self.publish();
	}

	/// Recompute the cycle flag over the full graph.
	pub fn detect_cycles_now(&mut self) -> bool {
		let found = detect_cycles_in(&self.graph.nodes, &self.graph.edges, &self.adjacency);
		if found != self.detect_cycles {
			self.detect_cycles = found;
			self.publish();
		}
		found
	}

	/// Select `id` for inspection, or clear the selection with `None`.
	pub fn select_node(&mut self, id: Option<&str>) -> Option<&Node> {
		match id {
			None => self.selected = None,
			Some(id) if self.index.contains_key(id) => self.selected = Some(id.to_string()),
			Some(id) => {
				warn!("topology: cannot select unknown node {id}");
				return None;
			}
		}
		self.publish();
		self.selected_node()
	}

	/// The current graph.
	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// All nodes, in graph order.
	pub fn nodes(&self) -> &[Node] {
		&self.graph.nodes
	}

	/// All edges, in graph order.
	pub fn edges(&self) -> &[Edge] {
		&self.graph.edges
	}

	/// Node by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.graph.nodes[i])
	}

	/// Live fan-in per node.
	pub fn fan_in(&self) -> &FrequencyMap {
		&self.fan_in
	}

	/// All three collapse sets.
	pub fn collapse_state(&self) -> &CollapseState {
		&self.collapse
	}

	/// Folded parents.
	pub fn collapsed_parents(&self) -> &HashSet<NodeId> {
		&self.collapse.parents
	}

	/// Hidden nodes.
	pub fn collapsed_nodes(&self) -> &HashSet<NodeId> {
		&self.collapse.nodes
	}

	/// Hidden edges.
	pub fn collapsed_edges(&self) -> &HashSet<EdgeId> {
		&self.collapse.edges
	}

	/// Whether any node is hidden.
	pub fn is_graph_collapsed(&self) -> bool {
		!self.collapse.nodes.is_empty()
	}

	/// Nodes not hidden by a collapse, in graph order.
	pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> {
		self.graph.nodes.iter().filter(|n| !self.collapse.nodes.contains(&n.id))
	}

	/// Edges not hidden by a collapse, in graph order.
	pub fn visible_edges(&self) -> impl Iterator<Item = &Edge> {
		self.graph.edges.iter().filter(|e| !self.collapse.edges.contains(&e.id))
	}

	/// Click highlight or filter matches.
	pub fn highlight(&self) -> &HighlightState {
		&self.highlight
	}

	/// Highlighted edges.
	pub fn highlighted_paths(&self) -> &HashSet<EdgeId> {
		&self.highlight.paths
	}

	/// Highlighted nodes.
	pub fn highlighted_nodes(&self) -> &HashSet<NodeId> {
		&self.highlight.nodes
	}

	/// Node of the click highlight.
	pub fn current_node(&self) -> Option<&str> {
		self.highlight.current_node.as_deref()
	}

	/// Active field filter.
	pub fn filter(&self) -> Option<&ActiveFilter> {
		self.filter.as_ref()
	}

	/// Cycle flag from the last detection run.
	pub fn has_cycles(&self) -> bool {
		self.detect_cycles
	}

	/// Node selected for inspection.
	pub fn selected_node(&self) -> Option<&Node> {
		self.selected.as_deref().and_then(|id| self.node(id))
	}

	/// Active locale.
	pub fn locale(&self) -> Option<&str> {
		self.locale.as_deref()
	}

	/// Filter menu values of the loaded feed.
	pub fn facets(&self) -> &Facets {
		&self.facets
	}

	/// Engine configuration.
	pub fn options(&self) -> &EngineOptions {
		&self.options
	}

	/// Number of views published so far.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Snapshot of everything a renderer needs.
	pub fn view(&self) -> TopologyView<'_> {
		TopologyView {
			revision: self.revision,
			nodes: &self.graph.nodes,
			edges: &self.graph.edges,
			detect_cycles: self.detect_cycles,
			highlighted_paths: &self.highlight.paths,
			highlighted_nodes: &self.highlight.nodes,
			current_node: self.highlight.current_node.as_deref(),
			collapsed_parents: &self.collapse.parents,
			collapsed_nodes: &self.collapse.nodes,
			collapsed_edges: &self.collapse.edges,
			graph_collapsed: self.is_graph_collapsed(),
			filter: self.filter.as_ref(),
			selected_node: self.selected.as_deref(),
		}
	}

	fn require_node(&self, id: &str) -> Result<(), GraphError> {
		if !self.index.contains_key(id) {
			return Err(GraphError::UnknownNode(id.to_string()));
		}
		Ok(())
	}

	fn publish(&mut self) {
		self.revision += 1;
		let mut listeners = std::mem::take(&mut self.listeners);
		let view = self.view();
		for listener in &mut listeners {
			listener(&view);
		}
		self.listeners = listeners;
	}
}

/// Reject duplicate node ids and dangling edges; drop duplicate edges.
fn validate_structure(graph: &mut Graph) -> Result<(), GraphError> {
	let mut ids: HashSet<&str> = HashSet::with_capacity(graph.nodes.len());
	for node in &graph.nodes {
		if !ids.insert(node.id.as_str()) {
			return Err(GraphError::DuplicateNode(node.id.clone()));
		}
	}
	for edge in &graph.edges {
		for endpoint in [&edge.from, &edge.to] {
			if !ids.contains(endpoint.as_str()) {
				return Err(GraphError::DanglingEdge {
					edge: edge.id.clone(),
					endpoint: endpoint.clone(),
				});
			}
		}
	}

	let before = graph.edges.len();
	let mut seen: HashSet<EdgeId> = HashSet::with_capacity(before);
	graph.edges.retain(|e| seen.insert(e.id.clone()));
	if graph.edges.len() < before {
		debug!("topology: dropped {} duplicate edges", before - graph.edges.len());
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::topology::types::{NodeKind, NodeText};
	use pretty_assertions::assert_eq;
	use std::cell::RefCell;
	use std::rc::Rc;

	fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
		Graph {
			nodes: ids
				.iter()
				.map(|id| Node::new(*id, NodeText::Scalar(id.to_string()), NodeKind::String))
				.collect(),
			edges: edges.iter().map(|(a, b)| Edge::new(*a, *b)).collect(),
			locale: None,
		}
	}

	fn set(ids: &[&str]) -> HashSet<String> {
		ids.iter().map(|s| s.to_string()).collect()
	}

	fn diamond() -> TopologyEngine {
		let mut engine = TopologyEngine::default();
		engine
			.set_graph(graph(
				&["root", "a", "b", "c"],
				&[("root", "a"), ("root", "b"), ("a", "c"), ("b", "c")],
			))
			.expect("graph");
		engine
	}

	#[test]
	fn rejects_dangling_edges_and_keeps_previous_graph() {
		let mut engine = diamond();
		let result = engine.set_graph(graph(&["x"], &[("x", "y")]));
		assert_eq!(
			result,
			Err(GraphError::DanglingEdge {
				edge: "ex-y".into(),
				endpoint: "y".into()
			})
		);
		assert_eq!(engine.nodes().len(), 4);

		let result = engine.set_graph(graph(&["x", "x"], &[]));
		assert_eq!(result, Err(GraphError::DuplicateNode("x".into())));
	}

	#[test]
	fn duplicate_edges_collapse_to_one() {
		let mut engine = TopologyEngine::default();
		engine.set_graph(graph(&["a", "b"], &[("a", "b"), ("a", "b")])).expect("graph");
		assert_eq!(engine.edges().len(), 1);
		assert_eq!(engine.fan_in()["b"].value, 1);
	}

	#[test]
	fn collapsing_a_shared_branch_keeps_the_shared_node() {
		let mut engine = diamond();
		engine.collapse("a");
		assert_eq!(engine.collapsed_parents(), &set(&["a"]));
		assert!(engine.collapsed_nodes().is_empty());
		assert_eq!(engine.collapsed_edges(), &set(&["ea-c"]));
		assert_eq!(engine.fan_in()["c"].parents, set(&["b"]));

		engine.collapse("b");
		assert_eq!(engine.collapsed_nodes(), &set(&["c"]));
		assert_eq!(engine.fan_in()["c"].value, 0);

		engine.expand("a");
		assert!(engine.collapsed_nodes().is_empty());
		assert_eq!(engine.collapsed_edges(), &set(&["eb-c"]));
		assert_eq!(engine.fan_in()["c"].parents, set(&["a"]));
		assert_eq!(engine.check_invariants(), Ok(()));
	}

	#[test]
	fn nested_collapse_survives_outer_expand() {
		let mut engine = TopologyEngine::default();
		engine
			.set_graph(graph(&["r", "a", "b", "c"], &[("r", "a"), ("a", "b"), ("b", "c")]))
			.expect("graph");
		engine.collapse("b");
		engine.collapse("r");
		assert_eq!(engine.collapsed_nodes(), &set(&["a", "b", "c"]));

		engine.expand("r");
		assert_eq!(engine.collapsed_parents(), &set(&["b"]));
		assert_eq!(engine.collapsed_nodes(), &set(&["c"]));
		assert_eq!(engine.collapsed_edges(), &set(&["eb-c"]));
	}

	#[test]
	fn collapsing_a_hidden_node_only_marks_it() {
		let mut engine = TopologyEngine::default();
		engine
			.set_graph(graph(&["r", "a", "b"], &[("r", "a"), ("a", "b")]))
			.expect("graph");
		engine.collapse("r");
		engine.collapse("a");
		assert_eq!(engine.collapsed_parents(), &set(&["r", "a"]));
		engine.expand("r");
		assert_eq!(engine.collapsed_nodes(), &set(&["b"]));
		assert_eq!(engine.check_invariants(), Ok(()));
	}

	#[test]
	fn collapse_all_keeps_roots_and_their_children() {
		let mut engine = TopologyEngine::default();
		engine
			.set_graph(graph(
				&["r", "a", "b", "c", "d"],
				&[("r", "a"), ("r", "b"), ("a", "c"), ("c", "d")],
			))
			.expect("graph");
		engine.collapse_all();
		assert_eq!(engine.collapsed_parents(), &set(&["a", "c"]));
		assert_eq!(engine.collapsed_nodes(), &set(&["c", "d"]));
		let visible: Vec<&str> = engine.visible_nodes().map(|n| n.id.as_str()).collect();
		assert_eq!(visible, vec!["r", "a", "b"]);
		assert!(engine.is_graph_collapsed());

		engine.expand_all();
		assert!(engine.collapse_state().is_empty());
		assert_eq!(engine.fan_in(), &count_incoming(engine.edges()));
	}

	#[test]
	fn unknown_nodes_leave_state_alone() {
		let mut engine = diamond();
		let revision = engine.revision();
		engine.collapse("nope");
		engine.expand("nope");
		engine.set_highlight("nope");
		assert_eq!(engine.revision(), revision);
		assert!(engine.collapse_state().is_empty());
	}

	#[test]
	fn highlight_includes_clicked_node_and_toggles() {
		let mut engine = diamond();
		engine.set_highlight("a");
		assert_eq!(engine.current_node(), Some("a"));
		assert_eq!(engine.highlighted_nodes(), &set(&["a", "c"]));
		assert_eq!(engine.highlighted_paths(), &set(&["ea-c"]));

		engine.set_highlight("a");
		assert_eq!(engine.current_node(), None);
		assert!(engine.highlighted_nodes().is_empty());
		assert!(engine.highlighted_paths().is_empty());
	}

	#[test]
	fn filter_clears_click_highlight() {
		let mut engine = diamond();
		engine.set_highlight("root");
		engine.set_filter_visibility(Some("blog"), FilterKind::ContentType);
		assert_eq!(engine.current_node(), None);
		assert!(engine.highlighted_paths().is_empty());
		assert_eq!(engine.highlighted_nodes().len(), 4);

		engine.set_filter_visibility(Some("all"), FilterKind::ContentType);
		assert!(engine.highlighted_nodes().is_empty());
		assert_eq!(engine.filter(), None);
	}

	#[test]
	fn click_highlight_replaces_filter() {
		let mut engine = diamond();
		engine.set_filter_visibility(Some("blog"), FilterKind::ContentType);
		assert!(engine.filter().is_some());

		engine.set_highlight("b");
		assert_eq!(engine.filter(), None);
		assert!(engine.view().filter.is_none());
		assert_eq!(engine.highlighted_nodes(), &set(&["b", "c"]));
	}

	#[test]
	fn listeners_see_settled_state() {
		let seen: Rc<RefCell<Vec<(u64, usize)>>> = Rc::default();
		let mut engine = diamond();
		let sink = Rc::clone(&seen);
		engine.subscribe(move |view| {
			sink.borrow_mut().push((view.revision, view.collapsed_edges.len()));
		});
		engine.collapse("root");
		engine.expand("root");
		let base = engine.revision() - 2;
		assert_eq!(*seen.borrow(), vec![(base + 1, 4), (base + 2, 0)]);
	}

	#[test]
	fn start_collapsed_folds_on_load() {
		let options = EngineOptions {
			start_collapsed: true,
			..Default::default()
		};
		let mut engine = TopologyEngine::new(options);
		engine
			.load_document(r#"{"a": {"b": {"c": 1}}}"#, CategoryMap::new(), None)
			.expect("load");
		assert!(engine.is_graph_collapsed());
		assert_eq!(engine.check_invariants(), Ok(()));
	}

	#[test]
	fn malformed_document_publishes_an_empty_graph() {
		let mut engine = diamond();
		let result = engine.load_document("{oops", CategoryMap::new(), None);
		assert!(matches!(result, Err(BuildError::Parse(_))));
		assert!(engine.graph().is_empty());
		assert!(!engine.has_cycles());
	}

	#[test]
	fn validator_marks_errors() {
		let mut engine = TopologyEngine::default().with_validator(|n: &Node| n.id == "b");
		engine.set_graph(graph(&["a", "b"], &[("a", "b")])).expect("graph");
		let flagged: Vec<&str> = engine.nodes().iter().filter(|n| n.is_error).map(|n| n.id.as_str()).collect();
		assert_eq!(flagged, vec!["b"]);
	}

	#[test]
	fn selection_is_cleared_on_rebuild() {
		let mut engine = diamond();
		assert_eq!(engine.select_node(Some("a")).map(|n| n.id.as_str()), Some("a"));
		assert!(engine.select_node(Some("zzz")).is_none());
		assert_eq!(engine.selected_node().map(|n| n.id.as_str()), Some("a"));
		engine.set_graph(graph(&["a"], &[])).expect("graph");
		assert!(engine.selected_node().is_none());
	}
}
