//! Tree-to-graph builder for JSON documents.
//!
//! A depth-first walk over the parsed document. Each object's scalar fields are
//! merged into one multi-row node; every array- or object-valued property gets
//! a key node of its own, and the container's content hangs below it. Array
//! elements attach to whatever the array itself attaches to, so nested arrays
//! flatten into compound index paths. An empty object or array element gets a
//! `{}` or `[]` placeholder node.
//!
//! Ids are sequence numbers in document order, which keeps them stable across
//! rebuilds of the same document.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde_json::Value;

use super::path::{NodePath, PathSegment};
use super::size::SizeConfig;
use super::theme::CategoryMap;
use super::types::{Edge, Graph, Node, NodeId, NodeKind, NodeText};
use crate::error::BuildError;

/// Build a graph from `document` with default sizing.
///
/// `references` is reserved for cross-document reference resolution and is
/// not read during traversal. `locale` is recorded on the graph.
pub fn build(document: &Value, references: &CategoryMap, locale: Option<&str>) -> Graph {
	build_with(document, references, locale, &SizeConfig::default())
}

/// [`build`] with explicit sizing.
pub fn build_with(
	document: &Value,
	_references: &CategoryMap,
	locale: Option<&str>,
	sizing: &SizeConfig,
) -> Graph {
	let mut builder = GraphBuilder::new(sizing);
	builder.traverse(document);
	let mut graph = builder.finish(document);
	graph.locale = locale.map(str::to_string);
	debug!("built graph: {} nodes, {} edges", graph.nodes.len(), graph.edges.len());
	graph
}

/// Parse `text` as JSON and build its graph.
pub fn parse(
	text: &str,
	references: &CategoryMap,
	locale: Option<&str>,
	sizing: &SizeConfig,
) -> Result<Graph, BuildError> {
	let document: Value = serde_json::from_str(text)?;
	Ok(build_with(&document, references, locale, sizing))
}

/// Where a node hangs: its graph parent (if any) and its path relative to it.
#[derive(Clone, Debug, Default)]
struct Attach {
	parent: Option<NodeId>,
	segments: Vec<PathSegment>,
}

impl Attach {
	fn under(parent: NodeId) -> Self {
		Self {
			parent: Some(parent),
			segments: Vec::new(),
		}
	}

	fn child(&self, segment: PathSegment) -> Self {
		let mut segments = self.segments.clone();
		segments.push(segment);
		Self {
			parent: self.parent.clone(),
			segments,
		}
	}
}

enum Task<'v> {
	Value(&'v Value, Attach),
	/// A container-valued object property: key node first, then its content.
	Property(&'v str, &'v Value, Attach),
	/// An array element with no entries.
	Placeholder(&'v Value, Attach),
}

struct GraphBuilder<'a> {
	sizing: &'a SizeConfig,
	graph: Graph,
	next_id: usize,
	not_have_parent: Vec<NodeId>,
	segments: HashMap<NodeId, Vec<PathSegment>>,
}

impl<'a> GraphBuilder<'a> {
	fn new(sizing: &'a SizeConfig) -> Self {
		Self {
			sizing,
			graph: Graph::new(),
			next_id: 0,
			not_have_parent: Vec::new(),
			segments: HashMap::new(),
		}
	}

	fn add_node(&mut self, text: NodeText, kind: NodeKind, is_empty: bool, attach: Attach) -> NodeId {
		self.next_id += 1;
		let id = self.next_id.to_string();
		let mut node = Node::new(id.clone(), text, kind);
		node.is_empty = is_empty;
		self.sizing.apply(&mut node);
		self.graph.nodes.push(node);
		self.segments.insert(id.clone(), attach.segments);
		// each node is attached once, so edges cannot repeat
		match attach.parent {
			Some(parent) => self.graph.edges.push(Edge::new(parent, id.clone())),
			None => self.not_have_parent.push(id.clone()),
		}
		id
	}

	fn traverse(&mut self, root: &Value) {
		let mut stack = vec![Task::Value(root, Attach::default())];
		while let Some(task) = stack.pop() {
			match task {
				Task::Value(Value::Object(map), attach) => {
					let rows: Vec<(String, String)> = map
						.iter()
						.filter(|(_, v)| !is_container(v))
						.map(|(k, v)| (k.clone(), render_scalar(v)))
						.collect();
					let base = if rows.is_empty() {
						attach
					} else {
						Attach::under(self.add_node(NodeText::Fields(rows), NodeKind::Null, false, attach))
					};
					let nested: Vec<_> = map.iter().filter(|(_, v)| is_container(v)).collect();
					for (key, value) in nested.into_iter().rev() {
						stack.push(Task::Property(key, value, base.child(PathSegment::Key(key.clone()))));
					}
				}
				Task::Value(Value::Array(items), attach) => {
					for (i, item) in items.iter().enumerate().rev() {
						let attach = attach.child(PathSegment::Index(i));
						if container_is_empty(item) {
							stack.push(Task::Placeholder(item, attach));
						} else {
							stack.push(Task::Value(item, attach));
						}
					}
				}
				Task::Value(scalar, attach) => {
					self.add_node(NodeText::Scalar(render_scalar(scalar)), kind_of(scalar), false, attach);
				}
				Task::Property(key, value, attach) => {
					let id = self.add_node(
						NodeText::Scalar(key.to_string()),
						kind_of(value),
						container_is_empty(value),
						attach,
					);
					stack.push(Task::Value(value, Attach::under(id)));
				}
				Task::Placeholder(value, attach) => {
					self.add_node(placeholder_text(value), NodeKind::Null, true, attach);
				}
			}
		}
	}

	fn finish(mut self, document: &Value) -> Graph {
		if self.graph.nodes.is_empty() {
			self.add_node(placeholder_text(document), NodeKind::Null, true, Attach::default());
		}

		if self.not_have_parent.len() > 1 && !document.is_array() {
			let orphans = std::mem::take(&mut self.not_have_parent);
			let root = self.add_node(NodeText::default(), NodeKind::Null, true, Attach::default());
			for orphan in orphans {
				self.graph.edges.push(Edge::new(root.clone(), orphan));
			}
		}

		let mut children: HashMap<&str, usize> = HashMap::new();
		let mut parent_of: HashMap<&str, &str> = HashMap::new();
		for edge in &self.graph.edges {
			*children.entry(edge.from.as_str()).or_insert(0) += 1;
			parent_of.entry(edge.to.as_str()).or_insert(edge.from.as_str());
		}

		let derived: Vec<(usize, NodePath)> = self
			.graph
			.nodes
			.iter()
			.map(|node| {
				let count = children.get(node.id.as_str()).copied().unwrap_or(0);
				(count, path_to(&node.id, &parent_of, &self.segments))
			})
			.collect();
		for (node, (count, path)) in self.graph.nodes.iter_mut().zip(derived) {
			node.children_count = count;
			node.path = Some(path);
		}

		self.graph
	}
}

/// Concatenate relative segments from the root down to `id`.
fn path_to(id: &str, parent_of: &HashMap<&str, &str>, segments: &HashMap<NodeId, Vec<PathSegment>>) -> NodePath {
	let mut chain = Vec::new();
	let mut seen = HashSet::new();
	let mut current = Some(id);
	while let Some(id) = current {
		if !seen.insert(id) {
			break;
		}
		chain.push(id);
		current = parent_of.get(id).copied();
	}
	NodePath(
		chain
			.iter()
			.rev()
			.flat_map(|id| segments.get(*id).into_iter().flatten().cloned())
			.collect(),
	)
}

fn is_container(value: &Value) -> bool {
	matches!(value, Value::Array(_) | Value::Object(_))
}

/// `[]` for an array, `{}` for anything else.
fn placeholder_text(value: &Value) -> NodeText {
	let text = if value.is_array() { "[]" } else { "{}" };
	NodeText::Scalar(text.to_string())
}

fn container_is_empty(value: &Value) -> bool {
	match value {
		Value::Array(items) => items.is_empty(),
		Value::Object(map) => map.is_empty(),
		_ => false,
	}
}

/// The JSON kind of `value`.
pub fn kind_of(value: &Value) -> NodeKind {
	match value {
		Value::Null => NodeKind::Null,
		Value::Bool(_) => NodeKind::Boolean,
		Value::Number(_) => NodeKind::Number,
		Value::String(_) => NodeKind::String,
		Value::Array(_) => NodeKind::Array,
		Value::Object(_) => NodeKind::Object,
	}
}

/// Display text for a scalar: strings verbatim, everything else as JSON.
pub fn render_scalar(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
