//! Graph data structures shared by the builders, the engine and the renderer.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::path::NodePath;

/// Opaque node identity. Unique within a graph and stable for the node's lifetime.
pub type NodeId = String;

/// Edge identity, derived from the ordered `(from, to)` pair.
pub type EdgeId = String;

/// The JSON type a node stands for.
///
/// Field groups (merged scalar fields of one object) and the synthetic empty
/// root carry no single JSON type and use [`NodeKind::Null`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	/// `null`, field groups and the synthetic root.
	#[default]
	Null,
	/// `true` or `false`.
	Boolean,
	/// A JSON number.
	Number,
	/// A JSON string.
	String,
	/// An array.
	Array,
	/// An object.
	Object,
	/// A free-standing text label (e.g. a variant name).
	Text,
}

impl NodeKind {
	/// Array and object nodes are parents: they label a container.
	pub fn is_parent(self) -> bool {
		matches!(self, NodeKind::Array | NodeKind::Object)
	}
}

/// What a node displays: one string, or an ordered list of key/value rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeText {
	/// A single line of text.
	Scalar(String),
	/// `(key, value)` rows; a heading row has an empty value.
	Fields(Vec<(String, String)>),
}

impl NodeText {
	/// Length used for sizing: characters for a scalar, rows for a field list.
	pub fn len(&self) -> usize {
		match self {
			NodeText::Scalar(s) => s.chars().count(),
			NodeText::Fields(rows) => rows.len(),
		}
	}

	/// No characters or no rows.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Value of the first row whose key equals `key`.
	pub fn field(&self, key: &str) -> Option<&str> {
		match self {
			NodeText::Scalar(_) => None,
			NodeText::Fields(rows) => rows
				.iter()
				.find(|(k, _)| k == key)
				.map(|(_, v)| v.as_str()),
		}
	}
}

impl Default for NodeText {
	fn default() -> Self {
		NodeText::Scalar(String::new())
	}
}

impl fmt::Display for NodeText {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NodeText::Scalar(s) => f.write_str(s),
			NodeText::Fields(rows) => {
				for (i, (k, v)) in rows.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					if v.is_empty() {
						f.write_str(k)?;
					} else {
						write!(f, "{k}: {v}")?;
					}
				}
				Ok(())
			}
		}
	}
}

/// Fill color and a contrasting foreground, both as CSS hex strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
	/// Background.
	pub fill: String,
	/// Text drawn on the fill.
	pub foreground: String,
}

/// A display node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
	/// Unique id.
	pub id: NodeId,
	/// What the node displays.
	pub text: NodeText,
	/// Derived by the sizer; the layout engine treats it as ground truth.
	pub width: f64,
	/// Derived by the sizer.
	pub height: f64,
	/// Dereferencing path from the document root. Recomputed on every build.
	pub path: Option<NodePath>,
	/// JSON type the node stands for.
	pub kind: NodeKind,
	/// Labels an array or object.
	pub is_parent: bool,
	/// An empty container, placeholder or the synthetic root.
	pub is_empty: bool,
	/// Number of outgoing edges.
	pub children_count: usize,
	/// Category color, when the node has a category.
	pub color: Option<ColorPair>,
	/// Flagged by the node validator.
	pub is_error: bool,
}

impl Node {
	/// A node of `kind` showing `text`. Size and path are filled in by the builder.
	pub fn new(id: impl Into<NodeId>, text: NodeText, kind: NodeKind) -> Self {
		Self {
			id: id.into(),
			text,
			kind,
			is_parent: kind.is_parent(),
			..Default::default()
		}
	}
}

/// A directed edge between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
	/// `e{from}-{to}`.
	pub id: EdgeId,
	/// Source node.
	pub from: NodeId,
	/// Target node.
	pub to: NodeId,
}

impl Edge {
	/// Builds the edge, deriving its id from the endpoints so duplicates share one identity.
	pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
		let (from, to) = (from.into(), to.into());
		Self {
			id: edge_id(&from, &to),
			from,
			to,
		}
	}
}

/// Deterministic edge id for the ordered pair `(from, to)`.
pub fn edge_id(from: &str, to: &str) -> EdgeId {
	format!("e{from}-{to}")
}

/// Complete graph data: nodes and edges, plus the locale it was built for.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
	/// Nodes in build order.
	pub nodes: Vec<Node>,
	/// Edges in build order.
	pub edges: Vec<Edge>,
	/// Locale the graph was built for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locale: Option<String>,
}

impl Graph {
	/// An empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// No nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Node by id. A linear scan; the engine keeps an index for repeated lookups.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Mutable node by id. A linear scan.
	pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	/// Adds an edge unless one with the same id already exists. Returns whether it was added.
	///
	/// Checks every existing edge; builders that add many edges track ids themselves.
	pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
		let edge = Edge::new(from, to);
		if self.edges.iter().any(|e| e.id == edge.id) {
			return false;
		}
		self.edges.push(edge);
		true
	}
}
