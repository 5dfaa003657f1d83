//! Node validation: decides which nodes are flagged `is_error`.

use super::types::{Node, NodeText};

/// Decides whether a node is in error. Runs once per node when a graph is set.
pub trait NodeValidator {
	fn is_error(&self, node: &Node) -> bool;
}

/// Flags nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl NodeValidator for AcceptAll {
	fn is_error(&self, _node: &Node) -> bool {
		false
	}
}

/// Flags field nodes that lack any of the listed keys, or carry them empty.
/// Nodes without field rows are never flagged.
#[derive(Clone, Debug, Default)]
pub struct RequiredFields {
	/// Row keys every field node must carry.
	pub keys: Vec<String>,
}

impl RequiredFields {
	/// Require `keys`.
	pub fn new<I, S>(keys: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			keys: keys.into_iter().map(Into::into).collect(),
		}
	}
}

impl NodeValidator for RequiredFields {
	fn is_error(&self, node: &Node) -> bool {
		match &node.text {
			NodeText::Scalar(_) => false,
			text @ NodeText::Fields(_) => self
				.keys
				.iter()
				.any(|key| text.field(key).is_none_or(str::is_empty)),
		}
	}
}

impl<F> NodeValidator for F
where
	F: Fn(&Node) -> bool,
{
	fn is_error(&self, node: &Node) -> bool {
		self(node)
	}
}
