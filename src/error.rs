//! Error types for graph building and topology maintenance.

use thiserror::Error;

use crate::topology::{EdgeId, NodeId};

/// Failure to turn a source into a graph.
#[derive(Debug, Error)]
pub enum BuildError {
	/// The document text is not JSON.
	#[error("document is not valid JSON: {0}")]
	Parse(#[from] serde_json::Error),

	/// A feed line is not an item page.
	#[error("feed line {line} is not a valid item page: {source}")]
	FeedLine {
		/// 1-based line number.
		line: usize,
		/// Underlying parse failure.
		#[source]
		source: serde_json::Error,
	},

	/// The graph was built but the engine refused it.
	#[error("built graph was rejected: {0}")]
	Graph(#[from] GraphError),

	/// Rebuild requested before anything was loaded.
	#[error("no source loaded to rebuild from")]
	NoSource,
}

/// Structural or state inconsistency in the topology.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
	/// Two nodes share an id.
	#[error("duplicate node id '{0}'")]
	DuplicateNode(NodeId),

	/// An edge endpoint is not a node of the graph.
	#[error("edge '{edge}' references missing node '{endpoint}'")]
	DanglingEdge {
		/// Offending edge.
		edge: EdgeId,
		/// The endpoint that does not exist.
		endpoint: NodeId,
	},

	/// An operation named a node the graph does not have.
	#[error("unknown node '{0}'")]
	UnknownNode(NodeId),

	/// Collapse sets and fan-in disagree.
	#[error("collapse invariant violated: {0}")]
	Invariant(String),
}
