//! json-topology: graph topology engine for nested JSON documents.
//!
//! This crate turns a JSON document into a flat graph of display nodes and
//! edges and maintains it under interactive operations: fan-in aware
//! collapse/expand, cycle detection, path highlighting and field filtering.
//! Drawing the graph is left to the embedding renderer, which reads the
//! published [`TopologyView`] after every operation.

pub mod error;
pub mod topology;

pub use error::{BuildError, GraphError};
pub use topology::{
	CategoryMap, EngineOptions, FilterKind, Graph, Node, NodeKind, NodeText, TopologyEngine, TopologyView,
};

#[cfg(test)]
use proptest as _;

/// Initialize logging and panic hooks for the WASM target.
///
/// Elsewhere this does nothing; install a `log` backend in the host binary.
pub fn init_logging() {
	#[cfg(target_arch = "wasm32")]
	{
		let _ = console_log::init_with_level(log::Level::Debug);
		console_error_panic_hook::set_once();
		log::info!("json-topology: logging initialized");
	}
}
