//! Graph topology for nested JSON documents.
//!
//! Builds a display graph from a document (or an item feed) and keeps it
//! consistent under collapse, expand, highlight and filter operations.
//!
//! # Usage
//!
//! ```
//! use json_topology::topology::{CategoryMap, TopologyEngine};
//!
//! let mut engine = TopologyEngine::default();
//! engine
//! 	.load_document(r#"{"name": "basket", "fruits": ["apple", "pear"]}"#, CategoryMap::new(), None)
//! 	.unwrap();
//!
//! // "name" fields, the "fruits" key node, and one node per fruit
//! assert_eq!(engine.nodes().len(), 4);
//!
//! engine.collapse("2");
//! assert_eq!(engine.visible_nodes().count(), 2);
//!
//! engine.expand("2");
//! assert!(!engine.is_graph_collapsed());
//! ```
//!
//! # Modules
//!
//! - [`builder`] and [`items`]: sources to [`Graph`]
//! - [`size`] and [`theme`]: node dimensions and category colors
//! - [`fan_in`], [`walk`] and [`cycles`]: the graph algorithms
//! - [`state`]: the [`TopologyEngine`] that owns everything at runtime

pub mod builder;
pub mod cycles;
pub mod fan_in;
pub mod filter;
pub mod items;
pub mod path;
pub mod size;
pub mod state;
pub mod theme;
pub mod types;
pub mod validate;
pub mod walk;

pub use builder::{build, build_with, parse};
pub use cycles::detect_cycles;
pub use fan_in::{FanIn, FrequencyMap, count_incoming};
pub use filter::{ActiveFilter, FilterKind};
pub use items::{Facets, FeedContext, FeedGraph, Item, build_from_feed};
pub use path::{NodePath, PathSegment};
pub use size::{NodeSize, SizeConfig};
pub use state::{CollapseState, EngineOptions, HighlightState, Listener, TopologyEngine, TopologyView};
pub use theme::{CategoryMap, Color, NodePalette, assign_category_colors};
pub use types::{ColorPair, Edge, EdgeId, Graph, Node, NodeId, NodeKind, NodeText};
pub use validate::{AcceptAll, NodeValidator, RequiredFields};
pub use walk::{Walk, WalkMode};
