//! End-to-end scenarios against the topology engine.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use json_topology::topology::items::FeedContext;
use json_topology::topology::{
	CategoryMap, Edge, EngineOptions, FilterKind, Graph, Node, NodeKind, NodeText, TopologyEngine,
};
use json_topology::{BuildError, GraphError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

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

fn engine_with(g: Graph) -> TopologyEngine {
	let mut engine = TopologyEngine::default();
	engine.set_graph(g).expect("valid graph");
	engine
}

fn ids(set: &HashSet<String>) -> Vec<&str> {
	let mut ids: Vec<&str> = set.iter().map(String::as_str).collect();
	ids.sort();
	ids
}

fn diamond() -> TopologyEngine {
	engine_with(graph(
		&["root", "A", "B", "C"],
		&[("root", "A"), ("root", "B"), ("A", "C"), ("B", "C")],
	))
}

#[test]
fn empty_object_and_array_documents() {
	let mut engine = TopologyEngine::default();
	engine.load_document("{}", CategoryMap::new(), None).expect("load");
	assert_eq!(engine.nodes().len(), 1);
	assert_eq!(engine.nodes()[0].text, NodeText::Scalar("{}".into()));
	assert!(engine.edges().is_empty());

	engine.load_document("[]", CategoryMap::new(), None).expect("load");
	assert_eq!(engine.nodes().len(), 1);
	assert_eq!(engine.nodes()[0].text, NodeText::Scalar("[]".into()));
	assert!(engine.edges().is_empty());
}

#[test]
fn paths_dereference_to_node_values() {
	let text = r#"{
		"store": "corner shop",
		"opening hours": {"mon": "9-5", "sun": null},
		"shelves": [
			{"label": "fruit", "items": ["apple", "pear"]},
			[true, 3]
		]
	}"#;
	let document: Value = serde_json::from_str(text).expect("json");
	let mut engine = TopologyEngine::default();
	engine.load_document(text, CategoryMap::new(), None).expect("load");

	let by_path = |p: &str| {
		engine
			.nodes()
			.iter()
			.find(|n| n.path.as_ref().map(ToString::to_string).as_deref() == Some(p))
			.map(|n| n.text.to_string())
	};
	assert_eq!(by_path(r#"$["opening hours"]"#), Some("opening hours".into()));
	assert_eq!(by_path("$.shelves[0].items[1]"), Some("pear".into()));
	assert_eq!(by_path("$.shelves[1][0]"), Some("true".into()));

	for node in engine.nodes() {
		let path = node.path.as_ref().expect("every document node has a path");
		let value = path.resolve(&document).expect("path resolves");
		match &node.text {
			NodeText::Fields(rows) => {
				let object = value.as_object().expect("field groups point at objects");
				for (key, rendered) in rows {
					let field = object.get(key).expect("field present");
					let expected = match field {
						Value::String(s) => s.clone(),
						other => other.to_string(),
					};
					assert_eq!(&expected, rendered);
				}
			}
			NodeText::Scalar(text) if node.is_parent => {
				assert!(value.is_array() || value.is_object());
				assert!(path.to_string().ends_with(text.as_str()) || path.to_string().ends_with(&format!("{text:?}]")));
			}
			NodeText::Scalar(text) => {
				let expected = match value {
					Value::String(s) => s.clone(),
					other => other.to_string(),
				};
				assert_eq!(&expected, text);
			}
		}
	}
}

#[test]
fn shared_node_safety_on_a_diamond() {
	let mut engine = diamond();
	engine.collapse("A");
	assert!(engine.collapsed_nodes().is_empty(), "C keeps its live parent B");
	assert_eq!(ids(engine.collapsed_edges()), vec!["eA-C"]);
	engine.expand("A");

	engine.collapse("root");
	assert_eq!(ids(engine.collapsed_nodes()), vec!["A", "B", "C"]);
	let visible: Vec<&str> = engine.visible_nodes().map(|n| n.id.as_str()).collect();
	assert_eq!(visible, vec!["root"]);
	assert_eq!(engine.visible_edges().count(), 0);
}

#[test]
fn collapse_then_expand_restores_state() {
	let mut engine = engine_with(graph(
		&["r", "a", "b", "c", "d", "e"],
		&[("r", "a"), ("r", "b"), ("a", "c"), ("b", "c"), ("c", "d"), ("a", "e")],
	));
	engine.collapse("b");
	let collapse = engine.collapse_state().clone();
	let fan_in = engine.fan_in().clone();

	for id in ["r", "a", "c"] {
		engine.collapse(id);
		engine.expand(id);
		assert_eq!(engine.collapse_state(), &collapse, "collapse/expand of {id}");
		assert_eq!(engine.fan_in(), &fan_in, "fan-in after {id}");
	}
}

#[test]
fn fan_in_stays_consistent() {
	let mut engine = diamond();
	for id in ["A", "root", "B", "A", "root", "C", "B"] {
		engine.collapse(id);
		engine.expand(if id == "root" { "A" } else { "root" });
		for (node, record) in engine.fan_in() {
			assert_eq!(record.value, record.parents.len(), "fan-in of {node}");
		}
		assert_eq!(engine.check_invariants(), Ok(()));
	}
}

#[test]
fn cycle_detection() {
	let cyclic = engine_with(graph(&["1", "2", "3"], &[("1", "2"), ("2", "3"), ("3", "1")]));
	assert!(cyclic.has_cycles());

	let dag = engine_with(graph(&["1", "2", "3", "4"], &[("1", "2"), ("1", "3"), ("2", "4"), ("3", "4")]));
	assert!(!dag.has_cycles());
}

#[test]
fn cyclic_graphs_stay_navigable() {
	let mut engine = engine_with(graph(&["1", "2", "3"], &[("1", "2"), ("2", "3"), ("3", "1")]));
	engine.collapse("1");
	assert_eq!(ids(engine.collapsed_nodes()), vec!["2", "3"]);
	assert_eq!(engine.check_invariants(), Ok(()));
	// cycle detection ignores collapse state
	assert!(engine.detect_cycles_now());

	engine.expand("1");
	assert!(engine.collapse_state().is_empty());
	assert_eq!(engine.fan_in()["1"].value, 1);
}

#[test]
fn highlight_toggle() {
	let mut engine = diamond();
	engine.set_highlight("A");
	assert_eq!(engine.current_node(), Some("A"));
	assert_eq!(ids(engine.highlighted_nodes()), vec!["A", "C"]);
	assert_eq!(ids(engine.highlighted_paths()), vec!["eA-C"]);

	engine.set_highlight("A");
	assert_eq!(engine.current_node(), None);
	assert!(engine.highlighted_nodes().is_empty());
	assert!(engine.highlighted_paths().is_empty());
}

#[test]
fn highlight_skips_collapsed_parts() {
	let mut engine = engine_with(graph(&["r", "a", "b"], &[("r", "a"), ("a", "b")]));
	engine.collapse("a");
	engine.set_highlight("r");
	assert_eq!(ids(engine.highlighted_nodes()), vec!["a", "r"]);
	assert_eq!(ids(engine.highlighted_paths()), vec!["er-a"]);
}

const FEED: [&str; 2] = [
	r#"{"items":[{"uid":"e1","title":"Post","locale":"en-us","fallback_locale":null,"content_type_uid":"blog","workflow_stage":"review","references":[{"uid":"e2"}]},{"uid":"e1","title":"Billet","locale":"fr-fr","fallback_locale":"en-us","content_type_uid":"blog"}]}"#,
	r#"{"items":[{"uid":"e2","title":"Ann","locale":"en-us","fallback_locale":null,"content_type_uid":"author"}]}"#,
];

fn feed_engine() -> TopologyEngine {
	let mut engine = TopologyEngine::default();
	engine
		.load_feed(FEED, FeedContext {
			entry_uid: "e1".into(),
		})
		.expect("feed");
	engine
}

#[test]
fn filter_highlights_matching_records() {
	let mut engine = feed_engine();
	engine.set_filter_visibility(Some("author"), FilterKind::ContentType);
	let matched: Vec<String> = engine
		.highlighted_nodes()
		.iter()
		.filter_map(|id| engine.node(id))
		.map(|n| n.text.to_string())
		.collect();
	assert_eq!(matched, vec!["Master Locale, Ann, locale: en-us, content_type_uid: author"]);

	engine.set_filter_visibility(Some("review"), FilterKind::WorkflowStage);
	assert_eq!(engine.highlighted_nodes().len(), 1);
	assert_eq!(engine.filter().map(|f| f.kind), Some(FilterKind::WorkflowStage));
}

#[test]
fn filter_without_matches_highlights_everything() {
	let mut engine = feed_engine();
	engine.set_filter_visibility(Some("no-such-type"), FilterKind::ContentType);
	assert_eq!(engine.highlighted_nodes().len(), engine.nodes().len());

	engine.set_filter_visibility(None, FilterKind::ContentType);
	assert!(engine.highlighted_nodes().is_empty());
	assert!(engine.filter().is_none());
}

#[test]
fn locale_change_rebuilds_from_the_feed() {
	let mut engine = feed_engine();
	let all = engine.nodes().len();
	assert!(engine.facets().locales.contains("fr-fr"));

	engine.collapse("1");
	engine.set_locale(Some("de-de"));
	assert_eq!(engine.locale(), Some("de-de"));
	assert!(engine.nodes().len() < all);
	assert!(engine.nodes().iter().all(|n| n.text.field("locale") != Some("fr-fr")));
	assert!(engine.collapse_state().is_empty(), "rebuild resets collapse state");
	assert!(engine.facets().locales.contains("fr-fr"), "facets still list every locale");

	engine.set_locale(Some("all"));
	assert_eq!(engine.nodes().len(), all);
}

#[test]
fn bad_feed_line_is_reported() {
	let mut engine = feed_engine();
	let result = engine.load_feed(["{\"items\": [}"], FeedContext::default());
	assert!(matches!(result, Err(BuildError::FeedLine { line: 1, .. })));
	assert!(engine.graph().is_empty());
}

#[test]
fn rejected_graph_keeps_the_previous_one() {
	let mut engine = diamond();
	let revision = engine.revision();
	let result = engine.set_graph(graph(&["x"], &[("x", "ghost")]));
	assert!(matches!(result, Err(GraphError::DanglingEdge { .. })));
	assert_eq!(engine.nodes().len(), 4);
	assert_eq!(engine.revision(), revision);
}

#[test]
fn category_colors_apply_to_documents() {
	let categories: CategoryMap = [("1", "blog"), ("3", "blog"), ("2", "author")]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	let mut engine = TopologyEngine::default();
	engine
		.load_document(r#"{"title": "x", "tags": ["a"]}"#, categories, None)
		.expect("load");
	let color = |id: &str| engine.node(id).and_then(|n| n.color.clone());
	assert_eq!(color("1"), color("3"));
	assert_ne!(color("1"), color("2"));
	assert!(color("1").is_some());
}

#[test]
fn views_serialize_for_the_renderer() {
	let published: Rc<RefCell<Vec<Value>>> = Rc::default();
	let mut engine = TopologyEngine::new(EngineOptions::default());
	let sink = Rc::clone(&published);
	engine.subscribe(move |view| {
		sink.borrow_mut().push(serde_json::to_value(view).expect("view serializes"));
	});
	engine.load_document(r#"{"a": [1]}"#, CategoryMap::new(), None).expect("load");
	engine.collapse("1");

	let views = published.borrow();
	assert_eq!(views.len(), 2);
	let last = &views[1];
	assert_eq!(last["collapsedNodes"], json!(["2"]));
	assert_eq!(last["graphCollapsed"], json!(true));
	assert_eq!(last["detectCycles"], json!(false));
	assert_eq!(last["nodes"][0]["isParent"], json!(true));
}

#[test]
fn wide_documents_stay_interactive() {
	let n = 20_000;
	let text = json!({"items": (0..n).map(|i| json!({"i": i})).collect::<Vec<_>>()}).to_string();
	let mut engine = TopologyEngine::default();
	engine.load_document(text, CategoryMap::new(), None).expect("load");
	assert_eq!(engine.nodes().len(), n + 1);

	engine.collapse("1");
	assert_eq!(engine.collapsed_nodes().len(), n);
	assert_eq!(engine.visible_nodes().count(), 1);

	engine.expand("1");
	let last = (n + 1).to_string();
	let selected = engine.select_node(Some(&last)).map(|node| node.text.to_string());
	assert_eq!(selected, Some(format!("i: {}", n - 1)));
	assert_eq!(engine.node(&last).map(|node| node.children_count), Some(0));
}
