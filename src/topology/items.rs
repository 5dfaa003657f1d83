//! Graph builder for item feeds: newline-delimited pages of CMS records.
//!
//! Each line is `{"items": [...]}`. Records describe one entry in one locale
//! and variant; the graph groups them under the entry's master record:
//!
//! ```text
//! master ── localised_entries ── localised record
//!        ├─ variants ── variant name ── variant record
//!        └─ "blog -> author" ── referenced entry's master
//! ```
//!
//! Records arrive in no particular order, so edges out of a master record are
//! resolved once the whole feed has been read.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use super::size::SizeConfig;
use super::theme::{CategoryColors, Color, NodePalette};
use super::types::{ColorPair, Edge, EdgeId, Graph, Node, NodeId, NodeKind, NodeText};
use crate::error::BuildError;

/// Variant uid of an entry's default variant.
pub const BASE_VARIANT: &str = "base_variant";

/// Category used to color variant name nodes.
const VARIANT_CATEGORY: &str = "variant_node";

fn base_variant() -> String {
	BASE_VARIANT.to_string()
}

/// One CMS record.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Item {
	/// Entry uid, shared by all of the entry's records.
	pub uid: String,
	/// Display title; variants may leave it out.
	#[serde(default)]
	pub title: Option<String>,
	/// Locale code of this record.
	pub locale: String,
	/// `None` on an entry's master-locale record.
	#[serde(default)]
	pub fallback_locale: Option<String>,
	/// Whether the record overrides its master locale.
	#[serde(default)]
	pub localised: bool,
	/// CMS version number.
	#[serde(default)]
	pub version: Option<u64>,
	/// Content type of the entry.
	pub content_type_uid: String,
	/// Entries this record points at.
	#[serde(default)]
	pub references: Vec<ItemReference>,
	/// Human name of the variant.
	#[serde(default)]
	pub variant_name: Option<String>,
	/// [`BASE_VARIANT`] unless this is a variant record.
	#[serde(default = "base_variant")]
	pub variant_uid: String,
	/// Set on variant records that inherit from another variant.
	#[serde(default)]
	pub fallback_variant: Option<String>,
	/// Publishing workflow stage, if any.
	#[serde(default)]
	pub workflow_stage: Option<String>,
}

impl Item {
	/// Belongs to the entry's default variant.
	pub fn is_base_variant(&self) -> bool {
		self.variant_uid == BASE_VARIANT
	}

	/// The record for the entry's master locale.
	pub fn is_master_locale(&self) -> bool {
		self.fallback_locale.is_none()
	}
}

/// A record's reference to another entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ItemReference {
	/// Referenced entry uid.
	pub uid: String,
}

#[derive(Deserialize)]
struct ItemPage {
	#[serde(default)]
	items: Vec<Item>,
}

/// Which entry the feed was requested for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedContext {
	/// Uid of the requested entry; its master record gets the "Parent Entry" heading.
	pub entry_uid: String,
}

/// Values seen in the feed, for filter menus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Facets {
	/// Content type uids.
	pub content_types: BTreeSet<String>,
	/// Always contains `"all"`.
	pub locales: BTreeSet<String>,
	/// Workflow stages.
	pub workflows: BTreeSet<String>,
}

impl Default for Facets {
	fn default() -> Self {
		Self {
			content_types: BTreeSet::new(),
			locales: BTreeSet::from(["all".to_string()]),
			workflows: BTreeSet::new(),
		}
	}
}

impl Facets {
	fn record(&mut self, item: &Item) {
		self.content_types.insert(item.content_type_uid.clone());
		self.locales.insert(item.locale.clone());
		if let Some(stage) = item.workflow_stage.as_deref().filter(|s| !s.is_empty()) {
			self.workflows.insert(stage.to_string());
		}
	}
}

/// A feed graph and the facets collected while building it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedGraph {
	/// The built graph.
	pub graph: Graph,
	/// Filter menu values.
	pub facets: Facets,
}

/// Build a graph from feed `lines`. Blank lines are ignored.
///
/// With an active `locale` other than `"all"`, localised records of other
/// locales are left out; master records always stay.
pub fn build_from_feed<I, S>(
	lines: I,
	context: &FeedContext,
	locale: Option<&str>,
	sizing: &SizeConfig,
	palette: &NodePalette,
) -> Result<FeedGraph, BuildError>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut builder = FeedBuilder::new(context, locale, sizing, palette);
	for (i, line) in lines.into_iter().enumerate() {
		let line = line.as_ref().trim();
		if line.is_empty() {
			continue;
		}
		let page: ItemPage =
			serde_json::from_str(line).map_err(|source| BuildError::FeedLine { line: i + 1, source })?;
		for item in &page.items {
			builder.ingest(item);
		}
	}
	Ok(builder.finish())
}

struct FeedBuilder<'a> {
	context: &'a FeedContext,
	locale: Option<&'a str>,
	sizing: &'a SizeConfig,
	colors: CategoryColors,
	graph: Graph,
	/// Position of each node in `graph.nodes`.
	index: HashMap<NodeId, usize>,
	edge_ids: HashSet<EdgeId>,
	next_id: usize,
	/// `uid.variant[.locale]`, `localised-uid`, `variant-uid`, `name.uid`, `reference-node` to node id.
	mapping: HashMap<String, NodeId>,
	/// Referring record key to referenced entry uids, in first-seen order.
	references: Vec<(String, Vec<String>)>,
	/// Position of each referring key in `references`.
	referrers: HashMap<String, usize>,
	/// Edges out of a mapping key, resolved once the feed is read.
	pending: Vec<(String, NodeId)>,
	facets: Facets,
}

impl<'a> FeedBuilder<'a> {
	fn new(context: &'a FeedContext, locale: Option<&'a str>, sizing: &'a SizeConfig, palette: &NodePalette) -> Self {
		Self {
			context,
			locale: locale.filter(|l| !l.is_empty() && *l != "all"),
			sizing,
			colors: CategoryColors::new(palette.clone()),
			graph: Graph::new(),
			index: HashMap::new(),
			edge_ids: HashSet::new(),
			next_id: 0,
			mapping: HashMap::new(),
			references: Vec::new(),
			referrers: HashMap::new(),
			pending: Vec::new(),
			facets: Facets::default(),
		}
	}

	fn add_node(&mut self, text: NodeText, kind: NodeKind, color: ColorPair) -> NodeId {
		self.next_id += 1;
		let id = self.next_id.to_string();
		let mut node = Node::new(id.clone(), text, kind);
		node.color = Some(color);
		self.sizing.apply(&mut node);
		self.index.insert(id.clone(), self.graph.nodes.len());
		self.graph.nodes.push(node);
		id
	}

	fn node(&self, id: &str) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.graph.nodes[i])
	}

	/// Add the edge `from -> to` unless it exists.
	fn connect(&mut self, from: &str, to: &str) {
		let edge = Edge::new(from, to);
		if self.edge_ids.insert(edge.id.clone()) {
			self.graph.edges.push(edge);
		}
	}

	fn record_node(&mut self, heading: Option<&str>, title: String, item: &Item) -> NodeId {
		let mut rows = Vec::with_capacity(5);
		if let Some(heading) = heading {
			rows.push((heading.to_string(), String::new()));
		}
		rows.push((title, String::new()));
		rows.push(("locale".to_string(), item.locale.clone()));
		rows.push(("content_type_uid".to_string(), item.content_type_uid.clone()));
		if let Some(stage) = &item.workflow_stage {
			rows.push(("workflow_stage".to_string(), stage.clone()));
		}
		let color = self.colors.get(&item.content_type_uid);
		self.add_node(NodeText::Fields(rows), NodeKind::Null, color)
	}

	/// The block node under `key`, created on first use and hung off `parent_key`.
	fn block(&mut self, key: String, label: &str, parent_key: String) -> NodeId {
		if let Some(id) = self.mapping.get(&key) {
			return id.clone();
		}
		let id = self.add_node(NodeText::Scalar(label.to_string()), NodeKind::Array, Color::WHITE.pair());
		self.mapping.insert(key, id.clone());
		self.pending.push((parent_key, id.clone()));
		id
	}

	/// Key text of row `row` on the node mapped under `key`.
	fn title_of(&self, key: &str, row: usize) -> Option<String> {
		let node = self.node(self.mapping.get(key)?)?;
		match &node.text {
			NodeText::Fields(rows) => rows.get(row).map(|(k, _)| k.clone()),
			NodeText::Scalar(_) => None,
		}
	}

	fn heading(&self, item: &Item) -> &'static str {
		if item.uid == self.context.entry_uid {
			"Parent Entry"
		} else {
			"Master Locale"
		}
	}

	fn ingest(&mut self, item: &Item) {
		self.facets.record(item);

		if let Some(active) = self.locale {
			if !item.is_master_locale() && item.locale != active {
				debug!("feed: skipping {} in {}", item.uid, item.locale);
				return;
			}
		}

		let master_key = format!("{}.{}", item.uid, BASE_VARIANT);
		let mut ref_key = format!("{}.{}", item.uid, item.variant_uid);

		if item.is_base_variant() {
			if item.is_master_locale() {
				if !self.mapping.contains_key(&ref_key) {
					let title = item.title.clone().unwrap_or_default();
					let id = self.record_node(Some(self.heading(item)), title, item);
					self.mapping.insert(ref_key.clone(), id);
				}
			} else {
				ref_key = format!("{ref_key}.{}", item.locale);
				if !self.mapping.contains_key(&ref_key) {
					let title = item.title.clone().unwrap_or_default();
					let id = self.record_node(None, title, item);
					self.mapping.insert(ref_key.clone(), id.clone());
					let block = self.block(format!("localised-{}", item.uid), "localised_entries", master_key);
					self.connect(&block, &id);
				}
			}
		} else if item.fallback_variant.is_none() {
			let variants = self.block(format!("variant-{}", item.uid), "variants", master_key.clone());

			let name = item.variant_name.clone().unwrap_or_else(|| item.variant_uid.clone());
			let name_key = format!("{name}.{}", item.uid);
			let name_node = match self.mapping.get(&name_key) {
				Some(id) => id.clone(),
				None => {
					let color = self.colors.get(VARIANT_CATEGORY);
					let id = self.add_node(NodeText::Fields(vec![(name, String::new())]), NodeKind::Text, color);
					self.mapping.insert(name_key, id.clone());
					self.connect(&variants, &id);
					id
				}
			};

			let (heading, fallback_key, fallback_row) = if item.is_master_locale() {
				(self.heading(item), master_key, 1)
			} else {
				ref_key = format!("{ref_key}.{}", item.locale);
				("Master Locale", format!("{master_key}.{}", item.locale), 0)
			};
			if !self.mapping.contains_key(&ref_key) {
				let title = item
					.title
					.clone()
					.or_else(|| self.title_of(&fallback_key, fallback_row))
					.unwrap_or_default();
				let id = self.record_node(Some(heading), title, item);
				self.mapping.insert(ref_key.clone(), id.clone());
				self.connect(&name_node, &id);
			}
		}

		for reference in &item.references {
			let slot = match self.referrers.get(&ref_key) {
				Some(&slot) => slot,
				None => {
					self.referrers.insert(ref_key.clone(), self.references.len());
					self.references.push((ref_key.clone(), Vec::new()));
					self.references.len() - 1
				}
			};
			let uids = &mut self.references[slot].1;
			if !uids.contains(&reference.uid) {
				uids.push(reference.uid.clone());
			}
		}
	}

	fn content_type_of(&self, id: &str) -> String {
		self.node(id)
			.and_then(|n| n.text.field("content_type_uid"))
			.unwrap_or("unknown")
			.to_string()
	}

	fn finish(mut self) -> FeedGraph {
		for (key, to) in std::mem::take(&mut self.pending) {
			match self.mapping.get(&key) {
				Some(from) => {
					let from = from.clone();
					self.connect(&from, &to);
				}
				None => debug!("feed: no record for {key}, leaving {to} unattached"),
			}
		}

		for (parent_key, uids) in std::mem::take(&mut self.references) {
			let Some(parent) = self.mapping.get(&parent_key).cloned() else {
				debug!("feed: referring record {parent_key} not in graph");
				continue;
			};
			for uid in uids {
				let Some(child) = self.mapping.get(&format!("{uid}.{BASE_VARIANT}")).cloned() else {
					debug!("feed: referenced entry {uid} not in graph");
					continue;
				};
				let block_key = format!("reference-{parent}");
				let block = match self.mapping.get(&block_key) {
					Some(id) => id.clone(),
					None => {
						let label = format!("{} -> {}", self.content_type_of(&parent), self.content_type_of(&child));
						let id = self.add_node(NodeText::Scalar(label), NodeKind::Array, Color::WHITE.pair());
						self.mapping.insert(block_key, id.clone());
						self.connect(&parent, &id);
						id
					}
				};
				self.connect(&block, &child);
			}
		}

		let mut children: HashMap<String, usize> = HashMap::new();
		for edge in &self.graph.edges {
			*children.entry(edge.from.clone()).or_insert(0) += 1;
		}
		for node in &mut self.graph.nodes {
			node.children_count = children.get(&node.id).copied().unwrap_or(0);
		}
		self.graph.locale = self.locale.map(str::to_string);

		debug!(
			"built feed graph: {} nodes, {} edges",
			self.graph.nodes.len(),
			self.graph.edges.len()
		);
		FeedGraph {
			graph: self.graph,
			facets: self.facets,
		}
	}
}
