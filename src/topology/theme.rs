//! Category coloring for nodes.
//!
//! Nodes that share a caller-supplied category (for example the content type a
//! record came from) share a fill color. The foreground is picked for contrast.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::types::{ColorPair, Graph, NodeId};

/// Caller-supplied node id to category mapping.
pub type CategoryMap = HashMap<NodeId, String>;

/// Minimum contrast ratio against white before black text is used instead.
const CONTRAST_THRESHOLD: f64 = 2.0;

/// RGB color representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
}

impl Color {
	/// `#FFFFFF`.
	pub const WHITE: Color = Color::rgb(255, 255, 255);
	/// `#000000`.
	pub const BLACK: Color = Color::rgb(0, 0, 0);

	/// Color from its three channels.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Parse `#rrggbb` (the leading `#` is optional).
	pub fn from_hex(hex: &str) -> Option<Self> {
		let hex = hex.strip_prefix('#').unwrap_or(hex);
		if hex.len() != 6 || !hex.is_ascii() {
			return None;
		}
		let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
		Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
	}

	/// Uppercase `#RRGGBB`.
	pub fn to_css_rgb(self) -> String {
		format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
	}

	/// WCAG relative luminance in `[0, 1]`.
	pub fn luminance(self) -> f64 {
		let linear = |v: u8| {
			let v = v as f64 / 255.0;
			if v <= 0.03928 {
				v / 12.92
			} else {
				((v + 0.055) / 1.055).powf(2.4)
			}
		};
		linear(self.r) * 0.2126 + linear(self.g) * 0.7152 + linear(self.b) * 0.0722
	}

	/// WCAG contrast ratio between two colors, always `>= 1`.
	pub fn contrast_ratio(self, other: Color) -> f64 {
		let (a, b) = (self.luminance(), other.luminance());
		(a.max(b) + 0.05) / (a.min(b) + 0.05)
	}

	/// White when it contrasts enough with `self`, black otherwise.
	pub fn contrasting(self) -> Color {
		if self.contrast_ratio(Color::WHITE) >= CONTRAST_THRESHOLD {
			Color::WHITE
		} else {
			Color::BLACK
		}
	}

	/// Fill `self` with its contrasting foreground.
	pub fn pair(self) -> ColorPair {
		ColorPair {
			fill: self.to_css_rgb(),
			foreground: self.contrasting().to_css_rgb(),
		}
	}
}

impl Serialize for Color {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_css_rgb())
	}
}

impl<'de> Deserialize<'de> for Color {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Color::from_hex(&text)
			.ok_or_else(|| serde::de::Error::custom(format!("invalid hex color: {text}")))
	}
}

/// Palette cycled through as new categories appear.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePalette {
	/// Colors in assignment order.
	pub colors: Vec<Color>,
}

impl NodePalette {
	/// Violet, blue and pink accent palette (default)
	pub fn accent() -> Self {
		Self {
			colors: vec![
				Color::rgb(0x7C, 0x4D, 0xFF), // Violet
				Color::rgb(0x17, 0x83, 0xFF), // Azure
				Color::rgb(0xEC, 0x3D, 0xC8), // Pink
			],
		}
	}

	/// Color `index`, wrapping around. White for an empty palette.
	pub fn get(&self, index: usize) -> Color {
		if self.colors.is_empty() {
			return Color::WHITE;
		}
		self.colors[index % self.colors.len()]
	}
}

impl Default for NodePalette {
	fn default() -> Self {
		Self::accent()
	}
}

/// Hands out one color pair per category, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct CategoryColors {
	palette: NodePalette,
	assigned: HashMap<String, ColorPair>,
}

impl CategoryColors {
	/// No categories assigned yet.
	pub fn new(palette: NodePalette) -> Self {
		Self {
			palette,
			assigned: HashMap::new(),
		}
	}

	/// Color pair for `category`, assigning the next palette entry on first use.
	pub fn get(&mut self, category: &str) -> ColorPair {
		if let Some(pair) = self.assigned.get(category) {
			return pair.clone();
		}
		let pair = self.palette.get(self.assigned.len()).pair();
		self.assigned.insert(category.to_string(), pair.clone());
		pair
	}

	/// Number of categories assigned so far.
	pub fn len(&self) -> usize {
		self.assigned.len()
	}

	/// No category assigned yet.
	pub fn is_empty(&self) -> bool {
		self.assigned.is_empty()
	}
}

/// Color every node that has a category in `categories`. Nodes are visited in
/// graph order so palette assignment is deterministic.
pub fn assign_category_colors(graph: &mut Graph, categories: &CategoryMap, palette: &NodePalette) {
	let mut colors = CategoryColors::new(palette.clone());
	for node in &mut graph.nodes {
		if let Some(category) = categories.get(&node.id) {
			node.color = Some(colors.get(category));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::topology::types::{Node, NodeKind, NodeText};
	use pretty_assertions::assert_eq;

	#[test]
	fn hex_round_trip() {
		let c = Color::from_hex("#1783ff").expect("hex");
		assert_eq!(c, Color::rgb(0x17, 0x83, 0xFF));
		assert_eq!(c.to_css_rgb(), "#1783FF");
		assert_eq!(Color::from_hex("#12345"), None);
		assert_eq!(Color::from_hex("zzzzzz"), None);
	}

	#[test]
	fn contrast_picks_readable_foreground() {
		assert_eq!(Color::BLACK.contrasting(), Color::WHITE);
		assert_eq!(Color::WHITE.contrasting(), Color::BLACK);
		assert_eq!(Color::rgb(0x7C, 0x4D, 0xFF).contrasting(), Color::WHITE);
		assert_eq!(Color::rgb(0xFF, 0xEE, 0x58).contrasting(), Color::BLACK);
	}

	#[test]
	fn categories_share_colors_in_first_seen_order() {
		let mut colors = CategoryColors::new(NodePalette::accent());
		let blog = colors.get("blog");
		let author = colors.get("author");
		assert_eq!(colors.get("blog"), blog);
		assert_eq!(blog.fill, "#7C4DFF");
		assert_eq!(author.fill, "#1783FF");
		assert_eq!(colors.len(), 2);
	}

	#[test]
	fn assigns_colors_from_category_map() {
		let mut graph = Graph::new();
		for id in ["1", "2", "3"] {
			graph.nodes.push(Node::new(id, NodeText::Scalar(id.into()), NodeKind::String));
		}
		let categories: CategoryMap = [("1", "a"), ("3", "a")]
			.into_iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		assign_category_colors(&mut graph, &categories, &NodePalette::default());
		assert_eq!(graph.nodes[0].color, graph.nodes[2].color);
		assert!(graph.nodes[0].color.is_some());
		assert_eq!(graph.nodes[1].color, None);
	}

	#[test]
	fn palette_deserializes_from_hex_list() {
		let palette: NodePalette = serde_json::from_str(r##"["#000000", "#ffffff"]"##).expect("palette");
		assert_eq!(palette.get(3), Color::WHITE);
	}
}
