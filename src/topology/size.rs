//! Node sizing: the bounding box a node's content needs.
//!
//! This module centralizes every sizing constant so the layout engine and the
//! builders agree on node dimensions. Sizing is pure: identical input always
//! yields the identical box, which the layout engine relies on.
//!
//! # Sizing Branches
//!
//! A node falls into exactly one branch:
//!
//! - **Parent** (array/object key nodes): width grows with the label length,
//!   height is fixed.
//! - **Text** (free-standing text labels): width grows with the text length at
//!   a coarser step, height is fixed.
//! - **Fields** (everything else): a base box plus a per-field increment in
//!   both directions, so nodes with more fields are visibly larger.
//!
//! "Length" is [`NodeText::len`]: characters for a scalar, rows for a field list.

use serde::{Deserialize, Serialize};

use super::types::{Node, NodeKind, NodeText};

/// Width and height of a node, in layout units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct NodeSize {
	/// Horizontal extent.
	pub width: f64,
	/// Vertical extent.
	pub height: f64,
}

/// Sizing for parent (array/object) nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentSizeConfig {
	/// Width per unit of label length.
	pub unit_width: f64,
	/// Fixed height.
	pub height: f64,
}

impl Default for ParentSizeConfig {
	fn default() -> Self {
		Self {
			unit_width: 20.0,
			height: 50.0,
		}
	}
}

/// Sizing for text-label nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSizeConfig {
	/// Width per unit of text length.
	pub unit_width: f64,
	/// Fixed height.
	pub height: f64,
}

impl Default for TextSizeConfig {
	fn default() -> Self {
		Self {
			unit_width: 150.0,
			height: 50.0,
		}
	}
}

/// Sizing for key/value and scalar nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsSizeConfig {
	/// Width with no fields.
	pub base_width: f64,
	/// Height with no fields.
	pub base_height: f64,
	/// Added to the width for each field.
	pub field_width: f64,
	/// Added to the height for each field.
	pub field_height: f64,
}

impl Default for FieldsSizeConfig {
	fn default() -> Self {
		Self {
			base_width: 200.0,
			base_height: 100.0,
			field_width: 20.0,
			field_height: 5.0,
		}
	}
}

/// Complete sizing configuration for all node branches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
	/// Array and object key nodes.
	pub parent: ParentSizeConfig,
	/// Free-standing text labels.
	pub text: TextSizeConfig,
	/// Field groups and scalars.
	pub fields: FieldsSizeConfig,
}

impl SizeConfig {
	/// Compute the bounding box for a node of `kind` displaying `text`.
	pub fn measure(&self, kind: NodeKind, text: &NodeText) -> NodeSize {
		let units = text.len() as f64;
		if kind.is_parent() {
			NodeSize {
				width: units * self.parent.unit_width,
				height: self.parent.height,
			}
		} else if kind == NodeKind::Text {
			NodeSize {
				width: units * self.text.unit_width,
				height: self.text.height,
			}
		} else {
			let fields = match text {
				NodeText::Scalar(_) => 1.0,
				NodeText::Fields(rows) => rows.len() as f64,
			};
			NodeSize {
				width: self.fields.base_width + fields * self.fields.field_width,
				height: self.fields.base_height + fields * self.fields.field_height,
			}
		}
	}

	/// Size `node` in place from its kind and text.
	pub fn apply(&self, node: &mut Node) {
		let size = self.measure(node.kind, &node.text);
		node.width = size.width;
		node.height = size.height;
	}
}
