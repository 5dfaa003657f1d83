//! Field filters: pick out the nodes whose field rows carry a given value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{Node, NodeId};

/// Which field a filter matches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
	/// The `locale` row.
	Locale,
	/// The `content_type_uid` row.
	ContentType,
	/// The `workflow_stage` row.
	#[serde(alias = "workflow")]
	WorkflowStage,
}

impl FilterKind {
	/// The field row key this kind looks at.
	pub fn field_key(self) -> &'static str {
		match self {
			FilterKind::Locale => "locale",
			FilterKind::ContentType => "content_type_uid",
			FilterKind::WorkflowStage => "workflow_stage",
		}
	}
}

impl fmt::Display for FilterKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FilterKind::Locale => "locale",
			FilterKind::ContentType => "content-type",
			FilterKind::WorkflowStage => "workflow-stage",
		})
	}
}

impl FromStr for FilterKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"locale" => Ok(FilterKind::Locale),
			"content-type" | "content_type" => Ok(FilterKind::ContentType),
			"workflow" | "workflow-stage" | "workflow_stage" => Ok(FilterKind::WorkflowStage),
			other => Err(format!("unknown filter kind: {other}")),
		}
	}
}

/// The filter currently applied by the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActiveFilter {
	/// Field matched on.
	pub kind: FilterKind,
	/// Value the field must equal.
	pub value: String,
}

/// `None`, empty and `"all"` all mean "no filter".
pub fn clears_filter(value: Option<&str>) -> bool {
	matches!(value, None | Some("") | Some("all"))
}

/// Ids of nodes with a field row `kind.field_key() == value`, in node order.
pub fn matching_nodes(nodes: &[Node], kind: FilterKind, value: &str) -> Vec<NodeId> {
	let key = kind.field_key();
	nodes
		.iter()
		.filter(|n| n.text.field(key) == Some(value))
		.map(|n| n.id.clone())
		.collect()
}
