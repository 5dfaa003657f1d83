//! Dereferencing paths from the document root to a node's value.
//!
//! A path renders as `$`, followed by `.key` for identifier-like keys,
//! `["key"]` for anything else, and `[i]` for array indices.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One dereferencing step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
	/// Object member.
	Key(String),
	/// Array element.
	Index(usize),
}

/// Path from the document root, as a sequence of segments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath(pub Vec<PathSegment>);

impl NodePath {
	/// The empty path, `$`.
	pub fn root() -> Self {
		Self::default()
	}

	/// Steps from the root, outermost first.
	pub fn segments(&self) -> &[PathSegment] {
		&self.0
	}

	/// Follow the path through `document`, returning the value it points at.
	pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
		self.0.iter().try_fold(document, |value, segment| match segment {
			PathSegment::Key(key) => value.as_object()?.get(key),
			PathSegment::Index(i) => value.as_array()?.get(*i),
		})
	}

	/// Parse the textual form produced by `Display`.
	pub fn parse(text: &str) -> Option<Self> {
		let mut rest = text.strip_prefix('$')?;
		let mut segments = Vec::new();
		while !rest.is_empty() {
			if let Some(after) = rest.strip_prefix('.') {
				let end = after.find(|c: char| c == '.' || c == '[').unwrap_or(after.len());
				if end == 0 {
					return None;
				}
				segments.push(PathSegment::Key(after[..end].to_string()));
				rest = &after[end..];
			} else if let Some(after) = rest.strip_prefix("[\"") {
				// keys in brackets are JSON string literals
				let mut de = serde_json::Deserializer::from_str(&rest[1..]).into_iter::<String>();
				let key = de.next()?.ok()?;
				let consumed = de.byte_offset();
				let tail = after.get(consumed - 1..)?;
				rest = tail.strip_prefix(']')?;
				segments.push(PathSegment::Key(key));
			} else if let Some(after) = rest.strip_prefix('[') {
				let end = after.find(']')?;
				segments.push(PathSegment::Index(after[..end].parse().ok()?));
				rest = &after[end + 1..];
			} else {
				return None;
			}
		}
		Some(Self(segments))
	}
}

impl From<Vec<PathSegment>> for NodePath {
	fn from(segments: Vec<PathSegment>) -> Self {
		Self(segments)
	}
}

fn is_identifier(key: &str) -> bool {
	let mut chars = key.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl fmt::Display for PathSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PathSegment::Key(key) if is_identifier(key) => write!(f, ".{key}"),
			PathSegment::Key(key) => {
				let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
				write!(f, "[{quoted}]")
			}
			PathSegment::Index(i) => write!(f, "[{i}]"),
		}
	}
}

impl fmt::Display for NodePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("$")?;
		for segment in &self.0 {
			write!(f, "{segment}")?;
		}
		Ok(())
	}
}

impl Serialize for NodePath {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for NodePath {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		NodePath::parse(&text)
			.ok_or_else(|| serde::de::Error::custom(format!("invalid node path: {text}")))
	}
}
