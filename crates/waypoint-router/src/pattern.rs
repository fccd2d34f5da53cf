//! Path pattern compilation.
//!
//! A pattern is a `/`-delimited list of segments. Each segment is one of:
//!
//! - a literal, matched exactly and case-sensitively (`chat`)
//! - a dynamic parameter, `:name`, matching any non-empty segment
//! - a catch-all parameter, `:name*`, allowed only as the final segment and
//!   matching one or more remaining segments
//!
//! Patterns are compiled once when the route table is built. Matching works on
//! already split and percent-decoded request segments, so `%2F` inside a value
//! never acts as a separator.
//!
//! Building is the inverse of matching for values that have a non-empty
//! piece between every `/`. Catch-all values are normalized on the way out:
//! leading, trailing and repeated separators are dropped, so `/a` builds as
//! `a` and `a//b` as `a/b`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PatternError;
use crate::location::{decode_segment, encode_segment, normalize_path};
use crate::params::RouteParams;

/// Maximum allowed length for a pattern string in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of segments in a pattern.
const MAX_PATH_SEGMENTS: usize = 32;

static PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("invalid name regex: {e}"))
});

/// One compiled segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
	/// Literal text (already percent-decoded).
	Static(String),
	/// Named dynamic segment.
	Param(String),
	/// Named catch-all capturing the rest of the path.
	CatchAll(String),
}

impl Segment {
	/// Returns the parameter name for dynamic segments.
	pub fn param_name(&self) -> Option<&str> {
		match self {
			Self::Static(_) => None,
			Self::Param(name) | Self::CatchAll(name) => Some(name),
		}
	}
}

/// A compiled route path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	/// Normalized pattern string.
	pattern: String,
	/// Compiled segments in order.
	segments: Vec<Segment>,
	/// Parameter names in the order they appear.
	param_names: Vec<String>,
}

impl PathPattern {
	/// Compiles a pattern string.
	///
	/// # Errors
	///
	/// Returns a [`PatternError`] when a dynamic token is malformed (empty
	/// or invalid name, repeated name, mixed with literal text, catch-all
	/// before the last segment) or the pattern exceeds the size limits.
	pub fn parse(pattern: &str) -> Result<Self, PatternError> {
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(PatternError::TooLong {
				length: pattern.len(),
				max: MAX_PATTERN_LENGTH,
			});
		}

		let normalized = normalize_path(pattern);
		let raw_segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
		if raw_segments.len() > MAX_PATH_SEGMENTS {
			return Err(PatternError::TooManySegments {
				count: raw_segments.len(),
				max: MAX_PATH_SEGMENTS,
			});
		}

		let mut segments = Vec::with_capacity(raw_segments.len());
		let mut param_names: Vec<String> = Vec::new();
		let last = raw_segments.len().saturating_sub(1);

		for (position, raw) in raw_segments.iter().enumerate() {
			let segment = Self::compile_segment(&normalized, raw)?;

			if let Some(name) = segment.param_name() {
				if param_names.iter().any(|existing| existing == name) {
					return Err(PatternError::DuplicateParam {
						pattern: normalized.clone(),
						name: name.to_string(),
					});
				}
				if matches!(segment, Segment::CatchAll(_)) && position != last {
					return Err(PatternError::CatchAllNotLast {
						pattern: normalized.clone(),
						name: name.to_string(),
					});
				}
				param_names.push(name.to_string());
			}

			segments.push(segment);
		}

		Ok(Self {
			pattern: normalized,
			segments,
			param_names,
		})
	}

	fn compile_segment(pattern: &str, raw: &str) -> Result<Segment, PatternError> {
		let Some(token) = raw.strip_prefix(':') else {
			if raw.contains(':') {
				return Err(PatternError::MixedSegment {
					pattern: pattern.to_string(),
					segment: raw.to_string(),
				});
			}
			return Ok(Segment::Static(decode_segment(raw)));
		};

		let (name, catch_all) = match token.strip_suffix('*') {
			Some(name) => (name, true),
			None => (token, false),
		};

		if name.is_empty() {
			return Err(PatternError::EmptyParamName {
				pattern: pattern.to_string(),
			});
		}
		if name.contains(':') {
			return Err(PatternError::MixedSegment {
				pattern: pattern.to_string(),
				segment: raw.to_string(),
			});
		}
		if !PARAM_NAME.is_match(name) {
			return Err(PatternError::InvalidParamName {
				pattern: pattern.to_string(),
				name: name.to_string(),
			});
		}

		Ok(if catch_all {
			Segment::CatchAll(name.to_string())
		} else {
			Segment::Param(name.to_string())
		})
	}

	/// Returns the normalized pattern string.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Returns the compiled segments.
	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	/// Returns the parameter names in pattern order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Returns whether the pattern has no dynamic segments.
	pub fn is_static(&self) -> bool {
		self.param_names.is_empty()
	}

	/// Returns whether the pattern ends with a catch-all segment.
	pub fn has_catch_all(&self) -> bool {
		matches!(self.segments.last(), Some(Segment::CatchAll(_)))
	}

	/// Matches decoded request segments against this pattern.
	///
	/// Segment counts must agree exactly unless the pattern ends with a
	/// catch-all, which consumes one or more trailing segments.
	pub fn match_segments(&self, path: &[String]) -> Option<RouteParams> {
		let mut params = RouteParams::new();

		for (index, segment) in self.segments.iter().enumerate() {
			match segment {
				Segment::Static(literal) => {
					if path.get(index) != Some(literal) {
						return None;
					}
				}
				Segment::Param(name) => {
					let value = path.get(index).filter(|v| !v.is_empty())?;
					params.insert(name.clone(), value.clone());
				}
				Segment::CatchAll(name) => {
					let rest = &path[index.min(path.len())..];
					if rest.is_empty() || rest.iter().any(|s| s.is_empty()) {
						return None;
					}
					params.insert(name.clone(), rest.join("/"));
					return Some(params);
				}
			}
		}

		(path.len() == self.segments.len()).then_some(params)
	}

	/// Builds a concrete, percent-encoded path from parameters.
	///
	/// Returns the name of the first parameter that is missing or empty.
	/// Parameters the pattern does not declare are ignored. Empty pieces of a
	/// catch-all value are dropped, and a value made only of `/` counts as
	/// empty.
	pub fn build(&self, params: &RouteParams) -> Result<String, String> {
		if self.segments.is_empty() {
			return Ok("/".to_string());
		}

		let mut path = String::new();
		for segment in &self.segments {
			path.push('/');
			match segment {
				Segment::Static(literal) => path.push_str(&encode_segment(literal)),
				Segment::Param(name) => {
					let value = params
						.get(name)
						.filter(|v| !v.is_empty())
						.ok_or_else(|| name.clone())?;
					path.push_str(&encode_segment(value));
				}
				Segment::CatchAll(name) => {
					let value = params
						.get(name)
						.map(|v| v.trim_matches('/'))
						.filter(|v| !v.is_empty())
						.ok_or_else(|| name.clone())?;
					let encoded: Vec<String> = value
						.split('/')
						.filter(|s| !s.is_empty())
						.map(encode_segment)
						.collect();
					path.push_str(&encoded.join("/"));
				}
			}
		}
		Ok(path)
	}
}

impl PartialEq for PathPattern {
	fn eq(&self, other: &Self) -> bool {
		self.pattern == other.pattern
	}
}

impl Eq for PathPattern {}

impl std::fmt::Display for PathPattern {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.pattern)
	}
}
