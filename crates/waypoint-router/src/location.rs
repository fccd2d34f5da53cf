//! URL location parsing.
//!
//! Splits a requested URL into its path, query and hash parts and
//! normalizes the path: repeated separators are collapsed, a trailing
//! separator is dropped (except for the root) and a leading one is added.
//! Segments are percent-decoded only after splitting.

use std::borrow::Cow;
use std::fmt;

/// Decoded query string pairs, in order of appearance.
///
/// Repeated keys are kept; [`Query::get`] returns the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
	pairs: Vec<(String, String)>,
}

impl Query {
	/// Creates an empty query.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses a raw `application/x-www-form-urlencoded` query string.
	///
	/// A leading `?` is ignored. Malformed input yields an empty query.
	pub fn parse(raw: &str) -> Self {
		let raw = raw.strip_prefix('?').unwrap_or(raw);
		if raw.is_empty() {
			return Self::new();
		}
		match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
			Ok(pairs) => Self { pairs },
			Err(err) => {
				tracing::debug!(query = raw, error = %err, "ignoring malformed query string");
				Self::new()
			}
		}
	}

	/// Returns the first value for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.pairs
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Returns every value for `key`.
	pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.pairs
			.iter()
			.filter(move |(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	/// Appends a pair.
	pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.pairs.push((key.into(), value.into()));
	}

	/// Appends every pair of `other`.
	pub fn extend(&mut self, other: &Query) {
		self.pairs.extend(other.pairs.iter().cloned());
	}

	/// Iterates over the pairs in order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Returns the number of pairs.
	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	/// Returns whether the query has no pairs.
	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}

	/// Encodes the query without the leading `?`.
	pub fn to_query_string(&self) -> String {
		serde_urlencoded::to_string(&self.pairs).unwrap_or_default()
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}

/// A parsed and normalized URL location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
	path: String,
	query: Query,
	hash: Option<String>,
}

impl Location {
	/// Parses a URL of the form `path?query#hash`.
	pub fn parse(input: &str) -> Self {
		let (before_hash, hash) = match input.split_once('#') {
			Some((rest, hash)) => (rest, Some(hash.to_string())),
			None => (input, None),
		};
		let (path, query) = match before_hash.split_once('?') {
			Some((path, query)) => (path, Query::parse(query)),
			None => (before_hash, Query::new()),
		};

		Self {
			path: normalize_path(path),
			query,
			hash: hash.filter(|h| !h.is_empty()),
		}
	}

	/// Builds a location from an already concrete path and explicit parts.
	pub fn from_parts(path: &str, query: Query, hash: Option<String>) -> Self {
		Self {
			path: normalize_path(path),
			query,
			hash: hash.filter(|h| !h.is_empty()),
		}
	}

	/// Returns the normalized, still percent-encoded path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the decoded query.
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Returns a mutable reference to the query.
	pub fn query_mut(&mut self) -> &mut Query {
		&mut self.query
	}

	/// Returns the hash without the leading `#`.
	pub fn hash(&self) -> Option<&str> {
		self.hash.as_deref()
	}

	/// Replaces the hash.
	pub fn set_hash(&mut self, hash: Option<String>) {
		self.hash = hash.filter(|h| !h.is_empty());
	}

	/// Returns the decoded path segments.
	pub fn segments(&self) -> Vec<String> {
		self.path
			.split('/')
			.filter(|s| !s.is_empty())
			.map(decode_segment)
			.collect()
	}

	/// Returns the full path including query and hash.
	pub fn full_path(&self) -> String {
		let mut full = self.path.clone();
		if !self.query.is_empty() {
			full.push('?');
			full.push_str(&self.query.to_query_string());
		}
		if let Some(hash) = &self.hash {
			full.push('#');
			full.push_str(hash);
		}
		full
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.full_path())
	}
}

/// Normalizes a path: leading `/`, no repeated or trailing separators.
pub fn normalize_path(path: &str) -> String {
	let mut normalized = String::with_capacity(path.len() + 1);
	for segment in path.split('/').filter(|s| !s.is_empty()) {
		normalized.push('/');
		normalized.push_str(segment);
	}
	if normalized.is_empty() {
		normalized.push('/');
	}
	normalized
}

/// Percent-decodes one path segment, keeping it verbatim if it is not valid UTF-8.
pub(crate) fn decode_segment(segment: &str) -> String {
	match urlencoding::decode(segment) {
		Ok(decoded) => decoded.into_owned(),
		Err(_) => segment.to_string(),
	}
}

/// Percent-encodes one path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
	match urlencoding::encode(segment) {
		Cow::Borrowed(s) => s.to_string(),
		Cow::Owned(s) => s,
	}
}
