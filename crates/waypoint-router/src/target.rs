//! Navigation targets.

use std::fmt;

use crate::location::Query;
use crate::params::RouteParams;

/// Where a navigation should go: a concrete path or a named route.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteLocation {
	/// A concrete path, optionally carrying `?query` and `#hash`.
	Path(String),
	/// A named route with the parameters for its dynamic segments.
	Named {
		/// Route name.
		name: String,
		/// Parameter values.
		params: RouteParams,
	},
}

impl fmt::Display for RouteLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path(path) => f.write_str(path),
			Self::Named { name, .. } => write!(f, "{{name: {}}}", name),
		}
	}
}

/// A navigation request.
///
/// # Example
///
/// ```ignore
/// router.navigate("/chat/42").await?;
/// router
///     .navigate(NavigationTarget::named("ChatPage", [("roomId", "7")]).with_query("tab", "files"))
///     .await?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationTarget {
	location: RouteLocation,
	query: Query,
	hash: Option<String>,
	replace: bool,
	state: serde_json::Value,
}

impl NavigationTarget {
	/// Targets a concrete path.
	pub fn path(path: impl Into<String>) -> Self {
		Self::from_location(RouteLocation::Path(path.into()))
	}

	/// Targets a named route.
	pub fn named<I, K, V>(name: impl Into<String>, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self::from_location(RouteLocation::Named {
			name: name.into(),
			params: params.into_iter().collect(),
		})
	}

	fn from_location(location: RouteLocation) -> Self {
		Self {
			location,
			query: Query::new(),
			hash: None,
			replace: false,
			state: serde_json::Value::Null,
		}
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.append(key, value);
		self
	}

	/// Sets the hash, without the leading `#`.
	pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = Some(hash.into());
		self
	}

	/// Requests a replace navigation instead of a push.
	pub fn replacing(mut self) -> Self {
		self.replace = true;
		self
	}

	/// Attaches app-opaque state stored with the history entry.
	pub fn with_state(mut self, state: serde_json::Value) -> Self {
		self.state = state;
		self
	}

	/// Returns the route location.
	pub fn location(&self) -> &RouteLocation {
		&self.location
	}

	/// Returns the extra query pairs.
	pub fn query(&self) -> &Query {
		&self.query
	}

	/// Returns the hash override.
	pub fn hash(&self) -> Option<&str> {
		self.hash.as_deref()
	}

	/// Returns whether a replace navigation was requested.
	pub fn is_replace(&self) -> bool {
		self.replace
	}

	/// Returns the attached state.
	pub fn state(&self) -> &serde_json::Value {
		&self.state
	}
}

impl From<&str> for NavigationTarget {
	fn from(path: &str) -> Self {
		Self::path(path)
	}
}

impl From<String> for NavigationTarget {
	fn from(path: String) -> Self {
		Self::path(path)
	}
}

impl From<RouteLocation> for NavigationTarget {
	fn from(location: RouteLocation) -> Self {
		Self::from_location(location)
	}
}

impl fmt::Display for NavigationTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.location)
	}
}
