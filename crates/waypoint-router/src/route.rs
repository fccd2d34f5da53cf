//! Resolved route values handed to guards and the rendering layer.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::ParamError;
use crate::location::{Location, Query};
use crate::params::{FromParams, RouteParams};
use crate::table::{ComponentRef, RouteMeta, RouteRecord};

static EMPTY_PARAMS: RouteParams = RouteParams::new();

/// The outcome of matching a concrete path against the route table.
///
/// Holds only weak references to table records; the table owns them.
#[derive(Clone)]
pub struct ResolvedRoute {
	record: Weak<RouteRecord>,
	matched: Vec<Weak<RouteRecord>>,
	name: Option<String>,
	params: RouteParams,
	location: Location,
}

impl ResolvedRoute {
	pub(crate) fn new(
		record: &Rc<RouteRecord>,
		matched: &[Rc<RouteRecord>],
		params: RouteParams,
		location: Location,
	) -> Self {
		Self {
			record: Rc::downgrade(record),
			matched: matched.iter().map(Rc::downgrade).collect(),
			name: record.name().map(str::to_string),
			params,
			location,
		}
	}

	/// Returns the matched record, if the table is still alive.
	pub fn record(&self) -> Option<Rc<RouteRecord>> {
		self.record.upgrade()
	}

	/// Returns the matched chain from the outermost parent to the leaf.
	pub fn matched(&self) -> Vec<Rc<RouteRecord>> {
		self.matched.iter().filter_map(Weak::upgrade).collect()
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the extracted parameters.
	pub fn params(&self) -> &RouteParams {
		&self.params
	}

	/// Extracts typed parameters.
	pub fn extract<T: FromParams>(&self) -> Result<T, ParamError> {
		self.params.extract()
	}

	/// Returns the resolved location.
	pub fn location(&self) -> &Location {
		&self.location
	}

	/// Returns the normalized path without query or hash.
	pub fn path(&self) -> &str {
		self.location.path()
	}

	/// Returns the concrete path including query and hash.
	pub fn full_path(&self) -> String {
		self.location.full_path()
	}

	/// Returns the page handle of the matched record.
	pub fn component(&self) -> Option<ComponentRef> {
		self.record().and_then(|r| r.component().cloned())
	}

	/// Returns the metadata of the matched record.
	pub fn meta(&self) -> RouteMeta {
		self.record().map(|r| r.meta().clone()).unwrap_or_default()
	}
}

impl PartialEq for ResolvedRoute {
	fn eq(&self, other: &Self) -> bool {
		Weak::ptr_eq(&self.record, &other.record)
			&& self.params == other.params
			&& self.location == other.location
	}
}

impl fmt::Debug for ResolvedRoute {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolvedRoute")
			.field("name", &self.name)
			.field("full_path", &self.full_path())
			.field("params", &self.params)
			.finish()
	}
}

/// The current route: either a match or the unmatched sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentRoute {
	/// The location matched a route.
	Matched(ResolvedRoute),
	/// No route matched; the requested location is kept for not-found pages.
	Unmatched(Location),
}

impl CurrentRoute {
	/// Returns whether a route matched.
	pub fn is_matched(&self) -> bool {
		matches!(self, Self::Matched(_))
	}

	/// Returns the resolved route when matched.
	pub fn resolved(&self) -> Option<&ResolvedRoute> {
		match self {
			Self::Matched(route) => Some(route),
			Self::Unmatched(_) => None,
		}
	}

	/// Returns the location.
	pub fn location(&self) -> &Location {
		match self {
			Self::Matched(route) => route.location(),
			Self::Unmatched(location) => location,
		}
	}

	/// Returns the route name, if matched and named.
	pub fn name(&self) -> Option<&str> {
		self.resolved().and_then(ResolvedRoute::name)
	}

	/// Returns the parameters; empty when unmatched.
	pub fn params(&self) -> &RouteParams {
		self.resolved()
			.map(ResolvedRoute::params)
			.unwrap_or(&EMPTY_PARAMS)
	}

	/// Returns the normalized path.
	pub fn path(&self) -> &str {
		self.location().path()
	}

	/// Returns the decoded query.
	pub fn query(&self) -> &Query {
		self.location().query()
	}

	/// Returns the hash.
	pub fn hash(&self) -> Option<&str> {
		self.location().hash()
	}

	/// Returns the concrete path including query and hash.
	pub fn full_path(&self) -> String {
		self.location().full_path()
	}
}

impl From<ResolvedRoute> for CurrentRoute {
	fn from(route: ResolvedRoute) -> Self {
		Self::Matched(route)
	}
}
