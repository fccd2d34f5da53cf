//! Path matching against a [`RouteTable`].
//!
//! Records are scanned in declaration order and the first full match wins.
//! There is no specificity ranking: when two patterns accept the same path,
//! the one declared first is returned, no matter how often or in what order
//! `resolve` is called.

use crate::error::MatchError;
use crate::location::Location;
use crate::params::RouteParams;
use crate::route::ResolvedRoute;
use crate::table::{RouteRecord, RouteTable};

/// Resolves a request (`path?query#hash`) against the table.
///
/// Returns `None` when no record matches; that is a normal outcome, not an
/// error.
pub fn resolve(table: &RouteTable, request: &str) -> Option<ResolvedRoute> {
	resolve_location(table, Location::parse(request))
}

/// Resolves an already parsed location against the table.
pub fn resolve_location(table: &RouteTable, location: Location) -> Option<ResolvedRoute> {
	let segments = location.segments();

	table.all_records().iter().find_map(|record| {
		let params = record.pattern().match_segments(&segments)?;
		tracing::trace!(
			path = location.path(),
			route = record.display_name(),
			"route matched"
		);
		let matched = table.ancestry(record);
		Some(ResolvedRoute::new(record, &matched, params, location.clone()))
	})
}

/// Builds the concrete path for `record` from `params`.
///
/// # Errors
///
/// Returns [`MatchError::MissingParam`] when a dynamic segment has no
/// (or an empty) value.
pub fn build_path(record: &RouteRecord, params: &RouteParams) -> Result<String, MatchError> {
	record
		.pattern()
		.build(params)
		.map_err(|param| MatchError::MissingParam {
			route: record.display_name().to_string(),
			param,
		})
}
