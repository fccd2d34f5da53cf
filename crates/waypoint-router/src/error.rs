//! Error types for route tables and navigation.
//!
//! Configuration-time errors ([`PatternError`], [`TableError`], [`ConfigError`])
//! are fatal and should abort startup. Navigation-time errors
//! ([`NavigationError`]) only reject the navigation that produced them; the
//! current route and the history stack are left untouched.
//!
//! A path that matches no route is not an error. It is committed as
//! [`CurrentRoute::Unmatched`](crate::CurrentRoute::Unmatched).

use thiserror::Error;

/// Error raised while compiling a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PatternError {
	/// A dynamic segment has no name (`/users/:`).
	#[error("pattern '{pattern}' has a dynamic segment without a name")]
	EmptyParamName {
		/// The offending pattern.
		pattern: String,
	},
	/// A dynamic segment name is not a valid identifier.
	#[error("pattern '{pattern}' has an invalid parameter name '{name}'")]
	InvalidParamName {
		/// The offending pattern.
		pattern: String,
		/// The rejected name.
		name: String,
	},
	/// The same parameter name appears twice in one pattern.
	#[error("pattern '{pattern}' declares parameter '{name}' more than once")]
	DuplicateParam {
		/// The offending pattern.
		pattern: String,
		/// The repeated name.
		name: String,
	},
	/// A segment mixes literal text with a dynamic token (`/room-:id`).
	#[error("pattern '{pattern}' mixes literal and dynamic parts in segment '{segment}'")]
	MixedSegment {
		/// The offending pattern.
		pattern: String,
		/// The mixed segment.
		segment: String,
	},
	/// A catch-all parameter is followed by further segments.
	#[error("pattern '{pattern}' has catch-all parameter '{name}' before the last segment")]
	CatchAllNotLast {
		/// The offending pattern.
		pattern: String,
		/// The catch-all parameter name.
		name: String,
	},
	/// The pattern string exceeds the maximum length.
	#[error("pattern length {length} exceeds maximum allowed length of {max} bytes")]
	TooLong {
		/// Actual length in bytes.
		length: usize,
		/// Maximum allowed length in bytes.
		max: usize,
	},
	/// The pattern has more segments than allowed.
	#[error("pattern has {count} path segments, exceeding maximum of {max}")]
	TooManySegments {
		/// Actual segment count.
		count: usize,
		/// Maximum segment count.
		max: usize,
	},
}

/// Error raised while building a [`RouteTable`](crate::RouteTable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TableError {
	/// A route declares a malformed pattern.
	#[error("invalid route pattern '{path}': {source}")]
	InvalidPattern {
		/// Full path of the rejected route.
		path: String,
		/// Underlying pattern error.
		#[source]
		source: PatternError,
	},
	/// Two routes share the same name.
	#[error("duplicate route name: {0}")]
	DuplicateName(String),
}

/// Error raised when building a concrete path from a route and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MatchError {
	/// A dynamic segment has no value in the supplied parameters.
	#[error("route '{route}' requires parameter '{param}'")]
	MissingParam {
		/// Route path or name.
		route: String,
		/// Missing parameter name.
		param: String,
	},
}

/// Error raised when converting route parameters into typed values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParamError {
	/// A named parameter is absent.
	#[error("missing route parameter '{0}'")]
	Missing(String),
	/// A parameter value failed to parse.
	#[error("failed to parse parameter '{name}' value '{raw_value}' as {param_type}: {reason}")]
	Parse {
		/// Parameter name.
		name: String,
		/// Expected type name.
		param_type: &'static str,
		/// Raw string value.
		raw_value: String,
		/// Parser message.
		reason: String,
	},
	/// The number of parameters differs from what the target type expects.
	#[error("parameter count mismatch: expected {expected}, got {actual}")]
	CountMismatch {
		/// Expected number of parameters.
		expected: usize,
		/// Actual number of parameters.
		actual: usize,
	},
}

/// Error raised by a history adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HistoryError {
	/// The host navigation surface is not available (no `window`).
	#[error("history is unavailable: {0}")]
	Unavailable(String),
	/// The host rejected a stack operation.
	#[error("history operation failed: {0}")]
	Host(String),
	/// History state could not be encoded.
	#[error("failed to encode history state: {0}")]
	State(String),
}

/// Error returned by a navigation guard.
///
/// A guard error aborts the pipeline like [`GuardDecision::Cancel`](crate::GuardDecision::Cancel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("guard failed: {message}")]
pub struct GuardError {
	message: String,
}

impl GuardError {
	/// Creates a guard error with the given message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	/// Returns the error message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Error that rejects a single navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NavigationError {
	/// Name-based navigation referenced an unknown route.
	#[error("unknown route name: {0}")]
	UnknownRouteName(String),
	/// Name-based navigation is missing a required parameter.
	#[error(transparent)]
	MissingParam(#[from] MatchError),
	/// Redirects exceeded the configured ceiling.
	#[error("redirect limit of {limit} exceeded: {}", .chain.join(" -> "))]
	RedirectLoop {
		/// Configured ceiling.
		limit: usize,
		/// Every target visited, in order.
		chain: Vec<String>,
	},
	/// The history adapter failed to record the navigation.
	#[error(transparent)]
	History(#[from] HistoryError),
}

/// Error raised while loading route configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// The configuration file could not be read.
	#[error("failed to read route configuration: {0}")]
	Io(#[from] std::io::Error),
	/// TOML parsing failed.
	#[error("invalid TOML route configuration: {0}")]
	Toml(#[from] toml::de::Error),
	/// JSON parsing failed.
	#[error("invalid JSON route configuration: {0}")]
	Json(#[from] serde_json::Error),
	/// The file extension is neither `.toml` nor `.json`.
	#[error("unsupported route configuration format: {0}")]
	UnsupportedFormat(String),
	/// The declared routes do not form a valid table.
	#[error(transparent)]
	Table(#[from] TableError),
}
