//! Router configuration.
//!
//! Routes can be declared in code with [`RouteDefinition`] builders or loaded
//! from a TOML or JSON document:
//!
//! ```toml
//! [router]
//! max_redirects = 5
//!
//! [[routes]]
//! path = "/"
//! name = "FirstPage"
//! component = "FirstPage"
//!
//! [[routes]]
//! path = "/chat/:roomId"
//! name = "ChatPage"
//! component = "ChatPage"
//! ```
//!
//! Components loaded this way are [`ComponentRef::named`](crate::ComponentRef::named)
//! handles carrying the string key.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TableError};
use crate::table::{RouteDefinition, RouteTable};

/// Default ceiling on redirects within one navigation.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
	/// Path prefix the application is served under (browser history only).
	pub base: String,
	/// Maximum number of redirects followed by one navigation.
	pub max_redirects: usize,
	/// Initial path of a fresh in-memory history.
	pub initial_path: String,
}

impl Default for RouterConfig {
	fn default() -> Self {
		Self {
			base: String::new(),
			max_redirects: DEFAULT_MAX_REDIRECTS,
			initial_path: "/".to_string(),
		}
	}
}

impl RouterConfig {
	/// Sets the base path.
	pub fn with_base(mut self, base: impl Into<String>) -> Self {
		self.base = base.into();
		self
	}

	/// Sets the redirect ceiling.
	pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
		self.max_redirects = max_redirects;
		self
	}

	/// Sets the initial path.
	pub fn with_initial_path(mut self, initial_path: impl Into<String>) -> Self {
		self.initial_path = initial_path.into();
		self
	}
}

/// A complete declarative router configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoutesConfig {
	/// Router settings.
	#[serde(default)]
	pub router: RouterConfig,
	/// Route definitions in declaration order.
	#[serde(default)]
	pub routes: Vec<RouteDefinition>,
}

impl RoutesConfig {
	/// Parses a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(source)?)
	}

	/// Parses a JSON document.
	pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
		Ok(serde_json::from_str(source)?)
	}

	/// Loads a `.toml` or `.json` file, chosen by extension.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Io`] when the file cannot be read,
	/// [`ConfigError::UnsupportedFormat`] for other extensions and a parse
	/// error for malformed content.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
		match extension {
			"toml" => Self::from_toml_str(&std::fs::read_to_string(path)?),
			"json" => Self::from_json_str(&std::fs::read_to_string(path)?),
			_ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
		}
	}

	/// Builds the route table and returns it with the router settings.
	pub fn into_table(self) -> Result<(RouteTable, RouterConfig), TableError> {
		let table = RouteTable::build(self.routes)?;
		Ok((table, self.router))
	}
}
