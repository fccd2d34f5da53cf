//! Route table construction.
//!
//! The table is built once from an ordered list of [`RouteDefinition`]s and
//! is read-only afterwards. Nested children are flattened depth-first, parent
//! before children, so declaration order is preserved. Declaration order is
//! the only tie-break when two routes match the same path: the route
//! registered first wins.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};

use crate::error::TableError;
use crate::pattern::PathPattern;

/// Arbitrary per-route metadata forwarded to guards and the renderer.
pub type RouteMeta = serde_json::Map<String, serde_json::Value>;

/// Opaque handle to the page a route renders.
///
/// The router never inspects the handle; it only hands it back to the
/// rendering layer, which can [`downcast_ref`](Self::downcast_ref) it.
#[derive(Clone)]
pub struct ComponentRef {
	label: Rc<str>,
	handle: Rc<dyn Any>,
}

impl ComponentRef {
	/// Wraps any value as a component handle.
	pub fn new<T: Any>(value: T) -> Self {
		Self {
			label: Rc::from(std::any::type_name::<T>()),
			handle: Rc::new(value),
		}
	}

	/// Creates a handle identified by a string key.
	///
	/// This is the form produced when routes are loaded from configuration.
	pub fn named(key: impl Into<String>) -> Self {
		let key: String = key.into();
		Self {
			label: Rc::from(key.as_str()),
			handle: Rc::new(key),
		}
	}

	/// Returns a human-readable label (the key or the wrapped type name).
	pub fn label(&self) -> &str {
		&self.label
	}

	/// Returns the string key for handles created with [`named`](Self::named).
	pub fn key(&self) -> Option<&str> {
		self.downcast_ref::<String>().map(String::as_str)
	}

	/// Downcasts the handle to a concrete type.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.handle.downcast_ref::<T>()
	}

	/// Returns whether both handles point to the same value.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.handle, &other.handle)
	}
}

impl fmt::Debug for ComponentRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ComponentRef").field(&self.label).finish()
	}
}

impl<'de> Deserialize<'de> for ComponentRef {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		String::deserialize(deserializer).map(Self::named)
	}
}

/// Declarative route definition consumed by [`RouteTable::build`].
///
/// # Example
///
/// ```ignore
/// let routes = vec![
///     RouteDefinition::new("/", ComponentRef::named("FirstPage")).name("FirstPage"),
///     RouteDefinition::new("/chat/:roomId", ComponentRef::named("ChatPage")).name("ChatPage"),
/// ];
/// let table = RouteTable::build(routes)?;
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteDefinition {
	/// Path pattern, absolute or relative to the parent.
	pub path: String,
	/// Optional unique name.
	#[serde(default)]
	pub name: Option<String>,
	/// Page handle. Redirect-only routes may omit it.
	#[serde(default)]
	pub component: Option<ComponentRef>,
	/// Nested routes.
	#[serde(default)]
	pub children: Vec<RouteDefinition>,
	/// Metadata forwarded to guards.
	#[serde(default)]
	pub meta: RouteMeta,
	/// Path to redirect to whenever this route is resolved.
	#[serde(default)]
	pub redirect: Option<String>,
}

impl RouteDefinition {
	/// Creates a definition rendering `component` at `path`.
	pub fn new(path: impl Into<String>, component: ComponentRef) -> Self {
		Self {
			path: path.into(),
			component: Some(component),
			..Self::default()
		}
	}

	/// Creates a definition that only redirects.
	pub fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			redirect: Some(to.into()),
			..Self::default()
		}
	}

	/// Sets the route name.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Adds a nested route.
	pub fn child(mut self, child: RouteDefinition) -> Self {
		self.children.push(child);
		self
	}

	/// Adds a metadata entry.
	pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}
}

/// An immutable route record owned by the [`RouteTable`].
#[derive(Debug)]
pub struct RouteRecord {
	index: usize,
	parent: Option<usize>,
	pattern: PathPattern,
	name: Option<String>,
	component: Option<ComponentRef>,
	meta: RouteMeta,
	redirect: Option<String>,
}

impl RouteRecord {
	/// Returns the position of this record in declaration order.
	pub fn index(&self) -> usize {
		self.index
	}

	/// Returns the index of the parent record, if nested.
	pub fn parent(&self) -> Option<usize> {
		self.parent
	}

	/// Returns the full normalized pattern string.
	pub fn path(&self) -> &str {
		self.pattern.as_str()
	}

	/// Returns the compiled pattern.
	pub fn pattern(&self) -> &PathPattern {
		&self.pattern
	}

	/// Returns the route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Returns the page handle.
	pub fn component(&self) -> Option<&ComponentRef> {
		self.component.as_ref()
	}

	/// Returns the route metadata.
	pub fn meta(&self) -> &RouteMeta {
		&self.meta
	}

	/// Returns the redirect target, if any.
	pub fn redirect(&self) -> Option<&str> {
		self.redirect.as_deref()
	}

	/// Returns the name if present, otherwise the path. Used in diagnostics.
	pub fn display_name(&self) -> &str {
		self.name().unwrap_or_else(|| self.path())
	}
}

/// Ordered, name-indexed collection of route records.
pub struct RouteTable {
	records: Vec<Rc<RouteRecord>>,
	by_name: HashMap<String, usize>,
}

impl fmt::Debug for RouteTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteTable")
			.field("routes_count", &self.records.len())
			.field("named_routes", &self.by_name.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl RouteTable {
	/// Builds a table from route definitions.
	///
	/// # Errors
	///
	/// Returns [`TableError::InvalidPattern`] for malformed patterns and
	/// [`TableError::DuplicateName`] when two routes share a name.
	pub fn build<I>(definitions: I) -> Result<Self, TableError>
	where
		I: IntoIterator<Item = RouteDefinition>,
	{
		let mut table = Self {
			records: Vec::new(),
			by_name: HashMap::new(),
		};
		for definition in definitions {
			table.register(definition, None)?;
		}
		tracing::debug!(routes = table.records.len(), "route table built");
		Ok(table)
	}

	fn register(
		&mut self,
		definition: RouteDefinition,
		parent: Option<usize>,
	) -> Result<(), TableError> {
		let full_path = match parent {
			Some(parent) => join_paths(self.records[parent].path(), &definition.path),
			None => definition.path.clone(),
		};

		let pattern =
			PathPattern::parse(&full_path).map_err(|source| TableError::InvalidPattern {
				path: full_path.clone(),
				source,
			})?;

		let index = self.records.len();
		let name = definition.name.filter(|n| !n.is_empty());
		if let Some(name) = &name {
			if self.by_name.contains_key(name) {
				return Err(TableError::DuplicateName(name.clone()));
			}
			self.by_name.insert(name.clone(), index);
		}

		self.records.push(Rc::new(RouteRecord {
			index,
			parent,
			pattern,
			name,
			component: definition.component,
			meta: definition.meta,
			redirect: definition.redirect,
		}));

		for child in definition.children {
			self.register(child, Some(index))?;
		}
		Ok(())
	}

	/// Returns the record registered under `name`.
	pub fn lookup_by_name(&self, name: &str) -> Option<&Rc<RouteRecord>> {
		self.by_name.get(name).map(|&index| &self.records[index])
	}

	/// Returns every record in declaration order.
	pub fn all_records(&self) -> &[Rc<RouteRecord>] {
		&self.records
	}

	/// Returns the record at `index`.
	pub fn get(&self, index: usize) -> Option<&Rc<RouteRecord>> {
		self.records.get(index)
	}

	/// Returns the chain of records from the outermost ancestor to `record`.
	pub fn ancestry(&self, record: &Rc<RouteRecord>) -> Vec<Rc<RouteRecord>> {
		let mut chain = vec![Rc::clone(record)];
		let mut parent = record.parent();
		while let Some(index) = parent {
			let ancestor = &self.records[index];
			chain.push(Rc::clone(ancestor));
			parent = ancestor.parent();
		}
		chain.reverse();
		chain
	}

	/// Returns the number of records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns whether the table has no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Returns whether a route is registered under `name`.
	pub fn has_route(&self, name: &str) -> bool {
		self.by_name.contains_key(name)
	}
}

/// Joins a child path onto its parent. Absolute child paths are kept as is.
fn join_paths(parent: &str, child: &str) -> String {
	if child.starts_with('/') {
		child.to_string()
	} else if child.is_empty() {
		parent.to_string()
	} else {
		format!("{}/{}", parent.trim_end_matches('/'), child)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};

	#[fixture]
	fn chat_routes() -> Vec<RouteDefinition> {
		vec![
			RouteDefinition::new("/", ComponentRef::named("FirstPage")).name("FirstPage"),
			RouteDefinition::new("/chat/:roomId", ComponentRef::named("ChatPage")).name("ChatPage"),
		]
	}

	#[rstest]
	fn test_build_preserves_declaration_order(chat_routes: Vec<RouteDefinition>) {
		// Act
		let table = RouteTable::build(chat_routes).unwrap();

		// Assert
		let paths: Vec<&str> = table.all_records().iter().map(|r| r.path()).collect();
		assert_eq!(paths, vec!["/", "/chat/:roomId"]);
		assert_eq!(table.len(), 2);
	}

	#[rstest]
	fn test_lookup_by_name(chat_routes: Vec<RouteDefinition>) {
		let table = RouteTable::build(chat_routes).unwrap();

		let record = table.lookup_by_name("ChatPage").unwrap();
		assert_eq!(record.path(), "/chat/:roomId");
		assert_eq!(record.component().and_then(ComponentRef::key), Some("ChatPage"));
		assert!(table.lookup_by_name("Missing").is_none());
	}

	#[rstest]
	fn test_duplicate_name_fails(mut chat_routes: Vec<RouteDefinition>) {
		chat_routes.push(RouteDefinition::new("/other", ComponentRef::named("Other")).name("ChatPage"));

		let err = RouteTable::build(chat_routes).unwrap_err();
		assert_eq!(err, TableError::DuplicateName("ChatPage".to_string()));
	}

	#[rstest]
	fn test_empty_names_are_not_indexed() {
		let table = RouteTable::build(vec![
			RouteDefinition::new("/a", ComponentRef::named("A")).name(""),
			RouteDefinition::new("/b", ComponentRef::named("B")).name(""),
		])
		.unwrap();

		assert_eq!(table.len(), 2);
		assert!(!table.has_route(""));
	}

	#[rstest]
	fn test_invalid_pattern_fails() {
		let err = RouteTable::build(vec![RouteDefinition::new(
			"/chat/:",
			ComponentRef::named("ChatPage"),
		)])
		.unwrap_err();

		assert!(matches!(err, TableError::InvalidPattern { ref path, .. } if path == "/chat/:"));
	}

	#[rstest]
	fn test_children_are_flattened_parent_first() {
		// Arrange
		let routes = vec![
			RouteDefinition::new("/users", ComponentRef::named("UsersLayout"))
				.name("users")
				.child(RouteDefinition::new("", ComponentRef::named("UserList")).name("user-list"))
				.child(RouteDefinition::new(":id", ComponentRef::named("UserDetail")).name("user"))
				.child(RouteDefinition::new("/about", ComponentRef::named("About"))),
		];

		// Act
		let table = RouteTable::build(routes).unwrap();

		// Assert
		let paths: Vec<&str> = table.all_records().iter().map(|r| r.path()).collect();
		assert_eq!(paths, vec!["/users", "/users", "/users/:id", "/about"]);

		let detail = table.lookup_by_name("user").unwrap();
		assert_eq!(detail.parent(), Some(0));
		let chain: Vec<String> = table
			.ancestry(detail)
			.iter()
			.map(|r| r.display_name().to_string())
			.collect();
		assert_eq!(chain, vec!["users", "user"]);
	}

	#[rstest]
	fn test_component_ref_downcast() {
		#[derive(Debug, PartialEq)]
		struct Page(&'static str);

		let component = ComponentRef::new(Page("chat"));
		assert_eq!(component.downcast_ref::<Page>(), Some(&Page("chat")));
		assert!(component.key().is_none());
		assert!(component.ptr_eq(&component.clone()));
	}

	#[rstest]
	fn test_definition_deserializes_from_json() {
		let json = r#"{
			"path": "/admin",
			"name": "admin",
			"component": "AdminPage",
			"meta": { "requiresAuth": true }
		}"#;

		let definition: RouteDefinition = serde_json::from_str(json).unwrap();

		assert_eq!(definition.name.as_deref(), Some("admin"));
		assert_eq!(
			definition.component.as_ref().and_then(ComponentRef::key),
			Some("AdminPage")
		);
		assert_eq!(definition.meta["requiresAuth"], serde_json::Value::Bool(true));
	}
}
