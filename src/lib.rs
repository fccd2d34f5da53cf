//! # Waypoint
//!
//! Client-side route matching and navigation for single-page applications.
//!
//! Waypoint resolves a requested URL against a table of path patterns, extracts
//! the dynamic segments of the winning route and moves between pages without
//! reloading the document. Transitions can be intercepted by asynchronous
//! navigation guards, and the current route is published to subscribers after
//! every committed navigation.
//!
//! ## Crates
//!
//! - `waypoint-router` - pattern compilation, the route table, history adapters,
//!   guards and the navigation controller
//!
//! ## Targets
//!
//! On `wasm32` the browser History API backs navigation through
//! `BrowserHistory`; everywhere else (and in tests) [`MemoryHistory`] keeps the
//! entry stack in memory.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use waypoint::prelude::*;
//!
//! let table = RouteTable::build(vec![
//!     RouteDefinition::new("/", ComponentRef::named("FirstPage")).name("FirstPage"),
//!     RouteDefinition::new("/chat/:roomId", ComponentRef::named("ChatPage")).name("ChatPage"),
//! ])?;
//! let router = Router::with_memory_history(table, RouterConfig::default());
//!
//! router.register_guard(sync_guard(|ctx| {
//!     Ok(GuardDecision::from(ctx.to().name() != Some("Admin")))
//! }));
//!
//! router
//!     .navigate(NavigationTarget::named("ChatPage", [("roomId", "42")]))
//!     .await?;
//! assert_eq!(router.current().full_path(), "/chat/42");
//! ```

pub use waypoint_router::*;

/// Re-exports of the types most applications need.
pub mod prelude {
	pub use waypoint_router::prelude::*;
}
