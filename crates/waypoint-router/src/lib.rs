//! Waypoint Router - client-side route matching and navigation
//!
//! Given a table of path patterns (some with named dynamic segments) and a
//! requested URL, the router deterministically resolves the active page,
//! extracts its parameters and manages transitions between pages without
//! reloading the document.
//!
//! ## Architecture
//!
//! - [`pattern`]: path pattern compilation (`/chat/:roomId`, `/:rest*`)
//! - [`table`]: the route table, built once from [`RouteDefinition`]s
//! - [`matcher`]: URL to route resolution and the inverse [`build_path`]
//! - [`location`]: path, query and hash parsing
//! - [`params`]: route parameters and typed extraction
//! - [`history`]: history adapters ([`MemoryHistory`], `BrowserHistory` on wasm)
//! - [`guard`]: navigation guards
//! - [`router`]: the navigation controller
//! - [`state`]: the reactive current-route state
//! - [`config`]: router settings and declarative route files
//!
//! The whole crate is single-threaded. Guards and listeners are not required
//! to be `Send`; navigations interleave only at guard suspension points.
//!
//! ## Example
//!
//! ```ignore
//! use waypoint_router::prelude::*;
//!
//! let table = RouteTable::build(vec![
//!     RouteDefinition::new("/", ComponentRef::named("FirstPage")).name("FirstPage"),
//!     RouteDefinition::new("/chat/:roomId", ComponentRef::named("ChatPage")).name("ChatPage"),
//! ])?;
//! let router = Router::with_memory_history(table, RouterConfig::default());
//!
//! let _subscription = router.state().subscribe(|route| {
//!     println!("now at {}", route.full_path());
//! });
//! router.push("/chat/42").await?;
//! let room: u64 = router.current().params().parse("roomId")?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod location;
pub mod matcher;
pub mod params;
pub mod pattern;
pub mod route;
pub mod router;
pub mod state;
pub mod table;
pub mod target;

#[cfg(target_arch = "wasm32")]
pub mod spawn;

pub use config::{DEFAULT_MAX_REDIRECTS, RouterConfig, RoutesConfig};
pub use error::{
	ConfigError, GuardError, HistoryError, MatchError, NavigationError, ParamError, PatternError,
	TableError,
};
pub use guard::{
	GuardContext, GuardDecision, GuardFuture, GuardId, NavigationGuard, NavigationTrigger, sync_guard,
};
pub use history::{History, ListenerId, MemoryHistory, NavigationEntry, PopEvent, PopListener};
pub use location::{Location, Query};
pub use matcher::{build_path, resolve, resolve_location};
pub use params::{FromParams, RouteParams};
pub use pattern::{PathPattern, Segment};
pub use route::{CurrentRoute, ResolvedRoute};
pub use router::{NavigationFuture, NavigationOutcome, NavigationPhase, Router};
pub use state::{RouteState, Subscription};
pub use table::{ComponentRef, RouteDefinition, RouteMeta, RouteRecord, RouteTable};
pub use target::{NavigationTarget, RouteLocation};

#[cfg(target_arch = "wasm32")]
pub use history::BrowserHistory;
#[cfg(target_arch = "wasm32")]
pub use spawn::BrowserSpawner;

/// Commonly used types.
pub mod prelude {
	pub use crate::{
		ComponentRef, CurrentRoute, GuardContext, GuardDecision, GuardError, History, MemoryHistory,
		NavigationError, NavigationOutcome, NavigationTarget, RouteDefinition, RouteParams, RouteTable,
		Router, RouterConfig, sync_guard,
	};

	#[cfg(target_arch = "wasm32")]
	pub use crate::{BrowserHistory, BrowserSpawner};
}
